use colored::Colorize;

use crate::scheme::Flag;

/// Format a flag with color
pub fn format_flag(flag: Flag) -> String {
    match flag {
        Flag::Yes => flag.to_string().green().to_string(),
        Flag::No => flag.to_string().red().to_string(),
        Flag::Unknown => flag.to_string().dimmed().to_string(),
    }
}

/// Format an amount with two decimals
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Format units with four decimals
pub fn format_units(units: f64) -> String {
    format!("{:.4}", units)
}

/// Print a formatted table border
pub fn print_table_border(width: usize) {
    println!("{}", "=".repeat(width));
}

/// Print a table row with columns
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    println!("{}", table_row(columns, widths));
}

fn table_row(columns: &[&str], widths: &[usize]) -> String {
    let mut row = String::new();
    for (col, width) in columns.iter().zip(widths) {
        row.push_str(&format!("{:<width$}  ", col, width = width));
    }
    row.trim_end().to_string()
}
