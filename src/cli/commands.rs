use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use scheme_aggregator::{
    config::DEFAULT_CONFIG_PATH,
    scheme::{SchemeKey, TransactionKind, ValidationContext},
};

#[derive(Parser)]
#[command(name = "scheme-aggregator")]
#[command(about = "Concurrent scheme lookup and transaction eligibility checks")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the scheme database schema
    Init,

    /// Load companies, schemes and NAVs from a JSON catalog
    Import {
        /// Catalog file
        file: PathBuf,
    },

    /// Check whether a transaction is allowed on a scheme
    Validate(TransactionArgs),

    /// Fetch scheme data for a transaction and validate it
    Quote {
        #[command(flatten)]
        transaction: TransactionArgs,

        /// Investor account type (A=NRE, B=NPNRE, C=NRO, D=NPNRO, O=resident)
        #[arg(long)]
        account_type: Option<String>,

        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct TransactionArgs {
    /// Transaction type: purchase, sip, redeem, switch, swp or stp
    #[arg(short, long)]
    pub kind: TransactionKind,

    /// Company code
    #[arg(long)]
    pub company: i64,

    /// Scheme code
    #[arg(short, long)]
    pub scheme: String,

    /// Request arrived through the offline channel
    #[arg(long)]
    pub offline: bool,

    /// Special-interval variant of the transaction
    #[arg(long)]
    pub special_interval: bool,

    /// Time-the-market STP
    #[arg(long)]
    pub booster: bool,

    /// Holding is dematerialized
    #[arg(long)]
    pub demat: bool,
}

impl TransactionArgs {
    pub fn key(&self) -> SchemeKey {
        SchemeKey::new(self.company, self.scheme.clone())
    }

    pub fn situation(&self) -> ValidationContext {
        ValidationContext::default()
            .offline(self.offline)
            .special_interval(self.special_interval)
            .booster_stp(self.booster)
            .demat_holding(self.demat)
    }
}
