mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, TransactionArgs};
use scheme_aggregator::{
    cache::CachedSchemeStore,
    config::{Config, FetchConfig, LoggingConfig},
    scheme::{SchemeFlags, TransactionKind},
    storage::{Catalog, SchemeStore, SqliteSchemeStore},
    utils, QuoteRequest, RequestContext, Result, SchemeAggregator, SchemeValidator, TransactionQuote,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", format!("Failed to load configuration: {}", e).red());
            std::process::exit(1);
        }
    };

    init_logging(&config.logging);

    let result = match cli.command {
        Commands::Init => initialize(&config),

        Commands::Import { file } => {
            info!("Importing catalog from {}", file.display());
            import_catalog(&config, &file)
        }

        Commands::Validate(args) => validate(&config, &args).await,

        Commands::Quote {
            transaction,
            account_type,
            format,
        } => quote(&config, &transaction, account_type, &format).await,

        Commands::Config => show_config(&config),
    };

    if let Err(e) = result {
        eprintln!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn initialize(config: &Config) -> Result<()> {
    println!("{}", "Initializing scheme database...".green());
    SqliteSchemeStore::open(&config.database.path)?;
    println!("{}", "✓ Schema ready".green());
    println!("\n{}", "Configuration:".cyan());
    println!("  Database:       {}", config.database.path);
    println!("  Sub-timeout:    {} ms", config.fetch.sub_timeout_ms);
    println!("  Request limit:  {} ms", config.fetch.request_timeout_ms);
    println!("  Drain policy:   {:?}", config.fetch.drain_policy);
    println!(
        "  Cache:          {}",
        if config.cache.enabled {
            format!("{} entries, {}s TTL", config.cache.capacity, config.cache.ttl_secs)
        } else {
            "disabled".to_string()
        }
    );
    Ok(())
}

fn import_catalog(config: &Config, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)?;
    let catalog: Catalog = serde_json::from_str(&raw)?;

    let store = SqliteSchemeStore::open(&config.database.path)?;
    let summary = store.import(&catalog)?;

    println!("{}", "✓ Catalog imported".green());
    println!("  Companies:   {}", summary.companies);
    println!("  Categories:  {}", summary.categories);
    println!("  Schemes:     {}", summary.schemes);
    println!("  NAVs:        {}", summary.navs);
    Ok(())
}

async fn validate(config: &Config, args: &TransactionArgs) -> Result<()> {
    let store = Arc::new(SqliteSchemeStore::open(&config.database.path)?);
    let validator = SchemeValidator::from_store(store);

    let ctx = RequestContext::new().with_timeout(config.fetch.request_timeout());
    let flags = validator
        .validate(&ctx, args.kind, &args.key(), &args.situation())
        .await?;

    println!(
        "{}",
        format!("✓ {} allowed for scheme {}", args.kind, args.key()).green()
    );
    print_flags(&flags)?;
    Ok(())
}

async fn quote(
    config: &Config,
    args: &TransactionArgs,
    account_type: Option<String>,
    format: &str,
) -> Result<()> {
    let mut request = QuoteRequest::new(args.key(), args.kind).with_situation(args.situation());
    if let Some(account_type) = account_type {
        request = request.with_account_type(account_type.to_uppercase());
    }

    let store = SqliteSchemeStore::open(&config.database.path)?;
    let quote = if config.cache.enabled {
        let store = CachedSchemeStore::new(store, config.cache.capacity, config.cache.ttl());
        run_quote(Arc::new(store), &config.fetch, &request).await?
    } else {
        run_quote(Arc::new(store), &config.fetch, &request).await?
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&quote)?);
        return Ok(());
    }

    print_quote(&quote)
}

async fn run_quote<S: SchemeStore + 'static>(
    store: Arc<S>,
    fetch: &FetchConfig,
    request: &QuoteRequest,
) -> Result<TransactionQuote> {
    let aggregator = SchemeAggregator::new(store, fetch.clone());
    aggregator.quote(&RequestContext::new(), request).await
}

fn show_config(config: &Config) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}

fn print_quote(quote: &TransactionQuote) -> Result<()> {
    println!(
        "{}",
        format!("=== {} quote for scheme {} ===", quote.kind, quote.key).cyan().bold()
    );
    println!("Request:      {}", quote.request_id);
    println!("Description:  {}", quote.details.scheme_desc);
    println!("Type:         {}", quote.details.scheme_type);
    println!("Closure:      {}", quote.flags.closure);
    println!(
        "NAV:          {} as of {} (AMFI {})",
        quote.nav.nav_value, quote.nav.nav_date, quote.nav.amfi_code
    );
    println!("NFO date:     {}", quote.details.nfo_exec_date);

    if matches!(quote.kind, TransactionKind::Purchase | TransactionKind::Sip) {
        println!("\n{}", "Limits:".yellow());
        println!("  Min purchase:    {}", utils::format_amount(quote.details.min_purchase_amount));
        println!("  Purchase multi:  {}", utils::format_amount(quote.details.multi_purchase_amount));
        println!("  Max purchase:    {}", utils::format_amount(quote.details.max_sub_amount));
        println!("  Min SIP:         {}", utils::format_amount(quote.details.min_sip_amount));
        println!("  SIP multi:       {}", utils::format_amount(quote.details.multi_sip_amount));
        println!("  Max SIP:         {}", utils::format_amount(quote.details.max_sip_amount));
    }

    if let Some(redemption) = &quote.redemption {
        println!("\n{}", "Redemption:".yellow());
        println!("  Redeem cutoff:   {}", redemption.redeem_cutoff_time);
        println!("  Switch cutoff:   {}", redemption.siso_cutoff_time);
        println!("  Min amount:      {}", utils::format_amount(redemption.min_redeem_amount));
        println!("  Amount multi:    {}", utils::format_amount(redemption.multi_redeem_amount));
        println!("  Min units:       {}", utils::format_units(redemption.min_redeem_units));
        println!("  Units multi:     {}", utils::format_units(redemption.multi_redeem_units));
        println!("  STP min:         {}", utils::format_units(redemption.stp_min_amount));
        println!("  STP max:         {}", utils::format_units(redemption.stp_max_amount));
        println!(
            "  Account type:    {}",
            utils::format_flag(redemption.account_type_allowed_flag)
        );
    }

    println!();
    print_flags(&quote.flags)
}

fn print_flags(flags: &SchemeFlags) -> Result<()> {
    let serde_json::Value::Object(fields) = serde_json::to_value(flags)? else {
        return Ok(());
    };

    utils::print_table_border(40);
    utils::print_table_row(&["Flag", "Value"], &[28, 10]);
    utils::print_table_border(40);
    for (name, value) in fields {
        let rendered = match value.as_str() {
            Some(_) if name == "closure" => flags.closure.to_string(),
            Some(code) => utils::format_flag(code.into()),
            None => utils::format_flag(Default::default()),
        };
        utils::print_table_row(&[&name, &rendered], &[28, 10]);
    }
    utils::print_table_border(40);
    Ok(())
}
