use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use fx_pivot::{Cli, ConversionRequest, CurrencyLayer, CurrencyRegistry, Error, RateCache};
use rust_decimal::Decimal;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
    // A missing .env is fine; the key may come from the environment or --api-key
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    init_logging(&args.log_path());

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            if e.is_fatal() {
                error!(error = %e, "currency conversion aborted");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

/// Log to stderr, and append to `log_path` when it can be opened.
fn init_logging(log_path: &Path) {
    if let Some(dir) = log_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        let _ = fs::create_dir_all(dir);
    }
    let file_layer = match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(file) => Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
        Err(e) => {
            eprintln!("not logging to {}: {e}", log_path.display());
            None
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(io::stderr).with_filter(LevelFilter::WARN))
        .with(file_layer)
        .init();
}

fn run(args: &Cli) -> Result<(), Error> {
    info!("started currency converter");
    let registry = CurrencyRegistry::load(&args.currencies);

    if args.from.is_none() || args.to.is_none() || args.amount.is_none() {
        println!("Currency converter (using data from currencylayer.com)\n");
    }
    let from = match &args.from {
        Some(from) => from.clone(),
        None => prompt("From currency (e.g. EUR): ")?,
    };
    let to = match &args.to {
        Some(to) => to.clone(),
        None => prompt("To currency (e.g. GBP): ")?,
    };
    let amount = match args.amount {
        Some(amount) => amount,
        None => prompt("Amount: ")?
            .parse::<Decimal>()
            .map_err(|_| Error::Validation("Invalid amount. Must be a number.".to_string()))?,
    };

    let request = ConversionRequest::new(&registry, &from, &to, amount)?;
    let credential = args.credential()?;

    let provider = CurrencyLayer::new(&args.base_url, Duration::from_secs(args.timeout));
    let rates = RateCache::in_dir(&args.data_dir)
        .with_refresh(args.refresh)
        .get_rates(&provider, credential)?;
    let result = request.convert(&rates)?;

    println!("{}", request.describe(result));
    Ok(())
}

/// Ask on stdout, read one trimmed line from stdin.
fn prompt(question: &str) -> Result<String, Error> {
    let mut stdout = io::stdout();
    let mut line = String::new();
    write!(stdout, "{question}")
        .and_then(|()| stdout.flush())
        .and_then(|()| io::stdin().lock().read_line(&mut line))
        .map_err(|e| Error::Validation(format!("failed to read input: {e}")))?;
    Ok(line.trim().to_string())
}
