mod mode;

use std::process;

use clap::Parser;
use ldutils_lib::config::{self, load_file_config, DEFAULT_CONFIG_PATH, DEFAULT_LOG_LEVEL};
use ldutils_lib::{Config, LdError, LdUtils};
use tracing_subscriber::EnvFilter;

use crate::mode::Mode;

const EXIT_FAILURE: i32 = 1;
const EXIT_USAGE: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "ldutils")]
#[command(version)]
#[command(about = "Utilities for the LaunchDarkly REST API", long_about = None)]
struct Args {
    /// Log level or filter directive (e.g. debug, ldutils_lib=trace)
    #[arg(short = 'l', long = "log-level")]
    log_level: Option<String>,

    /// API access token (overrides LAUNCHDARKLY_API_TOKEN)
    #[arg(short = 't', long = "token")]
    token: Option<String>,

    /// Path to config file
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Operation to run, e.g. getFeatureFlags
    mode: Option<String>,

    /// Positional parameters of the mode. Put values starting with '-' after `--`
    args: Vec<String>,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(err: &LdError) -> i32 {
    match err {
        LdError::Validation(_) => EXIT_USAGE,
        _ => EXIT_FAILURE,
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mode = match Mode::parse(args.mode.as_deref(), &args.args) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(EXIT_USAGE);
        }
    };

    let file_config = match load_file_config(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(EXIT_FAILURE);
        }
    };
    init_tracing(&config::resolve_log_level(
        args.log_level.as_deref(),
        &file_config,
        |name| std::env::var(name).ok(),
    ));
    tracing::debug!(mode = ?args.mode, args = ?args.args, "command line");

    let ld = match Config::resolve(args.token.as_deref(), &file_config).and_then(|c| LdUtils::from_config(&c)) {
        Ok(ld) => ld,
        Err(e) => {
            tracing::error!(error = %e, "configuration failed");
            eprintln!("{}", e);
            process::exit(EXIT_FAILURE);
        }
    };

    match mode::execute(mode, &ld).await {
        Ok(value) => {
            let rendered = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            println!("{}", rendered);
        }
        Err(e) => {
            tracing::error!(error = %e, api = e.api(), "request failed");
            eprintln!("{}", e);
            process::exit(exit_code(&e));
        }
    }
}
