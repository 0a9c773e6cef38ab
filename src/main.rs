use clap::Parser;
use predica::cli::{Cli, Commands};
use predica::types::config::Config;
use predica::PredicaResult;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> PredicaResult<()> {
    let cli = Cli::parse();

    // Load configuration first (no logging yet)
    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default_config()
    };

    // Determine log level: CLI flags take precedence over config
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        format!("predica={}", log_level)
            .parse()
            .unwrap_or_else(|_| "predica=info".parse().expect("fallback directive is valid")),
    );

    if config.general.log_format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    tracing::debug!("Configuration loaded from: {}", cli.config.display());

    match cli.command {
        Commands::Init { path } => {
            predica::cli::commands::init(path).await?;
        }
        Commands::Validate { expression } => {
            predica::cli::commands::validate(&expression)?;
        }
        Commands::Eval {
            expression,
            limit,
            timeout,
            command,
        } => {
            predica::cli::commands::eval(&expression, limit, timeout, &command, &config).await?;
        }
        Commands::Version => {
            predica::cli::commands::version();
        }
    }

    Ok(())
}
