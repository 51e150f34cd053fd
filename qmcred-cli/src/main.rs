mod cli;
mod clipboard;
mod commands;
mod config;
mod error;
mod output;

use crate::{
    cli::{Args, Commands, LogFormat},
    commands::CommandExecutor,
    config::AppConfig,
    error::{AppError, Result},
    output::OutputManager,
};
use clap::Parser;
use std::process;
use tracing::{Level, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let output_format = args.command.output_format();
    let result = run(args).await;

    if let Err(e) = result {
        if !matches!(e, AppError::Reported(_)) {
            error!("Application error: {}", e);
            let output = OutputManager::new(cfg!(feature = "colored-output"));
            let message = output.format_error(&e.to_string(), output_format);
            if output_format.is_some_and(|format| format.is_json()) {
                println!("{message}");
            } else {
                eprintln!("{message}");
            }
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet, args.log_format);

    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_args(&args);

    match args.command {
        Commands::Completions { shell } => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }

        Commands::Config { show, reset } => {
            if reset {
                let path = AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults ({})", path.display());
            } else if show {
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
        }

        Commands::Login {
            method,
            qr_output,
            poll_timeout,
        } => {
            if let Some(secs) = poll_timeout {
                config.poll_timeout_secs = secs;
            }
            let mut executor = CommandExecutor::new(config, args.quiet)?;
            executor.login(method, qr_output.as_deref()).await?;
        }

        Commands::Status { output } => {
            CommandExecutor::new(config, args.quiet)?
                .status(&output)
                .await?;
        }

        Commands::Refresh { output } => {
            CommandExecutor::new(config, args.quiet)?
                .refresh(&output)
                .await?;
        }

        Commands::Info {
            output,
            output_file,
        } => {
            CommandExecutor::new(config, args.quiet)?
                .info(&output, output_file.as_deref())
                .await?;
        }

        Commands::Copy => {
            CommandExecutor::new(config, args.quiet)?.copy().await?;
        }

        Commands::Delete { yes } => {
            CommandExecutor::new(config, args.quiet)?
                .delete(yes)
                .await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool, format: LogFormat) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => subscriber
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(verbose)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
