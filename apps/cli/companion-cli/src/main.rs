use companion_cli::cli::Cli;
use companion_cli::commands::run;
use companion_cli::error::CliError;
use companion_cli::logger::{initialize as LoggerInitialize, level_for, resolve_log_dir};

use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // A broken log directory is reported but never stops the command
    let logging = match resolve_log_dir(cli.log_dir.as_deref())
        .and_then(|dir| LoggerInitialize(&dir, level_for(cli.verbose)).map(|()| dir))
    {
        Ok(log_dir) => {
            info!("Log directory: {}", log_dir.display());
            true
        }
        Err(e) => {
            eprintln!("{e}");
            false
        }
    };

    let result = run(cli).await.and_then(|output| {
        serde_json::to_string_pretty(&output).map_err(|e| {
            CliError::cli(format!("Failed to render output: {e}"))
        })
    });

    match result {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) if logging => {
            error!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
