use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use driveup::{DriveupConfig, DriveupError, Runner};

#[derive(Parser)]
#[command(name = "driveup", version, about = "Upload the latest report file to OneDrive")]
struct Cli {
    /// Path to a driveup.json config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the newest report, sign in if needed, and upload it
    Run {
        /// Upload this file instead of searching for the newest report
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Obtain a valid access token (refresh or device code login)
    Auth,

    /// List report candidates and the one that would be uploaded
    Find,

    /// Obtain a token and verify it against the drive
    Probe,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Display the effective config and where it was loaded from
    Show,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (config, source) = match driveup::load_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            print_error(&e, cli.json);
            std::process::exit(1);
        }
    };

    driveup::logging::init_logging(config.log_file.as_deref());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let json = cli.json;
    let result = run(cli.command, json, config, source, &cancel).await;
    if let Err(e) = result {
        tracing::error!(code = e.code(), "{e}");
        print_error(&e, json);
        if e.is_terminal_auth_failure() {
            if !json {
                eprintln!("Sign-in did not complete. Run `driveup auth` to try again.");
            }
            std::process::exit(2);
        }
        std::process::exit(1);
    }
}

fn print_error(err: &DriveupError, json: bool) {
    if json {
        println!("{}", serde_json::to_string_pretty(&err.to_json()).unwrap_or_default());
    } else {
        eprintln!("Error: {err}");
    }
}

async fn run(
    command: Commands,
    json: bool,
    config: DriveupConfig,
    source: Option<PathBuf>,
    cancel: &CancellationToken,
) -> Result<(), DriveupError> {
    match command {
        Commands::Run { file } => {
            tracing::info!("=== run started ===");
            if let Ok(cwd) = std::env::current_dir() {
                tracing::info!(cwd = %cwd.display(), "working directory");
            }
            let runner = Runner::from_config(&config)?;
            let result = match file {
                Some(path) => runner.upload_file(path, cancel).await,
                None => runner.run(cancel).await,
            };
            tracing::info!("=== run finished ===");
            let outcome = result?;
            println!("Uploaded {} to {}", outcome.file_name, outcome.remote_path);
            Ok(())
        }
        Commands::Auth => {
            let runner = Runner::from_config(&config)?;
            let acquired = runner.authenticate(cancel).await?;
            println!("Authenticated using {}", acquired.source);
            println!("Token stored in {}", config.token_file.display());
            Ok(())
        }
        Commands::Find => {
            let locator = driveup::ReportLocator::new(config.reports.clone());
            let candidates = locator.find_candidates();
            let selected = locator.select_latest(&candidates).ok();
            if json {
                let out = serde_json::json!({
                    "candidates": candidates,
                    "selected": selected,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&out).unwrap_or_else(|_| out.to_string())
                );
            } else {
                for path in &candidates {
                    println!("{}", path.display());
                }
                match &selected {
                    Some(path) => println!("Selected: {}", path.display()),
                    None => println!("No report matching {} found", locator.pattern()),
                }
            }
            Ok(())
        }
        Commands::Probe => {
            let runner = Runner::from_config(&config)?;
            let acquired = runner.probe(cancel).await?;
            println!("Drive connection ok ({})", acquired.source);
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                match &source {
                    Some(path) => println!("// source: {}", path.display()),
                    None => println!("// source: built-in defaults"),
                }
                let rendered = serde_json::to_string_pretty(&config).map_err(|e| {
                    DriveupError::ConfigError {
                        path: source.clone().unwrap_or_default(),
                        detail: e.to_string(),
                    }
                })?;
                println!("{rendered}");
                Ok(())
            }
        },
    }
}
