//! Updrift CLI - one-shot uploads of local files and directories to
//! Google Drive, with folder mirroring, archive bundling, and credential
//! management.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use updrift_common::ModeFlags;
use updrift_engine::{list_directory, run_host, HostInputs, ListOptions};
use updrift_storage::{ConsentOptions, TokenStore};

#[derive(Parser)]
#[command(name = "updrift")]
#[command(about = "Updrift - upload local files and directories to Google Drive")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file or directory.
    Upload {
        /// Local file or directory to upload.
        path: PathBuf,

        /// Remote parent folder id (empty means the Drive root).
        #[arg(short, long, default_value = "")]
        folder_id: String,

        /// OAuth2 client descriptor JSON, inline.
        #[arg(long, conflicts_with = "credentials_file")]
        credentials_json: Option<String>,

        /// OAuth2 client descriptor JSON, from a file.
        #[arg(long)]
        credentials_file: Option<PathBuf>,

        /// Service-account key JSON, inline.
        #[arg(long, conflicts_with = "service_account_file")]
        service_account_json: Option<String>,

        /// Service-account key JSON, from a file.
        #[arg(long)]
        service_account_file: Option<PathBuf>,

        /// Bundle a directory into a single zip archive before uploading.
        #[arg(short, long)]
        compress: bool,

        /// Create a remote folder named after the source and upload into it.
        #[arg(long)]
        create_parent_folder: bool,

        /// Put every file directly in the destination folder instead of
        /// mirroring subdirectories.
        #[arg(long)]
        flatten: bool,

        /// Share uploaded files with this email address (writer access).
        #[arg(long)]
        share_with: Option<String>,

        /// Concurrent transfers (1 = sequential).
        #[arg(long, default_value_t = 2)]
        concurrency: usize,

        /// Seconds to wait for the interactive consent redirect.
        #[arg(long, default_value_t = 300)]
        consent_timeout: u64,

        /// Print the consent URL instead of launching a browser.
        #[arg(long)]
        no_browser: bool,
    },

    /// List a local directory as a single text block.
    Ls {
        /// Directory to list.
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Include hidden entries.
        #[arg(short, long)]
        all: bool,

        /// Show type, size, and modification time per entry.
        #[arg(short, long)]
        long: bool,
    },

    /// Inspect or reset the stored credential.
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Show whether a credential is stored and when it expires.
    Status,
    /// Delete the stored credential.
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to initialize logging")?;

    match cli.command {
        Commands::Upload {
            path,
            folder_id,
            credentials_json,
            credentials_file,
            service_account_json,
            service_account_file,
            compress,
            create_parent_folder,
            flatten,
            share_with,
            concurrency,
            consent_timeout,
            no_browser,
        } => {
            let client_json = inline_or_file(credentials_json, credentials_file)
                .context("Failed to read client descriptor")?;
            let service_key_json = inline_or_file(service_account_json, service_account_file)
                .context("Failed to read service-account key")?;

            let inputs = HostInputs {
                local_path: path.to_string_lossy().into_owned(),
                parent_folder_id: folder_id,
                client_json,
                service_key_json,
                mode: ModeFlags {
                    compress_to_archive: compress,
                    create_parent_folder,
                    preserve_subdirectories: !flatten,
                },
                share_with: share_with.unwrap_or_default(),
                parallelism: concurrency,
                consent: ConsentOptions {
                    timeout: Duration::from_secs(consent_timeout),
                    open_browser: !no_browser,
                },
            };

            match run_host(inputs).await {
                Ok(report) => {
                    println!("{}", report.render());
                    if !report.is_success() {
                        std::process::exit(1);
                    }
                }
                Err(err) => {
                    // Plain text only; the host never sees a stack trace.
                    println!("Error: {}", err);
                    std::process::exit(1);
                }
            }
        }

        Commands::Ls { path, all, long } => {
            let options = ListOptions {
                show_hidden: all,
                show_details: long,
            };
            println!("{}", list_directory(&path, options));
        }

        Commands::Auth { command } => {
            let store = TokenStore::open_default()?;
            match command {
                AuthCommands::Status => match store.load() {
                    Some(credential) => {
                        let state = if credential.is_expired() {
                            if credential.can_refresh() {
                                "expired (refreshable)"
                            } else {
                                "expired"
                            }
                        } else {
                            "valid"
                        };
                        println!(
                            "Credential at {}: {}, expires {}",
                            store.path().display(),
                            state,
                            credential.expires_at
                        );
                    }
                    None => println!("No stored credential."),
                },
                AuthCommands::Reset => {
                    store.clear()?;
                    println!("Stored credential removed.");
                }
            }
        }
    }

    Ok(())
}

/// Resolve an inline-or-file option pair to a string (empty when neither).
fn inline_or_file(inline: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (inline, file) {
        (Some(json), _) => Ok(json),
        (None, Some(path)) => {
            std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
        }
        (None, None) => Ok(String::new()),
    }
}
