use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use oido_match::classifier::ClassifierClient;
use oido_match::config::{AppConfig, SessionBackend};
use oido_match::intake::ImageCandidate;
use oido_match::presenter;
use oido_match::session::{FileSessionStore, KeyringSessionStore, Session, SessionStore};
use oido_match::workflow::ClassifierWorkflow;

const ANSI_RESET: &str = "\x1b[0m";

#[derive(Parser, Debug)]
#[command(name = "oido-match", version, about = "Classify otoscopy images with a remote model")]
struct Cli {
    /// Path to config.toml (defaults to the platform config dir)
    #[arg(long, env = "OIDO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a session token
    Login {
        #[arg(long, env = "OIDO_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Forget the stored session token
    Logout,
    /// Show session state and classifier settings
    Status,
    /// Upload an image and print the diagnosis
    Classify {
        image: PathBuf,
        /// Print the result as JSON, with the image inlined as a data URL
        #[arg(long)]
        json: bool,
    },
    /// List the labels and their reference images
    Labels,
}

fn open_store(config: &AppConfig) -> Result<Box<dyn SessionStore>> {
    let store: Box<dyn SessionStore> = match config.session_backend {
        SessionBackend::File => Box::new(FileSessionStore::new(config.session_file_path()?)),
        SessionBackend::Keyring => Box::new(KeyringSessionStore::new()),
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    oido_match::init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let mut session = Session::init(open_store(&config)?);

    match cli.command {
        Command::Login { token } => {
            session.login(&token)?;
            println!("Logged in.");
        }
        Command::Logout => {
            session.logout()?;
            println!("Logged out.");
        }
        Command::Status => {
            let policy = config.retry_policy();
            println!("Logged in:  {}", session.is_logged_in());
            println!("Classifier: {}", config.classifier_url);
            println!("Field:      {}", config.upload_field);
            println!(
                "Retry:      {} attempts, {}ms base delay",
                policy.max_attempts,
                policy.base_delay.as_millis()
            );
        }
        Command::Labels => {
            for example in presenter::examples() {
                let color = presenter::color_for(example.label);
                println!(
                    "{}{:<14}{} {:<28} {}",
                    color.ansi(),
                    example.label.code(),
                    ANSI_RESET,
                    example.caption,
                    example.asset_path
                );
            }
        }
        Command::Classify { image, json } => {
            let candidate = ImageCandidate::from_path(&image)
                .with_context(|| format!("Failed to read {}", image.display()))?;
            let client = ClassifierClient::from_config(&config)?;
            let mut workflow = ClassifierWorkflow::new(session, client, &config.upload_field);

            workflow.select_file(candidate)?;
            if let Some(url) = workflow.preview().and_then(|p| p.url()) {
                info!("Preview available at {}", url);
            }
            let preview = match workflow.preview() {
                Some(p) if json => Some(p.data_url().context("Failed to read preview")?),
                _ => None,
            };

            let classification = match workflow.classify().await {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("{}", workflow.error_message().unwrap_or_default());
                    if e.requires_login() {
                        eprintln!("Run `oido-match login --token <TOKEN>` to sign in.");
                    }
                    workflow.reset();
                    bail!(e);
                }
            };

            let view = presenter::present(&classification);
            if json {
                let mut out = serde_json::to_value(&view)?;
                if let (Some(fields), Some(preview)) = (out.as_object_mut(), preview) {
                    fields.insert("preview".to_string(), preview.into());
                }
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{}", view.title);
                println!("{}{}{}", view.color.ansi(), view.headline, ANSI_RESET);
                if let Some(confidence) = &view.confidence_text {
                    println!("Confidence: {}", confidence);
                }
                println!("{}", view.description);
                println!("Reference:  {}", view.example.asset_path);
            }
            workflow.reset();
        }
    }

    Ok(())
}
