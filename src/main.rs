//! omnichat - a single-session conversational assistant with web
//! augmentation, image-to-text encoding, and streamed replies.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use omnichat::augment::{Augmentor, HttpWebClient};
use omnichat::config::{get_config_path, load_config, save_config};
use omnichat::pipeline::run_turn;
use omnichat::providers::OpenAiCompatProvider;
use omnichat::repl::Repl;
use omnichat::session::{ImageBlob, SessionContext};
use omnichat::speech::HttpSpeechProvider;
use omnichat::stream::StreamOutcome;

pub(crate) const VERSION: &str = "0.1.0";

#[derive(Parser)]
#[command(name = "omnichat", about = "omnichat - Everything AI Assistant", version = VERSION)]
struct Cli {
    /// Path to the config file (default: ~/.omnichat/config.json).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session.
    Chat,
    /// Send a single message and print the reply.
    Send {
        /// Message text.
        message: String,
        /// Image file(s) to attach to the message.
        #[arg(short, long)]
        attach: Vec<PathBuf>,
    },
    /// Show the current configuration.
    Status,
    /// Write a default config file if none exists.
    Init,
    /// Show or edit the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as JSON.
    Show,
    /// Set one value by its dotted JSON key and save.
    Set { key: String, value: String },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,omnichat=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Chat => {
            let chat = Box::new(OpenAiCompatProvider::new(&config.model));
            let web = Box::new(HttpWebClient::new());
            let augmentor = Augmentor::new(web, &config.pipeline);
            let speech = Box::new(HttpSpeechProvider::new(&config.model));
            let mut repl = Repl::new(config, chat, augmentor, speech);
            repl.run().await;
        }
        Commands::Send { message, attach } => {
            let chat = OpenAiCompatProvider::new(&config.model);
            let web = Box::new(HttpWebClient::new());
            let mut augmentor = Augmentor::new(web, &config.pipeline);
            let mut session = SessionContext::new();

            for path in &attach {
                match std::fs::read(path) {
                    Ok(bytes) => {
                        let name = path
                            .file_name()
                            .map(|f| f.to_string_lossy().into_owned())
                            .unwrap_or_else(|| path.display().to_string());
                        session.stage_image(ImageBlob::new(name, bytes));
                    }
                    Err(e) => {
                        eprintln!("Could not read {}: {}", path.display(), e);
                        std::process::exit(1);
                    }
                }
            }

            let result = run_turn(
                &mut session,
                &config,
                &chat,
                &mut augmentor,
                &message,
                |_| {},
            )
            .await;
            println!("{}", result.response.text);
            if result.response.outcome == StreamOutcome::Errored {
                std::process::exit(1);
            }
        }
        Commands::Status => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(get_config_path);
            println!("Config:        {}", path.display());
            println!("Model:         {} @ {}", config.model.model, config.model.api_base);
            println!("Max tokens:    {}", config.model.max_tokens);
            println!("Temperature:   {}", config.model.temperature);
            println!("History window: {}", config.pipeline.history_window);
            println!(
                "Image grid:    {0}x{0} (edge threshold {1})",
                config.pipeline.grid_size, config.pipeline.edge_threshold
            );
            println!("Voice:         {}", config.voice.voice);
            let key = config.model.resolved_api_key();
            println!(
                "API key:       {}",
                if key.is_empty() { "not configured" } else { "configured" }
            );
        }
        Commands::Init => {
            let path = cli.config.clone().unwrap_or_else(get_config_path);
            if path.exists() {
                println!("Config already exists at {}", path.display());
            } else {
                save_config(&config, Some(&path));
                println!("Wrote default config to {}", path.display());
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => match serde_json::to_string_pretty(&config) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Could not serialize config: {}", e),
            },
            ConfigAction::Set { key, value } => {
                let mut config = config;
                match config.set_value(&key, &value) {
                    Ok(()) => {
                        let path = cli.config.clone().unwrap_or_else(get_config_path);
                        save_config(&config, Some(&path));
                        println!("Set {} = {}", key, value);
                    }
                    Err(e) => {
                        eprintln!("{}", e);
                        std::process::exit(1);
                    }
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_send_with_attachments() {
        let cli = Cli::try_parse_from(["omnichat", "send", "hello", "--attach", "cat.png"])
            .unwrap();
        match cli.command {
            Commands::Send { message, attach } => {
                assert_eq!(message, "hello");
                assert_eq!(attach, vec![PathBuf::from("cat.png")]);
            }
            _ => panic!("expected send subcommand"),
        }
    }

    #[test]
    fn test_cli_parses_config_show_and_set() {
        let cli = Cli::try_parse_from(["omnichat", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));

        let cli = Cli::try_parse_from(["omnichat", "config", "set", "voice.voice", "nova"])
            .unwrap();
        match cli.command {
            Commands::Config {
                action: ConfigAction::Set { key, value },
            } => {
                assert_eq!(key, "voice.voice");
                assert_eq!(value, "nova");
            }
            _ => panic!("expected config set subcommand"),
        }
    }
}
