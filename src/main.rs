use std::sync::Arc;

use clap::{Parser, Subcommand};

use relaybot::application::services::BotService;
use relaybot::domain::entities::{Identifier, Message};
use relaybot::domain::traits::Backend;
use relaybot::infrastructure::adapters::{ConsoleAdapter, HarnessAdapter};
use relaybot::infrastructure::config::Config;

#[derive(Parser)]
#[command(name = "relaybot")]
#[command(about = "Chat-bot middleware with command dispatch and room relaying", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run {
        /// Use the in-memory test harness backend instead of the console
        #[arg(long)]
        test: bool,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { test } => {
            run_bot(cli.config, test);
        }
        Commands::Version => {
            println!("relaybot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn run_bot(config_path: String, test_mode: bool) {
    let config = if std::path::Path::new(&config_path).exists() {
        match Config::load(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        tracing::warn!("No config file at {}, using defaults", config_path);
        Config::default()
    };

    tracing::info!("Starting relaybot as {}", config.bot.identity);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    rt.block_on(async {
        let result = if test_mode {
            run_with_harness(&config).await
        } else {
            let identity = match Identifier::parse(&config.bot.identity) {
                Ok(id) => id,
                Err(e) => {
                    tracing::error!("Invalid bot identity: {}", e);
                    std::process::exit(1);
                }
            };
            let backend: Arc<dyn Backend> = Arc::new(ConsoleAdapter::new(identity));
            serve(&config, backend).await
        };

        if let Err(e) = result {
            tracing::error!("Bot stopped with error: {}", e);
            std::process::exit(1);
        }
    });
}

/// Run against the in-memory harness with a couple of canned messages, to
/// smoke-test a configuration without connecting anywhere.
async fn run_with_harness(config: &Config) -> Result<(), relaybot::application::errors::BotError> {
    let harness = HarnessAdapter::new();
    let backend: Arc<dyn Backend> = harness.clone();
    let bot = Arc::new(BotService::from_config(config, backend.clone())?);

    let sender = Identifier::new("tester", "localhost").with_resource("cli");
    let own = bot.identity().clone();
    harness.inject(Message::new(
        sender.clone(),
        own.clone(),
        format!("{}help", config.bot.prefix),
    ));
    harness.inject(Message::new(
        sender,
        own,
        format!("{}about", config.bot.prefix),
    ));
    harness.close();

    backend.serve(bot.clone()).await?;
    while let Some(out) = harness.pop_message() {
        println!("[to {}] {}", out.to, out.body);
    }
    bot.deactivate();
    Ok(())
}

async fn serve(
    config: &Config,
    backend: Arc<dyn Backend>,
) -> Result<(), relaybot::application::errors::BotError> {
    let bot = Arc::new(BotService::from_config(config, backend.clone())?);
    backend.serve(bot.clone()).await?;
    bot.deactivate();
    Ok(())
}

fn init_config() {
    let config = Config::default();
    match config.to_yaml() {
        Ok(yaml) => match std::fs::write("config.yaml", yaml) {
            Ok(()) => println!("Wrote default config to config.yaml"),
            Err(e) => {
                tracing::error!("Failed to write config.yaml: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!("Failed to serialize default config: {}", e);
            std::process::exit(1);
        }
    }
}
