//! Core built-in commands: help and about

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::json;

use crate::application::errors::HandlerError;
use crate::application::messaging::Templates;
use crate::domain::entities::{
    CommandDescriptor, CommandHandler, CommandOutput, CommandRegistry, Message,
};

const OWNER: &str = "core";

struct HelpHandler {
    registry: Arc<RwLock<CommandRegistry>>,
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn execute(
        &self,
        _message: &Message,
        args: Vec<String>,
    ) -> Result<CommandOutput, HandlerError> {
        let registry = self.registry.read().expect("registry lock poisoned");

        if let Some(name) = args.first() {
            let Some(desc) = registry.resolve(name) else {
                return Ok(CommandOutput::text(format!("Command {} not found", name)));
            };
            let help = desc.help.as_deref().unwrap_or("No description");
            return Ok(CommandOutput::text(format!("{} - {}", desc.name, help)));
        }

        let mut entries: Vec<(String, String)> = registry
            .iter()
            .map(|d| {
                (
                    d.name.clone(),
                    d.help.clone().unwrap_or_else(|| "No description".to_string()),
                )
            })
            .collect();
        entries.sort();

        let mut out = "Available commands:\n".to_string();
        for (name, help) in entries {
            out.push_str(&format!("  {} - {}\n", name, help));
        }
        Ok(CommandOutput::text(out))
    }
}

struct AboutHandler;

#[async_trait]
impl CommandHandler for AboutHandler {
    async fn execute(
        &self,
        _message: &Message,
        _args: Vec<String>,
    ) -> Result<CommandOutput, HandlerError> {
        Ok(CommandOutput::data(json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        })))
    }
}

/// Register the core commands and their response templates.
pub fn register(
    registry: &mut CommandRegistry,
    templates: &mut Templates,
    shared_registry: Arc<RwLock<CommandRegistry>>,
) {
    registry.register(
        CommandDescriptor::new(
            "help",
            Arc::new(HelpHandler {
                registry: shared_registry,
            }),
        )
        .with_owner(OWNER)
        .with_help("Show available commands: help [<command>]"),
    );

    templates.register("about", "<strong>{name}</strong> version {version}");
    registry.register(
        CommandDescriptor::new("about", Arc::new(AboutHandler))
            .with_owner(OWNER)
            .with_template("about")
            .with_help("Show bot name and version: about"),
    );
}
