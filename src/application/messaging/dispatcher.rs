//! Command dispatcher - resolves inbound messages to commands and routes
//! replies back out
//!
//! The pipeline for one inbound message: resolve the command name (exact
//! token first, then two-token compound), gate on admin access, parse
//! arguments with the command's strategy, execute the handler, consume its
//! output eagerly, re-chunk oversized bodies, and hand every resulting
//! message to the backend in production order. A failing handler never
//! takes the process down: everything produced before the failure is still
//! sent, followed by exactly one synthetic error reply.

use std::sync::{Arc, RwLock};

use tracing::{debug, error, warn};

use crate::application::errors::{DispatchError, HandlerError};
use crate::application::messaging::chunk::split_message;
use crate::application::messaging::templates::Templates;
use crate::domain::entities::{
    CommandDescriptor, CommandOutput, CommandRegistry, Identifier, Message, ReplyItem,
};
use crate::domain::traits::Backend;

/// Fixed marker prepended to every synthetic error reply
pub const MSG_ERROR_OCCURRED: &str = "An error occurred while executing the command.";

/// Reply sent when no command matches
pub const MSG_COMMAND_NOT_FOUND: &str = "Command not found";

/// Reply sent to non-admins invoking admin-only commands
pub const MSG_ACCESS_DENIED: &str = "You are not allowed to use this command.";

pub struct Dispatcher {
    identity: Identifier,
    registry: Arc<RwLock<CommandRegistry>>,
    templates: Arc<RwLock<Templates>>,
    backend: Arc<dyn Backend>,
    admins: Vec<Identifier>,
    size_limit: usize,
    verbose_errors: bool,
}

impl Dispatcher {
    pub fn new(
        identity: Identifier,
        registry: Arc<RwLock<CommandRegistry>>,
        templates: Arc<RwLock<Templates>>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            identity,
            registry,
            templates,
            backend,
            admins: Vec::new(),
            size_limit: 0,
            verbose_errors: true,
        }
    }

    pub fn with_admins(mut self, admins: Vec<Identifier>) -> Self {
        self.admins = admins;
        self
    }

    /// Maximum outbound body size in characters; 0 disables chunking.
    pub fn with_size_limit(mut self, limit: usize) -> Self {
        self.size_limit = limit;
        self
    }

    /// Whether synthetic error replies include the failure description.
    pub fn with_verbose_errors(mut self, verbose: bool) -> Self {
        self.verbose_errors = verbose;
        self
    }

    fn is_admin(&self, who: &Identifier) -> bool {
        self.admins.iter().any(|a| a.bare_matches(who))
    }

    /// Run one dispatch cycle for `text`, the inbound body with the command
    /// prefix already removed. Every failure kind degrades to a reply; the
    /// cycle always ends back at idle.
    pub async fn dispatch(&self, message: &Message, text: &str) {
        if let Err(e) = self.try_dispatch(message, text).await {
            match e {
                DispatchError::CommandNotFound(name) => {
                    debug!("no command matches '{}'", name);
                    self.send_reply(message, format!("{}: {}", MSG_COMMAND_NOT_FOUND, name))
                        .await;
                }
                DispatchError::AccessDenied => {
                    warn!("{} denied access to an admin command", message.from);
                    self.send_reply(message, MSG_ACCESS_DENIED).await;
                }
                DispatchError::ArgumentSyntax(e) => {
                    self.send_reply(message, format!("Invalid arguments: {}", e))
                        .await;
                }
                DispatchError::Handler(e) => {
                    error!("command failed: {}", e);
                    self.send_error(message, &e).await;
                }
            }
        }
    }

    async fn try_dispatch(&self, message: &Message, text: &str) -> Result<(), DispatchError> {
        // Clone the descriptor out so no registry lock is held across awaits.
        let resolved = {
            let registry = self.registry.read().expect("registry lock poisoned");
            registry.resolve_command(text)
        };

        let Some((descriptor, arg_text)) = resolved else {
            let name = text.split_whitespace().next().unwrap_or("").to_string();
            return Err(DispatchError::CommandNotFound(name));
        };

        if descriptor.admin_only && !self.is_admin(&message.from) {
            return Err(DispatchError::AccessDenied);
        }

        let args = descriptor.arg_parser.parse(&arg_text)?;

        debug!("executing command {} args {:?}", descriptor.name, args);
        let output = descriptor
            .handler
            .execute(message, args)
            .await
            .map_err(DispatchError::Handler)?;
        self.emit(message, &descriptor, output).await;
        Ok(())
    }

    /// Consume the handler output to completion, sending each produced item
    /// in order. A mid-stream failure keeps everything already sent and
    /// appends a single synthetic error reply.
    async fn emit(&self, inbound: &Message, descriptor: &CommandDescriptor, output: CommandOutput) {
        match output {
            CommandOutput::Single(item) => self.send_item(inbound, descriptor, item).await,
            CommandOutput::Stream(stream) => {
                for item in stream {
                    match item {
                        Ok(item) => self.send_item(inbound, descriptor, item).await,
                        Err(e) => {
                            error!(
                                "command {} failed mid-sequence: {}",
                                descriptor.name, e
                            );
                            self.send_error(inbound, &e).await;
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn send_item(&self, inbound: &Message, descriptor: &CommandDescriptor, item: ReplyItem) {
        let reply = match item {
            ReplyItem::Text(body) => inbound.reply(&self.identity, body),
            ReplyItem::Data(value) => {
                let markup = match &descriptor.template {
                    Some(name) => {
                        let templates = self.templates.read().expect("templates lock poisoned");
                        templates.render(name, &value)
                    }
                    None => value.to_string(),
                };
                inbound.reply_with_markup(&self.identity, &markup)
            }
        };
        self.send_chunked(reply).await;
    }

    async fn send_error(&self, inbound: &Message, err: &HandlerError) {
        let body = if self.verbose_errors {
            format!("{}\n{}", MSG_ERROR_OCCURRED, err)
        } else {
            MSG_ERROR_OCCURRED.to_string()
        };
        self.send_reply(inbound, body).await;
    }

    async fn send_reply(&self, inbound: &Message, body: impl Into<String>) {
        self.send_chunked(inbound.reply(&self.identity, body)).await;
    }

    /// Split an oversized body into protocol-legal chunks, each sent as its
    /// own message with the same addressing. Markup is only kept when the
    /// body fits in one piece.
    async fn send_chunked(&self, reply: Message) {
        let parts = split_message(&reply.body, self.size_limit);
        if parts.len() == 1 {
            self.send(reply).await;
            return;
        }
        for part in parts {
            let msg = Message::new(reply.from.clone(), reply.to.clone(), part).with_kind(reply.kind);
            self.send(msg).await;
        }
    }

    async fn send(&self, message: Message) {
        if let Err(e) = self.backend.send(message).await {
            // Delivery problems are the adapter's to report; the pipeline
            // stays alive.
            error!("{}", e);
        }
    }
}
