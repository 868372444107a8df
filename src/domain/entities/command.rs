use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::HandlerError;
use crate::application::messaging::args::ArgParser;
use crate::domain::entities::Message;

/// One item of command output: either plain text, or a structured value to
/// be rendered through the command's template.
#[derive(Debug, Clone)]
pub enum ReplyItem {
    Text(String),
    Data(serde_json::Value),
}

impl From<String> for ReplyItem {
    fn from(s: String) -> Self {
        ReplyItem::Text(s)
    }
}

impl From<&str> for ReplyItem {
    fn from(s: &str) -> Self {
        ReplyItem::Text(s.to_string())
    }
}

impl From<serde_json::Value> for ReplyItem {
    fn from(v: serde_json::Value) -> Self {
        ReplyItem::Data(v)
    }
}

/// A lazily produced, finite, non-restartable sequence of reply items.
/// The pipeline consumes it to exhaustion or first fault.
pub type ReplyStream = Box<dyn Iterator<Item = Result<ReplyItem, HandlerError>> + Send>;

/// What a command handler may produce: one item, or a lazy sequence of
/// items sent as separate messages in production order.
pub enum CommandOutput {
    Single(ReplyItem),
    Stream(ReplyStream),
}

impl CommandOutput {
    pub fn text(s: impl Into<String>) -> Self {
        CommandOutput::Single(ReplyItem::Text(s.into()))
    }

    pub fn data(v: serde_json::Value) -> Self {
        CommandOutput::Single(ReplyItem::Data(v))
    }

    pub fn stream<I>(items: I) -> Self
    where
        I: Iterator<Item = Result<ReplyItem, HandlerError>> + Send + 'static,
    {
        CommandOutput::Stream(Box::new(items))
    }
}

impl From<String> for CommandOutput {
    fn from(s: String) -> Self {
        CommandOutput::text(s)
    }
}

/// A registered command implementation
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, message: &Message, args: Vec<String>)
        -> Result<CommandOutput, HandlerError>;
}

/// Adapter for commands that are plain synchronous functions
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&Message, Vec<String>) -> Result<CommandOutput, HandlerError> + Send + Sync,
{
    async fn execute(
        &self,
        message: &Message,
        args: Vec<String>,
    ) -> Result<CommandOutput, HandlerError> {
        (self.0)(message, args)
    }
}

/// Registered metadata for a command
#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub handler: Arc<dyn CommandHandler>,
    pub arg_parser: ArgParser,
    pub template: Option<String>,
    pub help: Option<String>,
    pub admin_only: bool,
    pub owner: String,
}

impl CommandDescriptor {
    pub fn new(name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            name: name.into(),
            handler,
            arg_parser: ArgParser::Whitespace,
            template: None,
            help: None,
            admin_only: false,
            owner: "core".to_string(),
        }
    }

    pub fn with_parser(mut self, parser: ArgParser) -> Self {
        self.arg_parser = parser;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }
}

/// Command registry mapping command names to descriptors.
///
/// Registration is last-wins so plugins can override built-ins. The
/// registry is rebuilt from plugin activation order at process start and is
/// not expected to change outside activation/deactivation.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<CommandDescriptor>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: CommandDescriptor) {
        self.commands
            .insert(descriptor.name.clone(), Arc::new(descriptor));
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<CommandDescriptor>> {
        self.commands.get(name).cloned()
    }

    /// Resolve raw command text to a descriptor plus the remaining argument
    /// text. The first whitespace token is tried as an exact name first;
    /// failing that, the first two tokens joined by `_` are tried as a
    /// compound name (`room create` resolves `room_create`).
    pub fn resolve_command(&self, text: &str) -> Option<(Arc<CommandDescriptor>, String)> {
        let text = text.trim_start();
        let (first, rest) = split_first_token(text);
        if first.is_empty() {
            return None;
        }
        if let Some(desc) = self.resolve(first) {
            return Some((desc, rest.to_string()));
        }
        let (second, rest) = split_first_token(rest);
        if !second.is_empty() {
            if let Some(desc) = self.resolve(&format!("{}_{}", first, second)) {
                return Some((desc, rest.to_string()));
            }
        }
        None
    }

    /// Drop every descriptor registered by `owner`, returning how many were
    /// removed. Used on plugin deactivation.
    pub fn unregister_all(&mut self, owner: &str) -> usize {
        let before = self.commands.len();
        self.commands.retain(|_, desc| desc.owner != owner);
        before - self.commands.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CommandDescriptor>> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn split_first_token(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((tok, rest)) => (tok, rest.trim_start()),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> CommandDescriptor {
        let handler = FnHandler(
            |_msg: &Message, _args: Vec<String>| -> Result<CommandOutput, HandlerError> {
                Ok(CommandOutput::text("ok"))
            },
        );
        CommandDescriptor::new(name, Arc::new(handler))
    }

    #[test]
    fn exact_match_resolves() {
        let mut reg = CommandRegistry::new();
        reg.register(noop("status"));
        let (desc, rest) = reg.resolve_command("status now please").unwrap();
        assert_eq!(desc.name, "status");
        assert_eq!(rest, "now please");
    }

    #[test]
    fn compound_match_resolves_two_tokens() {
        let mut reg = CommandRegistry::new();
        reg.register(noop("room_create"));
        let (desc, rest) = reg.resolve_command("room create myroom@conf.x").unwrap();
        assert_eq!(desc.name, "room_create");
        assert_eq!(rest, "myroom@conf.x");

        let (direct, _) = reg.resolve_command("room_create myroom@conf.x").unwrap();
        assert_eq!(direct.name, "room_create");
    }

    #[test]
    fn exact_match_takes_priority_over_compound() {
        let mut reg = CommandRegistry::new();
        reg.register(noop("room_create"));
        reg.register(noop("room"));
        let (desc, rest) = reg.resolve_command("room create").unwrap();
        assert_eq!(desc.name, "room");
        assert_eq!(rest, "create");
    }

    #[test]
    fn unknown_command_is_none() {
        let reg = CommandRegistry::new();
        assert!(reg.resolve_command("nope").is_none());
        assert!(reg.resolve_command("").is_none());
    }

    #[test]
    fn reregistration_overwrites() {
        let mut reg = CommandRegistry::new();
        reg.register(noop("status").with_help("first"));
        reg.register(noop("status").with_help("second"));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.resolve("status").unwrap().help.as_deref(), Some("second"));
    }

    #[test]
    fn unregister_all_removes_by_owner() {
        let mut reg = CommandRegistry::new();
        reg.register(noop("a").with_owner("p1"));
        reg.register(noop("b").with_owner("p1"));
        reg.register(noop("c").with_owner("p2"));
        assert_eq!(reg.unregister_all("p1"), 2);
        assert!(reg.resolve("a").is_none());
        assert!(reg.resolve("c").is_some());
    }
}
