//! Built-in command plugins
//!
//! Each plugin registers its command descriptors under an owner tag at
//! activation time; `CommandRegistry::unregister_all` with the same tag
//! deactivates it again.

pub mod chat_room;
pub mod core;

use std::sync::{Arc, RwLock};

use crate::application::messaging::Templates;
use crate::domain::entities::{CommandRegistry, JoinedRoomSet};
use crate::domain::traits::Backend;

/// Shared handles the built-in plugins need at registration time
pub struct PluginContext {
    pub backend: Arc<dyn Backend>,
    pub rooms: Arc<JoinedRoomSet>,
    pub registry: Arc<RwLock<CommandRegistry>>,
    pub room_username: String,
}

/// Register all built-in plugins, in activation order.
pub fn install_builtins(
    registry: &Arc<RwLock<CommandRegistry>>,
    templates: &Arc<RwLock<Templates>>,
    ctx: PluginContext,
) {
    let mut reg = registry.write().expect("registry lock poisoned");
    let mut tpl = templates.write().expect("templates lock poisoned");
    core::register(&mut reg, &mut tpl, ctx.registry.clone());
    chat_room::register(&mut reg, ctx.backend, ctx.rooms, ctx.room_username);
}
