//! Domain entities - Core business objects with no external dependencies

pub mod command;
pub mod identifier;
pub mod message;
pub mod room;

pub use command::{
    CommandDescriptor, CommandHandler, CommandOutput, CommandRegistry, FnHandler, ReplyItem,
    ReplyStream,
};
pub use identifier::Identifier;
pub use message::{Message, MessageKind};
pub use room::{JoinedRoomSet, RoomHandle, RoomId};
