//! Room management commands
//!
//! `room_*` commands let users drive the backend's room operations from
//! chat. Backend failures here come back as plain string replies so the
//! user sees what went wrong without tripping the fault-isolation path.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::HandlerError;
use crate::application::messaging::ArgParser;
use crate::domain::entities::{
    CommandDescriptor, CommandHandler, CommandOutput, CommandRegistry, Identifier, JoinedRoomSet,
    Message, ReplyItem, RoomId,
};
use crate::domain::traits::Backend;

const OWNER: &str = "chatroom";

struct RoomOps {
    backend: Arc<dyn Backend>,
    rooms: Arc<JoinedRoomSet>,
    username: String,
}

#[derive(Clone, Copy)]
enum RoomAction {
    Create,
    Join,
    Leave,
    Destroy,
    Invite,
    List,
    Occupants,
    Topic,
}

struct RoomCommand {
    ops: Arc<RoomOps>,
    action: RoomAction,
}

#[async_trait]
impl CommandHandler for RoomCommand {
    async fn execute(
        &self,
        _message: &Message,
        args: Vec<String>,
    ) -> Result<CommandOutput, HandlerError> {
        let ops = &self.ops;
        match self.action {
            RoomAction::Create => Ok(CommandOutput::text(ops.create(args).await)),
            RoomAction::Join => Ok(CommandOutput::text(ops.join(args).await)),
            RoomAction::Leave => Ok(CommandOutput::text(ops.leave(args).await)),
            RoomAction::Destroy => Ok(CommandOutput::text(ops.destroy(args).await)),
            RoomAction::Invite => Ok(CommandOutput::text(ops.invite(args).await)),
            RoomAction::List => Ok(CommandOutput::text(ops.list())),
            RoomAction::Occupants => {
                let items = ops.occupants(args).await;
                Ok(CommandOutput::stream(
                    items.into_iter().map(|s| Ok(ReplyItem::Text(s))),
                ))
            }
            RoomAction::Topic => Ok(CommandOutput::text(ops.topic(args).await)),
        }
    }
}

impl RoomOps {
    async fn create(&self, args: Vec<String>) -> String {
        let Some(room) = args.first().filter(|r| !r.is_empty()) else {
            return "Please tell me which chatroom to create.".to_string();
        };
        let room = RoomId::new(room);
        match self.backend.create_room(&room).await {
            Ok(()) => format!("Created the room {}", room),
            Err(e) => e.to_string(),
        }
    }

    async fn join(&self, args: Vec<String>) -> String {
        if args.is_empty() {
            return "Please tell me which chatroom to join.".to_string();
        }
        let room = RoomId::new(&args[0]);
        let password = if args.len() > 1 {
            Some(args[1..].join(" "))
        } else {
            None
        };
        match self
            .backend
            .join_room(&room, &self.username, password.as_deref())
            .await
        {
            Ok(handle) => {
                if let Err(e) = self.rooms.insert(handle) {
                    return e.to_string();
                }
                format!("Joined the room {}", room)
            }
            Err(e) => e.to_string(),
        }
    }

    async fn leave(&self, args: Vec<String>) -> String {
        let Some(room) = args.first().filter(|r| !r.is_empty()) else {
            return "Please tell me which chatroom to leave.".to_string();
        };
        let room = RoomId::new(room);
        match self.backend.leave_room(&room).await {
            Ok(()) => {
                let _ = self.rooms.remove(&room);
                format!("Left the room {}", room)
            }
            Err(e) => e.to_string(),
        }
    }

    async fn destroy(&self, args: Vec<String>) -> String {
        let Some(room) = args.first().filter(|r| !r.is_empty()) else {
            return "Please tell me which chatroom to destroy.".to_string();
        };
        let room = RoomId::new(room);
        match self.backend.destroy_room(&room).await {
            Ok(()) => {
                let _ = self.rooms.remove(&room);
                format!("Destroyed the room {}", room)
            }
            Err(e) => e.to_string(),
        }
    }

    async fn invite(&self, args: Vec<String>) -> String {
        if args.len() < 2 {
            return "Please tell me which person(s) to invite into which room.".to_string();
        }
        let room = RoomId::new(&args[0]);
        let mut invitees = Vec::with_capacity(args.len() - 1);
        for raw in &args[1..] {
            match Identifier::parse(raw) {
                Ok(id) => invitees.push(id),
                Err(e) => return e.to_string(),
            }
        }
        match self.backend.invite(&room, &invitees).await {
            Ok(()) => format!("Invited {} into the room {}", args[1..].join(", "), room),
            Err(e) => e.to_string(),
        }
    }

    fn list(&self) -> String {
        let joined = self.rooms.list();
        if joined.is_empty() {
            "I'm not currently in any rooms.".to_string()
        } else {
            let names: Vec<String> = joined.iter().map(|r| r.to_string()).collect();
            format!("I'm currently in these rooms:\n\t{}", names.join("\n\t"))
        }
    }

    /// One reply item per queried room, errors included, so partial results
    /// still go out when a later room fails.
    async fn occupants(&self, args: Vec<String>) -> Vec<String> {
        if args.is_empty() {
            return vec!["Please supply a room to list the occupants of.".to_string()];
        }
        let mut items = Vec::with_capacity(args.len());
        for raw in &args {
            let room = RoomId::new(raw);
            match self.backend.occupants(&room).await {
                Ok(occupants) => {
                    // Room occupants are addressed room@host/nick; show the nick.
                    let people: Vec<&str> = occupants
                        .iter()
                        .map(|o| o.resource().unwrap_or_else(|| o.person()))
                        .collect();
                    items.push(format!("Occupants in {}:\n\t{}", room, people.join("\n\t")));
                }
                Err(e) => items.push(format!("Cannot list occupants in {}: {}", room, e)),
            }
        }
        items
    }

    async fn topic(&self, args: Vec<String>) -> String {
        match args.len() {
            0 => "Please tell me which chatroom you want to know the topic of.".to_string(),
            1 => {
                let room = RoomId::new(&args[0]);
                match self.backend.topic(&room).await {
                    Ok(Some(topic)) => format!("Topic for {}: {}", room, topic),
                    Ok(None) => format!("No topic is set for {}", room),
                    Err(e) => format!("Cannot get the topic for {}: {}", room, e),
                }
            }
            _ => {
                let room = RoomId::new(&args[0]);
                match self.backend.set_topic(&room, &args[1]).await {
                    Ok(()) => format!("Topic for {} set.", room),
                    Err(e) => format!("Cannot set the topic for {}: {}", room, e),
                }
            }
        }
    }
}

/// Register every room command under the `chatroom` owner tag.
pub fn register(
    registry: &mut CommandRegistry,
    backend: Arc<dyn Backend>,
    rooms: Arc<JoinedRoomSet>,
    username: String,
) {
    let ops = Arc::new(RoomOps {
        backend,
        rooms,
        username,
    });

    let command = |name: &str, action: RoomAction, help: &str| {
        CommandDescriptor::new(
            name,
            Arc::new(RoomCommand {
                ops: ops.clone(),
                action,
            }),
        )
        .with_owner(OWNER)
        .with_help(help)
    };

    registry.register(command(
        "room_create",
        RoomAction::Create,
        "Create a chatroom: room create <room>",
    ));
    registry.register(command(
        "room_join",
        RoomAction::Join,
        "Join a chatroom: room join <room> [<password>]",
    ));
    registry.register(command(
        "room_leave",
        RoomAction::Leave,
        "Leave a chatroom: room leave <room>",
    ));
    registry.register(command(
        "room_destroy",
        RoomAction::Destroy,
        "Destroy a chatroom: room destroy <room>",
    ));
    registry.register(command(
        "room_invite",
        RoomAction::Invite,
        "Invite people into a chatroom: room invite <room> <address>...",
    ));
    registry.register(command(
        "room_list",
        RoomAction::List,
        "List the rooms I have joined: room list",
    ));
    registry.register(
        command(
            "room_occupants",
            RoomAction::Occupants,
            "List the occupants of rooms: room occupants <room>...",
        )
        .with_parser(ArgParser::Shell),
    );
    registry.register(
        command(
            "room_topic",
            RoomAction::Topic,
            "Get or set a room topic: room topic <room> [<topic>]",
        )
        .with_parser(ArgParser::Shell),
    );
}
