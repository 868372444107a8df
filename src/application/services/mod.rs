pub mod bot_service;

pub use bot_service::BotService;
