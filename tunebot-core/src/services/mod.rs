// File: tunebot-core/src/services/mod.rs

pub mod builtin_commands;
pub mod command_service;
pub mod message_sender;

pub use command_service::{CommandContext, CommandHandler, CommandInvocation, CommandService, Reply};
pub use message_sender::MessageSender;
