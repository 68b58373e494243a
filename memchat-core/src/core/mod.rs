//! Conversation orchestration: input commands and the turn state machine

pub mod command;
pub mod conversation;

pub use command::Command;
pub use conversation::{
    ConversationLoop, LoopState, NoopObserver, SessionContext, TurnError, TurnObserver,
    TurnOutcome,
};
