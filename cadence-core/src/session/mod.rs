//! Agent session transport and event model

mod claude;
mod client;
mod event;

pub use claude::ClaudeSession;
pub use client::{
    AgentDefinition, SessionClient, SessionHandle, SessionOptions, SessionStream,
};
pub use event::SessionEvent;
