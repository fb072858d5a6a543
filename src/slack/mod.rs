//! Slack bridge: Socket Mode inbound events and `chat.postMessage` delivery.

pub mod client;
pub mod events;
