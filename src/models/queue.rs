//! Queue item models for the inbound and outbound pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat message received from a user, waiting for interpretation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueMessageIn {
    /// User identity the reply will be addressed to.
    pub sender_id: String,
    /// Raw message text.
    pub text: String,
    /// Display name shown by the chat client.
    pub display_name: String,
    /// When the receiver accepted the message.
    pub received_at: DateTime<Utc>,
}

impl QueueMessageIn {
    /// Construct an inbound item stamped with the current time.
    #[must_use]
    pub fn new(sender_id: String, text: String, display_name: String) -> Self {
        Self {
            sender_id,
            text,
            display_name,
            received_at: Utc::now(),
        }
    }
}

/// Reply waiting for delivery by a responder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueMessageOut {
    /// User identity to deliver to.
    pub recipient_id: String,
    /// Reply text.
    pub text: String,
    /// Display name carried over from the inbound message.
    pub display_name: String,
    /// When the executor produced the reply.
    pub enqueued_at: DateTime<Utc>,
}

impl QueueMessageOut {
    /// Construct an outbound item stamped with the current time.
    #[must_use]
    pub fn new(recipient_id: String, text: String, display_name: String) -> Self {
        Self {
            recipient_id,
            text,
            display_name,
            enqueued_at: Utc::now(),
        }
    }
}

/// Name of a durable queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    /// Received chat messages.
    Inbound,
    /// Replies awaiting delivery.
    Outbound,
}

impl QueueName {
    /// Column value stored in `queue_message.queue`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

/// Leased queue item; commit it to remove it from the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery<T> {
    /// Queue sequence number.
    pub seq: i64,
    /// Lease token that must match on commit.
    pub lease_id: String,
    /// Number of times this item has been leased, including this one.
    pub attempts: u32,
    /// Decoded payload.
    pub payload: T,
}

/// Row counts for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueDepth {
    /// Items waiting or leased.
    pub ready: u64,
    /// Items currently under an unexpired lease.
    pub leased: u64,
    /// Items parked after too many deliveries.
    pub dead: u64,
}
