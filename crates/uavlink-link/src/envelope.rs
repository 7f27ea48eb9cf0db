//! Message envelopes carried across the dispatch bus.

use uavlink_wire::{Message, MessageKind};

/// A decoded telemetry message on its way from the link to subscribers.
///
/// The kind is captured at construction so filters can be evaluated
/// without touching the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryMessage {
    kind: MessageKind,
    message: Message,
}

impl TelemetryMessage {
    pub fn new(message: Message) -> Self {
        Self {
            kind: message.kind(),
            message,
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn message(&self) -> &Message {
        &self.message
    }
}

/// A command message on its way from a caller to the wire.
///
/// Consumed by [`crate::DispatchBus::publish_outbound`]; the link task
/// assigns the sequence number and sender ids when it packs the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMessage {
    message: Message,
}

impl CommandMessage {
    pub fn new(message: Message) -> Self {
        Self { message }
    }

    pub fn kind(&self) -> MessageKind {
        self.message.kind()
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub(crate) fn into_message(self) -> Message {
        self.message
    }
}
