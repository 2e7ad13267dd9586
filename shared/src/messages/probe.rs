use crate::{GameInstant, PeerId};

/// Sent by an observer to measure latency to `peer_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeRequest {
    pub peer_id: PeerId,
    pub local_send_timestamp: GameInstant,
}

impl ProbeRequest {
    pub fn new(peer_id: PeerId, local_send_timestamp: GameInstant) -> Self {
        Self {
            peer_id,
            local_send_timestamp,
        }
    }

    /// Build the reply the probed host sends back, stamped with its own clock.
    pub fn reply(&self, remote_timestamp_at_reply: GameInstant) -> ProbeReply {
        ProbeReply {
            peer_id: self.peer_id,
            original_send_timestamp: self.local_send_timestamp,
            remote_timestamp_at_reply,
        }
    }
}

/// Echo of a [`ProbeRequest`], carrying the responder's clock reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeReply {
    pub peer_id: PeerId,
    pub original_send_timestamp: GameInstant,
    pub remote_timestamp_at_reply: GameInstant,
}
