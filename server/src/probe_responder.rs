use log::trace;

use kinesync_shared::{GameInstant, ProbeReply, ProbeRequest};

/// Answers clock probes by stamping them with the host's current time.
#[derive(Default)]
pub struct ProbeResponder {
    replies: u64,
}

impl ProbeResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo the probe's send timestamp alongside `now`, read as close to the
    /// moment of sending as the caller can manage.
    pub fn respond(&mut self, request: &ProbeRequest, now: &GameInstant) -> ProbeReply {
        self.replies += 1;
        trace!(
            "answering probe from {} sent at {}",
            request.peer_id,
            request.local_send_timestamp
        );
        request.reply(*now)
    }

    pub fn replies(&self) -> u64 {
        self.replies
    }
}
