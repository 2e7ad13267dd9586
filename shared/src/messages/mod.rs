//! Message shapes exchanged with the transport collaborator. Only fields are
//! defined here; byte encoding belongs to the transport.

mod display;
mod probe;
mod snapshot;

pub use display::EntityDisplay;
pub use probe::{ProbeReply, ProbeRequest};
pub use snapshot::MovementSnapshot;
