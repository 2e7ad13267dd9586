mod peer_task;

pub use peer_task::{spawn_peer_task, PeerCommand, PeerTaskHandle};
