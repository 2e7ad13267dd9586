pub mod clock_sampler;
pub mod peer;
pub mod peer_arena;
pub mod peer_clock;
pub mod resync_coordinator;

pub use clock_sampler::{ClockSample, ClockSampler};
pub use peer::{ConnectionState, Peer, PeerStatus};
pub use peer_arena::PeerArena;
pub use peer_clock::PeerClock;
pub use resync_coordinator::ResyncCoordinator;
