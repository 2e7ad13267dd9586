//! # Kinesync Client
//! Observer side of kinesync: samples the latency and clock offset of every
//! connected peer, rebuilds those estimates after a reconnect, and reconciles
//! the movement of replicated entities against the authoritative snapshots
//! those peers send.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

mod client;
mod client_config;
mod error;
mod events;

pub mod connection;
pub mod replication;

cfg_if! {
    if #[cfg(feature = "tokio_task")] {
        pub mod task;
        pub use task::{spawn_peer_task, PeerCommand, PeerTaskHandle};
    }
}

pub use client::SyncClient;
pub use client_config::ClientConfig;
pub use connection::{
    ClockSample, ClockSampler, ConnectionState, Peer, PeerArena, PeerClock, PeerStatus,
    ResyncCoordinator,
};
pub use error::ClientError;
pub use events::{SyncDiagnostics, SyncEvent, SyncEvents};
pub use replication::{
    BufferedSnapshot, Correction, MovementReplicator, ReconciliationPolicy, ReconciliationState,
    ReplicatedEntity, SharedSnapshotBuffer, SnapshotBuffer,
};
