//! # Kinesync Server
//! The authoritative host side of kinesync: answers clock probes from
//! observers and publishes timestamped movement snapshots of the entities
//! it simulates.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

mod authoritative_world;
mod probe_responder;
mod server_config;
mod sync_server;

pub use authoritative_world::AuthoritativeWorld;
pub use probe_responder::ProbeResponder;
pub use server_config::ServerConfig;
pub use sync_server::SyncServer;
