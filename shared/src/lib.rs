//! # Kinesync Shared
//! Common functionality shared between kinesync-client & kinesync-server crates.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

mod backends;
mod config;
mod error;
mod game_time;
mod messages;
mod motion;
mod types;

pub use backends::{Clock, ManualClock, SystemClock, Timer};
cfg_if! {
    if #[cfg(feature = "tokio_clock")] {
        pub use backends::TokioClock;
    }
}
pub use config::{ConfigError, ConfigSource, MapSource, ReconciliationConfig, SyncConfig, SyncOption};
pub use error::SyncError;
pub use game_time::{ClockOffset, GameInstant};
pub use messages::{EntityDisplay, MovementSnapshot, ProbeReply, ProbeRequest};
pub use motion::MotionState;
pub use types::{EntityId, PeerId};

pub use glam::{Quat, Vec3};
