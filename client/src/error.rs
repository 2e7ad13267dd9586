use thiserror::Error;

use kinesync_shared::{ConfigError, SyncError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The peer task has shut down and no longer accepts commands
    #[error("peer task for {peer} is no longer running")]
    TaskStopped { peer: kinesync_shared::PeerId },
}
