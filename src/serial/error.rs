use std::io;

use thiserror::Error;

/// Problems on the serial link itself.
#[derive(Debug, Error)]
pub enum LinkError {
    /// IO related errors.
    #[error("Underlying IO problem: {0}")]
    IO(#[from] io::Error),
}
