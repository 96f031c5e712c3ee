//! Error types for the agent server.

use thiserror::Error;

/// Errors that can occur while running an agent server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
