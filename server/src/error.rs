//! Internal server failures: config loading and listener bind. Ack-level
//! protocol failures use [`protocol::ErrorCode`] directly; this enum is for
//! failures that never reach a client.

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
}

#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },
    #[error("server loop exited unexpectedly: {source}")]
    Serve { source: std::io::Error },
}
