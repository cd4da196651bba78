use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AtonError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum AtonError {
    /// The listening socket could not be opened. Fatal to the `open_connection` call.
    #[error("Could not connect to port: {port}")]
    Connect {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("malformed packet: {reason}")]
    MalformedPacket { reason: String },

    /// The stream ended inside a packet.
    #[error("truncated packet while reading {context} ({expected} bytes expected)")]
    TruncatedPacket { context: &'static str, expected: usize },

    #[error("socket error: {0}")]
    Socket(#[from] io::Error),

    /// A packet that is well formed but does not fit the session state.
    #[error("state error: {reason}")]
    State { reason: String },

    #[error("config error in {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl AtonError {
    pub fn connect(port: u16, source: io::Error) -> Self {
        AtonError::Connect { port, source }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        AtonError::MalformedPacket {
            reason: reason.into(),
        }
    }

    pub fn truncated(context: &'static str, expected: usize) -> Self {
        AtonError::TruncatedPacket { context, expected }
    }

    pub fn state(reason: impl Into<String>) -> Self {
        AtonError::State {
            reason: reason.into(),
        }
    }

    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AtonError::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Errors that end the current streaming pass but leave the session alive.
    pub fn ends_pass(&self) -> bool {
        match self {
            AtonError::MalformedPacket { .. } => true,
            AtonError::TruncatedPacket { .. } => true,
            AtonError::Socket(_) => true,
            AtonError::State { .. } => false,
            AtonError::Connect { .. } => false,
            AtonError::Config { .. } => false,
        }
    }
}
