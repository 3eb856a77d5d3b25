use lnroute_core::ChannelId;

/// Failures talking to the Lightning node.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("node returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode node response: {0}")]
    Decode(String),

    #[error("channel {0} not found on node")]
    ChannelNotFound(ChannelId),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

/// Graph cache and sync errors.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("node unavailable: {0}")]
    ClientUnavailable(#[from] ClientError),

    #[error("graph update stream terminated after {attempts} failed attempts: {reason}")]
    StreamTerminated { attempts: u32, reason: String },

    #[error("graph sync task failed: {0}")]
    TaskFailed(String),
}
