/// Errors produced while parsing identifiers or doing unit arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("invalid channel id: {0}")]
    InvalidChannelId(String),

    #[error("invalid node public key: {0}")]
    InvalidNodeId(String),

    #[error("amount overflow: {0}")]
    AmountOverflow(String),
}
