use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Incoming data is malformed or does not match the requested type
    #[error("Decode error: {0}")]
    Decode(String),

    /// A value could not be represented by the codec's format
    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Connection closed")]
    ConnectionClosed,

    /// No constructor registered for the negotiated codec type
    #[error("Unsupported codec type: {0}")]
    UnsupportedCodec(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Header and body reads were issued out of order
    #[error("Out of sequence: {0}")]
    OutOfSequence(&'static str),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("{0} timeout exceeded")]
    Timeout(&'static str),

    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
