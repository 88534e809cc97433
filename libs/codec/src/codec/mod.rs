use std::borrow::{Borrow, Cow};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;
use crate::header::Header;

pub mod any;
pub mod bincode;
pub mod json;
pub mod stream;

pub use self::any::AnyCodec;
pub use self::bincode::BincodeFormat;
pub use self::json::JsonFormat;
pub use self::stream::StreamCodec;

/// Capability set every codec variant provides
///
/// Each message is one header followed by one body. A reader must call
/// [`read_header`](Codec::read_header) and then exactly one of
/// [`read_body`](Codec::read_body) or [`skip_body`](Codec::skip_body) before
/// the next header; anything else desynchronizes the stream.
///
/// Methods take `&self` so that one reader task and one writer task can share
/// a codec. Concurrent `write` calls are serialized internally.
#[async_trait::async_trait]
pub trait Codec: Send + Sync {
    /// Decode the next header
    async fn read_header(&self) -> Result<Header>;

    /// Decode the body paired with the last header
    ///
    /// Must be called even when the header carries an error, so the next
    /// header read stays aligned.
    async fn read_body<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Send;

    /// Consume the body paired with the last header without decoding it
    async fn skip_body(&self) -> Result<()>;

    /// Encode a header and body as one message and flush it
    ///
    /// On failure the codec closes its connection: a half-written message
    /// cannot be recovered.
    async fn write<T>(&self, header: &Header, body: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized;

    /// Shut the underlying connection down
    ///
    /// This is a write-side shutdown: the peer reads end of stream, and any
    /// read or write pending on this codec fails with
    /// [`Error::ConnectionClosed`](crate::Error::ConnectionClosed), as does
    /// every later operation. The connection itself is released when the
    /// codec is dropped, so bytes the peer keeps sending are accepted by the
    /// transport but never read. A second `close` fails, except that the
    /// first `close` after a failed write (which already shut the
    /// connection down) succeeds as a no-op.
    async fn close(&self) -> Result<()>;
}

/// Serialization scheme for individual header and body segments
pub trait Format: Send + Sync + 'static {
    /// Registry key this format is announced under
    fn codec_type(&self) -> CodecType;

    /// Encode a value into bytes
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode bytes into a value
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// Any duplex byte stream a codec can own
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Connection for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Type-erased connection, as handed to registry constructors
pub type BoxConnection = Box<dyn Connection>;

/// Name of an encoding, used as the registry key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodecType(Cow<'static, str>);

impl CodecType {
    pub const BINCODE: CodecType = CodecType(Cow::Borrowed("application/bincode"));
    pub const JSON: CodecType = CodecType(Cow::Borrowed("application/json"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CodecType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for CodecType {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for CodecType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}
