use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{BincodeFormat, BoxConnection, Codec, CodecType, JsonFormat, StreamCodec};
use crate::config::CodecConfig;
use crate::error::Result;
use crate::header::Header;

/// One of the built-in codecs, chosen at runtime
///
/// This is what a [`CodecRegistry`](crate::registry::CodecRegistry) hands
/// out. Dispatch is a `match`, so bodies stay generic.
pub enum AnyCodec {
    Bincode(StreamCodec<BoxConnection, BincodeFormat>),
    Json(StreamCodec<BoxConnection, JsonFormat>),
}

impl AnyCodec {
    /// Bincode codec over a connection
    pub fn bincode(conn: BoxConnection, config: &CodecConfig) -> Self {
        Self::Bincode(StreamCodec::with_config(conn, BincodeFormat, *config))
    }

    /// JSON codec over a connection
    pub fn json(conn: BoxConnection, config: &CodecConfig) -> Self {
        Self::Json(StreamCodec::with_config(conn, JsonFormat, *config))
    }

    pub fn codec_type(&self) -> CodecType {
        match self {
            Self::Bincode(codec) => codec.codec_type(),
            Self::Json(codec) => codec.codec_type(),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Self::Bincode(codec) => codec.is_closed(),
            Self::Json(codec) => codec.is_closed(),
        }
    }
}

#[async_trait::async_trait]
impl Codec for AnyCodec {
    async fn read_header(&self) -> Result<Header> {
        match self {
            Self::Bincode(codec) => codec.read_header().await,
            Self::Json(codec) => codec.read_header().await,
        }
    }

    async fn read_body<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        match self {
            Self::Bincode(codec) => codec.read_body().await,
            Self::Json(codec) => codec.read_body().await,
        }
    }

    async fn skip_body(&self) -> Result<()> {
        match self {
            Self::Bincode(codec) => codec.skip_body().await,
            Self::Json(codec) => codec.skip_body().await,
        }
    }

    async fn write<T>(&self, header: &Header, body: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        match self {
            Self::Bincode(codec) => codec.write(header, body).await,
            Self::Json(codec) => codec.write(header, body).await,
        }
    }

    async fn close(&self) -> Result<()> {
        match self {
            Self::Bincode(codec) => codec.close().await,
            Self::Json(codec) => codec.close().await,
        }
    }
}
