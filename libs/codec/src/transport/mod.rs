use crate::codec::AnyCodec;
use crate::error::Result;
use crate::registry::CodecRegistry;

pub mod tcp;
#[cfg(unix)]
pub mod unix;

pub use self::tcp::{connect_tcp, TcpCodecListener, TcpDialer};
#[cfg(unix)]
pub use self::unix::{connect_unix, UnixCodecListener, UnixDialer};

/// Accepts connections and negotiates a codec on each
///
/// The codec type is picked by the connecting peer's preamble and must be
/// registered in `registry`.
#[async_trait::async_trait]
pub trait Listener: Send + Sync {
    /// Wait for the next peer and build its codec
    async fn accept(&self, registry: &CodecRegistry) -> Result<AnyCodec>;

    /// Stop listening
    async fn close(&mut self) -> Result<()>;
}
