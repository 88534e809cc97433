use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::{UnixListener, UnixStream};
use tracing::debug;

use crate::codec::{AnyCodec, CodecType};
use crate::error::{Error, Result};
use crate::handshake::{client_handshake, server_handshake, with_timeout};
use crate::registry::CodecRegistry;
use crate::transport::Listener;

/// Opens Unix socket connections and negotiates a codec on them
pub struct UnixDialer {
    path: Option<PathBuf>,
    codec_type: CodecType,
    connect_timeout: Option<Duration>,
    handshake_timeout: Option<Duration>,
}

impl Default for UnixDialer {
    fn default() -> Self {
        Self {
            path: None,
            codec_type: CodecType::BINCODE,
            connect_timeout: None,
            handshake_timeout: None,
        }
    }
}

impl UnixDialer {
    /// Create a new dialer that asks for the bincode codec
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the path to connect to
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the codec to announce
    pub fn codec_type(mut self, codec_type: CodecType) -> Self {
        self.codec_type = codec_type;
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the preamble timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Connect and send the preamble
    pub async fn connect(self, registry: &CodecRegistry) -> Result<AnyCodec> {
        let path = self
            .path
            .ok_or_else(|| Error::Custom("Path not set".to_string()))?;

        if !registry.contains(self.codec_type.as_str()) {
            return Err(Error::UnsupportedCodec(self.codec_type.to_string()));
        }

        let stream = with_timeout(self.connect_timeout, "Connect", async {
            Ok::<_, Error>(UnixStream::connect(&path).await?)
        })
        .await?;
        debug!(path = %path.display(), codec = %self.codec_type, "connected");

        client_handshake(
            Box::new(stream),
            registry,
            &self.codec_type,
            self.handshake_timeout,
        )
        .await
    }
}

/// Connect to the socket at `path` with the given codec and no timeouts
pub async fn connect_unix(
    path: impl AsRef<Path>,
    registry: &CodecRegistry,
    codec_type: CodecType,
) -> Result<AnyCodec> {
    UnixDialer::new()
        .path(path)
        .codec_type(codec_type)
        .connect(registry)
        .await
}

/// Unix socket listener that hands out negotiated codecs
pub struct UnixCodecListener {
    listener: UnixListener,
    path: PathBuf,
    handshake_timeout: Option<Duration>,
}

impl UnixCodecListener {
    /// Bind to a Unix socket path
    pub async fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Remove a stale socket file left by an earlier run
        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        let listener = UnixListener::bind(&path)?;
        Ok(Self {
            listener,
            path,
            handshake_timeout: None,
        })
    }

    /// Bound how long a peer may take to send its preamble
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Accept a connection and negotiate its codec
    pub async fn accept(&self, registry: &CodecRegistry) -> Result<AnyCodec> {
        let (stream, _) = self.listener.accept().await?;
        debug!(path = %self.path.display(), "accepted connection");
        server_handshake(Box::new(stream), registry, self.handshake_timeout).await
    }

    /// Get the path this listener is bound to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the listener and remove the socket file
    pub async fn close(&mut self) -> Result<()> {
        std::fs::remove_file(&self.path)?;
        Ok(())
    }
}

impl Drop for UnixCodecListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[async_trait::async_trait]
impl Listener for UnixCodecListener {
    async fn accept(&self, registry: &CodecRegistry) -> Result<AnyCodec> {
        UnixCodecListener::accept(self, registry).await
    }

    async fn close(&mut self) -> Result<()> {
        UnixCodecListener::close(self).await
    }
}
