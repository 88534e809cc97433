use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

use crate::codec::{AnyCodec, CodecType};
use crate::error::{Error, Result};
use crate::handshake::{client_handshake, server_handshake, with_timeout};
use crate::registry::CodecRegistry;
use crate::transport::Listener;

/// Opens TCP connections and negotiates a codec on them
pub struct TcpDialer {
    address: Option<SocketAddr>,
    codec_type: CodecType,
    connect_timeout: Option<Duration>,
    handshake_timeout: Option<Duration>,
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self {
            address: None,
            codec_type: CodecType::BINCODE,
            connect_timeout: None,
            handshake_timeout: None,
        }
    }
}

impl TcpDialer {
    /// Create a new dialer that asks for the bincode codec
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address to connect to
    pub fn address(mut self, addr: SocketAddr) -> Self {
        self.address = Some(addr);
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
        let addr = self
            .address
            .ok_or_else(|| Error::Custom("Address not set".to_string()))?;

        // Fail before dialing when the codec cannot be built
        if !registry.contains(self.codec_type.as_str()) {
            return Err(Error::UnsupportedCodec(self.codec_type.to_string()));
        }

        let stream = with_timeout(self.connect_timeout, "Connect", async {
            Ok::<_, Error>(TcpStream::connect(addr).await?)
        })
        .await?;
        stream.set_nodelay(true)?;
        debug!(%addr, codec = %self.codec_type, "connected");

        client_handshake(
            Box::new(stream),
            registry,
            &self.codec_type,
            self.handshake_timeout,
        )
        .await
    }
}

/// Connect to `addr` with the given codec and no timeouts
pub async fn connect_tcp(
    addr: SocketAddr,
    registry: &CodecRegistry,
    codec_type: CodecType,
) -> Result<AnyCodec> {
    TcpDialer::new()
        .address(addr)
        .codec_type(codec_type)
        .connect(registry)
        .await
}

/// TCP listener that hands out negotiated codecs
pub struct TcpCodecListener {
    listener: TcpListener,
    handshake_timeout: Option<Duration>,
}

impl TcpCodecListener {
    /// Bind to a local address
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            handshake_timeout: None,
        })
    }

    /// Bound how long a peer may take to send its preamble
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Accept a connection and negotiate its codec
    pub async fn accept(&self, registry: &CodecRegistry) -> Result<(AnyCodec, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        debug!(%addr, "accepted connection");
        let codec = server_handshake(Box::new(stream), registry, self.handshake_timeout).await?;
        Ok((codec, addr))
    }

    /// Get the local address this listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Into::into)
    }
}

#[async_trait::async_trait]
impl Listener for TcpCodecListener {
    async fn accept(&self, registry: &CodecRegistry) -> Result<AnyCodec> {
        let (codec, _) = TcpCodecListener::accept(self, registry).await?;
        Ok(codec)
    }

    async fn close(&mut self) -> Result<()> {
        // Tokio's TcpListener is released on drop
        Ok(())
    }
}
