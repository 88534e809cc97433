//! Connection preamble used to agree on a codec
//!
//! The dialing side opens every connection with a single JSON frame naming
//! the codec it wants. Everything after that frame belongs to the codec.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::codec::{AnyCodec, BoxConnection, CodecType};
use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::registry::CodecRegistry;

/// Marks a connection as speaking this protocol
pub const MAGIC_NUMBER: u32 = 0x3bef5c;

/// Largest preamble the accepting side will read
pub const MAX_PREAMBLE_SIZE: usize = 4 * 1024;

/// First frame on every connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preamble {
    pub magic: u32,
    pub codec_type: CodecType,
}

impl Preamble {
    pub fn new(codec_type: CodecType) -> Self {
        Self {
            magic: MAGIC_NUMBER,
            codec_type,
        }
    }
}

/// Announce `codec_type` and build the matching codec
///
/// The type is resolved before anything is written, so an unsupported type
/// leaves the connection untouched.
pub async fn client_handshake(
    mut conn: BoxConnection,
    registry: &CodecRegistry,
    codec_type: &CodecType,
    timeout: Option<Duration>,
) -> Result<AnyCodec> {
    let constructor = registry
        .lookup(codec_type.as_str())
        .ok_or_else(|| Error::UnsupportedCodec(codec_type.to_string()))?;

    let preamble = serde_json::to_vec(&Preamble::new(codec_type.clone()))
        .map_err(|e| Error::Encode(e.to_string()))?;

    with_timeout(timeout, "Handshake", async {
        write_frame(&mut conn, &preamble, MAX_PREAMBLE_SIZE).await?;
        conn.flush().await?;
        Ok::<(), Error>(())
    })
    .await?;

    debug!(codec = %codec_type, "sent preamble");
    Ok(constructor(conn, registry.config()))
}

/// Read the peer's preamble and build the codec it asked for
pub async fn server_handshake(
    mut conn: BoxConnection,
    registry: &CodecRegistry,
    timeout: Option<Duration>,
) -> Result<AnyCodec> {
    let bytes =
        with_timeout(timeout, "Handshake", read_frame(&mut conn, MAX_PREAMBLE_SIZE)).await?;
    let preamble: Preamble = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Handshake(format!("invalid preamble: {}", e)))?;

    if preamble.magic != MAGIC_NUMBER {
        warn!(magic = preamble.magic, "rejecting connection with invalid magic number");
        return Err(Error::Handshake(format!(
            "invalid magic number {:#x}",
            preamble.magic
        )));
    }

    let codec = registry.new_codec(preamble.codec_type.as_str(), conn).map_err(|err| {
        warn!(codec = %preamble.codec_type, "rejecting connection with unsupported codec");
        err
    })?;
    debug!(codec = %preamble.codec_type, "accepted preamble");
    Ok(codec)
}

/// Run `op`, failing with [`Error::Timeout`] once `timeout` elapses
pub(crate) async fn with_timeout<T>(
    timeout: Option<Duration>,
    what: &'static str,
    op: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, op)
            .await
            .map_err(|_| Error::Timeout(what))?,
        None => op.await,
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{duplex, AsyncReadExt};

    use super::*;
    use crate::codec::Codec;
    use crate::header::Header;

    #[tokio::test]
    async fn handshake_selects_requested_codec() {
        let registry = CodecRegistry::default();
        let (client, server) = duplex(1024);

        let (client, server) = tokio::join!(
            client_handshake(Box::new(client), &registry, &CodecType::JSON, None),
            server_handshake(Box::new(server), &registry, None),
        );
        let (client, server) = (client.unwrap(), server.unwrap());
        assert_eq!(client.codec_type(), CodecType::JSON);
        assert_eq!(server.codec_type(), CodecType::JSON);

        client
            .write(&Header::request("Echo.Say", 1), "hi")
            .await
            .unwrap();
        let header = server.read_header().await.unwrap();
        let body: String = server.read_body().await.unwrap();
        assert_eq!(header.service_method, "Echo.Say");
        assert_eq!(body, "hi");
    }

    #[tokio::test]
    async fn client_rejects_unknown_type_without_writing() {
        let registry = CodecRegistry::default();
        let (client, mut server) = duplex(1024);

        let result = client_handshake(
            Box::new(client),
            &registry,
            &CodecType::new("application/gob"),
            None,
        )
        .await;
        assert!(matches!(result, Err(Error::UnsupportedCodec(_))));

        // The client connection was dropped without a single byte
        let mut rest = Vec::new();
        server.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn server_rejects_bad_magic() {
        let registry = CodecRegistry::default();
        let (mut client, server) = duplex(1024);

        let preamble = Preamble {
            magic: 0xdead,
            codec_type: CodecType::BINCODE,
        };
        let bytes = serde_json::to_vec(&preamble).unwrap();
        write_frame(&mut client, &bytes, MAX_PREAMBLE_SIZE)
            .await
            .unwrap();

        match server_handshake(Box::new(server), &registry, None).await {
            Err(Error::Handshake(msg)) => assert!(msg.contains("magic")),
            Err(e) => panic!("Expected Handshake error, got {:?}", e),
            Ok(_) => panic!("Expected Handshake error"),
        }
    }

    #[tokio::test]
    async fn server_rejects_unregistered_type() {
        let mut registry = CodecRegistry::new();
        registry.register(CodecType::BINCODE, AnyCodec::bincode);
        let (mut client, server) = duplex(1024);

        let bytes = serde_json::to_vec(&Preamble::new(CodecType::JSON)).unwrap();
        write_frame(&mut client, &bytes, MAX_PREAMBLE_SIZE)
            .await
            .unwrap();

        match server_handshake(Box::new(server), &registry, None).await {
            Err(Error::UnsupportedCodec(name)) => assert_eq!(name, "application/json"),
            Err(e) => panic!("Expected UnsupportedCodec, got {:?}", e),
            Ok(_) => panic!("Expected UnsupportedCodec"),
        }
    }

    #[tokio::test]
    async fn server_rejects_garbage_preamble() {
        let registry = CodecRegistry::default();
        let (mut client, server) = duplex(1024);

        write_frame(&mut client, b"not json", MAX_PREAMBLE_SIZE)
            .await
            .unwrap();

        let result = server_handshake(Box::new(server), &registry, None).await;
        assert!(matches!(result, Err(Error::Handshake(_))));
    }

    #[tokio::test]
    async fn server_handshake_times_out() {
        let registry = CodecRegistry::default();
        let (_client, server) = duplex(1024);

        let result = server_handshake(
            Box::new(server),
            &registry,
            Some(Duration::from_millis(50)),
        )
        .await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}
