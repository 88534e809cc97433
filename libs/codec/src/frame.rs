//! Length-prefix framing for header and body segments
//!
//! Every segment is sent as a 4-byte big-endian length followed by that many
//! bytes. Formats only ever see complete segments.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Default upper bound on a single segment (100MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 100 * 1024 * 1024;

/// Size of the length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Read one complete segment
///
/// End of stream, even in the middle of a segment, is reported as
/// [`Error::ConnectionClosed`].
pub async fn read_frame<R>(reader: &mut R, max_frame_size: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let len = reader.read_u32().await.map_err(eof_to_closed)? as usize;

    if len > max_frame_size {
        return Err(Error::InvalidFrame(format!(
            "Frame too large: {} bytes (max {})",
            len, max_frame_size
        )));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await.map_err(eof_to_closed)?;
    Ok(buf)
}

/// Write one segment without flushing
pub async fn write_frame<W>(writer: &mut W, bytes: &[u8], max_frame_size: usize) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    check_frame_size(bytes.len(), max_frame_size)?;
    writer.write_u32(bytes.len() as u32).await?;
    writer.write_all(bytes).await?;
    Ok(())
}

/// Reject segments the peer would refuse to read
pub fn check_frame_size(len: usize, max_frame_size: usize) -> Result<()> {
    if len > max_frame_size || len > u32::MAX as usize {
        return Err(Error::InvalidFrame(format!(
            "Frame too large: {} bytes (max {})",
            len, max_frame_size
        )));
    }
    Ok(())
}

fn eof_to_closed(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::ConnectionClosed
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_preserve_boundaries() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"first", DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        write_frame(&mut wire, b"", DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        write_frame(&mut wire, b"third", DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();

        assert_eq!(wire.len(), 3 * LENGTH_PREFIX_SIZE + 10);

        let mut reader = wire.as_slice();
        assert_eq!(read_frame(&mut reader, DEFAULT_MAX_FRAME_SIZE).await.unwrap(), b"first");
        assert_eq!(read_frame(&mut reader, DEFAULT_MAX_FRAME_SIZE).await.unwrap(), b"");
        assert_eq!(read_frame(&mut reader, DEFAULT_MAX_FRAME_SIZE).await.unwrap(), b"third");
    }

    #[tokio::test]
    async fn empty_stream_is_closed() {
        let mut reader: &[u8] = &[];
        let err = read_frame(&mut reader, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn truncated_payload_is_closed() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"truncated", DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        wire.truncate(wire.len() - 3);

        let mut reader = wire.as_slice();
        let err = read_frame(&mut reader, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn oversized_frame_rejected_on_read() {
        let wire = (200u32 * 1024 * 1024).to_be_bytes();
        let mut reader = &wire[..];
        match read_frame(&mut reader, DEFAULT_MAX_FRAME_SIZE).await {
            Err(Error::InvalidFrame(msg)) => assert!(msg.contains("too large")),
            other => panic!("Expected InvalidFrame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn oversized_frame_rejected_before_write() {
        let mut wire = Vec::new();
        let err = write_frame(&mut wire, b"oversized", 4).await.unwrap_err();
        assert!(matches!(err, Error::InvalidFrame(_)));
        assert!(wire.is_empty());
    }
}
