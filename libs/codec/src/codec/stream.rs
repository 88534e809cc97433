use std::sync::atomic::{AtomicU8, Ordering};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncWriteExt, BufWriter, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::codec::{Codec, CodecType, Connection, Format};
use crate::config::CodecConfig;
use crate::error::{Error, Result};
use crate::frame::{check_frame_size, read_frame, write_frame};
use crate::header::Header;

const OPEN: u8 = 0;
/// Closed by the codec itself after a failed write
const ABORTED: u8 = 1;
/// Closed by the owner
const CLOSED: u8 = 2;

struct ReadState<C> {
    half: ReadHalf<C>,
    body_pending: bool,
    /// Set once a segment read fails partway; framing is lost for good
    desynced: bool,
}

/// Buffered codec over one connection
///
/// The connection is split into independent read and write halves. Reads
/// decode length-prefixed segments straight from the read half; writes are
/// batched through a buffer that is flushed before `write` returns.
pub struct StreamCodec<C, F> {
    reader: Mutex<ReadState<C>>,
    writer: Mutex<BufWriter<WriteHalf<C>>>,
    format: F,
    config: CodecConfig,
    state: AtomicU8,
    shutdown: CancellationToken,
}

impl<C: Connection, F: Format> StreamCodec<C, F> {
    /// Wrap a connection with the default configuration
    pub fn new(conn: C, format: F) -> Self {
        Self::with_config(conn, format, CodecConfig::default())
    }

    /// Wrap a connection. No I/O happens until the first read or write.
    pub fn with_config(conn: C, format: F, config: CodecConfig) -> Self {
        let (read_half, write_half) = tokio::io::split(conn);
        Self {
            reader: Mutex::new(ReadState {
                half: read_half,
                body_pending: false,
                desynced: false,
            }),
            writer: Mutex::new(BufWriter::with_capacity(
                config.write_buffer_capacity,
                write_half,
            )),
            format,
            config,
            state: AtomicU8::new(OPEN),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn codec_type(&self) -> CodecType {
        self.format.codec_type()
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Whether the connection has been closed, by the owner or after a failed write
    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) != OPEN
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        Ok(())
    }

    /// Read the next segment, giving up as soon as the codec is closed
    ///
    /// A failed read may have consumed part of a segment, so every later
    /// read on this codec fails instead of parsing from the wrong offset.
    async fn read_segment(&self, reader: &mut ReadState<C>) -> Result<Vec<u8>> {
        if reader.desynced {
            return Err(Error::InvalidFrame(
                "stream desynchronized by an earlier read failure".to_string(),
            ));
        }
        let frame = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(Error::ConnectionClosed),
            frame = read_frame(&mut reader.half, self.config.max_frame_size) => frame,
        };
        if let Err(err) = &frame {
            debug!(codec = %self.codec_type(), error = %err, "segment read failed");
            reader.desynced = true;
        }
        frame
    }

    /// Read the body segment that follows the last header
    async fn take_body(&self) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let mut reader = self.reader.lock().await;
        if !reader.body_pending && !reader.desynced {
            return Err(Error::OutOfSequence("body read without a preceding header"));
        }
        let bytes = self.read_segment(&mut reader).await?;
        reader.body_pending = false;
        Ok(bytes)
    }

    /// Encode both segments before any byte reaches the buffer
    fn encode_message<T>(&self, header: &Header, body: &T) -> Result<(Vec<u8>, Vec<u8>)>
    where
        T: Serialize + ?Sized,
    {
        let header_bytes = self.encode_segment(header, "header", header.seq)?;
        let body_bytes = self.encode_segment(body, "body", header.seq)?;
        Ok((header_bytes, body_bytes))
    }

    fn encode_segment<T>(&self, value: &T, segment: &'static str, seq: u64) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        let encoded = self.format.encode(value).and_then(|bytes| {
            check_frame_size(bytes.len(), self.config.max_frame_size)?;
            Ok(bytes)
        });
        if let Err(err) = &encoded {
            warn!(codec = %self.codec_type(), seq, segment, error = %err, "error encoding message");
        }
        encoded
    }

    /// Close after a failed write
    async fn abort(&self, writer: &mut BufWriter<WriteHalf<C>>) {
        if self
            .state
            .compare_exchange(OPEN, ABORTED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.shutdown.cancel();
        if let Err(err) = writer.get_mut().shutdown().await {
            debug!(codec = %self.codec_type(), error = %err, "shutdown after failed write");
        }
        debug!(codec = %self.codec_type(), "connection closed after failed write");
    }
}

#[async_trait::async_trait]
impl<C: Connection, F: Format> Codec for StreamCodec<C, F> {
    async fn read_header(&self) -> Result<Header> {
        self.ensure_open()?;
        let mut reader = self.reader.lock().await;
        if reader.body_pending && !reader.desynced {
            return Err(Error::OutOfSequence("header read while a body is pending"));
        }
        let bytes = self.read_segment(&mut reader).await?;
        // The body segment follows whether or not the header decodes
        reader.body_pending = true;
        self.format.decode(&bytes)
    }

    async fn read_body<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let bytes = self.take_body().await?;
        self.format.decode(&bytes)
    }

    async fn skip_body(&self) -> Result<()> {
        self.take_body().await.map(|_| ())
    }

    async fn write<T>(&self, header: &Header, body: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.ensure_open()?;
        let mut writer = self.writer.lock().await;
        // Closed while waiting for the lock
        self.ensure_open()?;

        let result = match self.encode_message(header, body) {
            Ok((header_bytes, body_bytes)) => {
                let max = self.config.max_frame_size;
                let io = async {
                    write_frame(&mut *writer, &header_bytes, max).await?;
                    write_frame(&mut *writer, &body_bytes, max).await?;
                    Ok::<(), Error>(())
                };
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => Err(Error::ConnectionClosed),
                    written = io => written,
                }
            }
            Err(err) => Err(err),
        };

        // Flush on every exit path so nothing lingers in the buffer. A close
        // that lands first discards the buffer, so the write must not succeed.
        let flushed = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(Error::ConnectionClosed),
            flushed = writer.flush() => flushed.map_err(Error::from),
        };

        match result.and(flushed) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.abort(&mut writer).await;
                Err(err)
            }
        }
    }

    async fn close(&self) -> Result<()> {
        match self.state.swap(CLOSED, Ordering::AcqRel) {
            CLOSED => return Err(Error::ConnectionClosed),
            ABORTED => return Ok(()),
            _ => {}
        }
        self.shutdown.cancel();
        // Bytes still buffered belong to a write cut short by this close
        let mut writer = self.writer.lock().await;
        writer.get_mut().shutdown().await?;
        debug!(codec = %self.codec_type(), "codec closed");
        Ok(())
    }
}
