//! Courier Codec - Wire-format layer for RPC connections
//!
//! Reads and writes a call's [`Header`] and body over any duplex byte
//! stream, in a fixed header-then-body sequence, with the encoding picked
//! by name from a [`CodecRegistry`].
//!
//! # Example
//!
//! ```no_run
//! use courier_codec::{Codec, CodecRegistry, CodecType, Header};
//! use courier_codec::transport::{TcpCodecListener, TcpDialer};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Args { a: i32, b: i32 }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = CodecRegistry::default();
//!
//! // Server side: the peer's preamble picks the codec
//! let listener = TcpCodecListener::bind("127.0.0.1:0".parse()?).await?;
//! let addr = listener.local_addr()?;
//!
//! // Client side: announce a codec and send a request
//! let client = TcpDialer::new()
//!     .address(addr)
//!     .codec_type(CodecType::JSON)
//!     .connect(&registry)
//!     .await?;
//! client.write(&Header::request("Calc.Add", 1), &Args { a: 2, b: 3 }).await?;
//!
//! let (server, _peer) = listener.accept(&registry).await?;
//! let header = server.read_header().await?;
//! let args: Args = server.read_body().await?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod header;
pub mod registry;
pub mod transport;

// Re-exports for convenience
pub use codec::{AnyCodec, BoxConnection, Codec, CodecType, Connection, Format, StreamCodec};
pub use config::CodecConfig;
pub use error::{Error, Result};
pub use header::Header;
pub use registry::{CodecRegistry, NewCodecFn};
