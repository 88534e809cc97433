use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{CodecType, Format};
use crate::error::{Error, Result};

/// JSON format, one document per segment
///
/// Larger than bincode on the wire but readable in a packet capture and
/// easy to speak from other languages.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn codec_type(&self) -> CodecType {
        CodecType::JSON
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}
