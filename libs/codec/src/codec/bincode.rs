use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{CodecType, Format};
use crate::error::{Error, Result};

/// Bincode format for compact binary segments
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeFormat;

impl Format for BincodeFormat {
    fn codec_type(&self) -> CodecType {
        CodecType::BINCODE
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| Error::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}
