use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::codec::{AnyCodec, BoxConnection, CodecType};
use crate::config::CodecConfig;
use crate::error::{Error, Result};

/// Constructor stored in the registry
pub type NewCodecFn = fn(BoxConnection, &CodecConfig) -> AnyCodec;

/// Maps codec type names to constructors
///
/// Built once at startup and passed by reference to whatever negotiates
/// codecs. Unknown names are always an error; there is no fallback codec,
/// since two peers that disagree on the encoding would desynchronize.
#[derive(Clone)]
pub struct CodecRegistry {
    constructors: HashMap<CodecType, NewCodecFn>,
    config: CodecConfig,
}

impl CodecRegistry {
    /// Empty registry with the default codec configuration
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    /// Empty registry whose codecs are built with `config`
    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            constructors: HashMap::new(),
            config,
        }
    }

    /// Registry holding the built-in bincode and JSON codecs
    pub fn with_builtin(config: CodecConfig) -> Self {
        let mut registry = Self::with_config(config);
        registry.register(CodecType::BINCODE, AnyCodec::bincode);
        registry.register(CodecType::JSON, AnyCodec::json);
        registry
    }

    /// Insert or replace a constructor, returning the one it replaced
    pub fn register(
        &mut self,
        codec_type: impl Into<CodecType>,
        constructor: NewCodecFn,
    ) -> Option<NewCodecFn> {
        let codec_type = codec_type.into();
        debug!(codec = %codec_type, "registering codec");
        self.constructors.insert(codec_type, constructor)
    }

    /// Constructor registered under `codec_type`
    pub fn lookup(&self, codec_type: &str) -> Option<NewCodecFn> {
        self.constructors.get(codec_type).copied()
    }

    pub fn contains(&self, codec_type: &str) -> bool {
        self.constructors.contains_key(codec_type)
    }

    /// Registered codec types, in no particular order
    pub fn codec_types(&self) -> impl Iterator<Item = &CodecType> {
        self.constructors.keys()
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Build a codec of the given type over `conn`
    ///
    /// Fails with [`Error::UnsupportedCodec`] before touching the connection
    /// when the type is unknown.
    pub fn new_codec(&self, codec_type: &str, conn: BoxConnection) -> Result<AnyCodec> {
        let constructor = self
            .lookup(codec_type)
            .ok_or_else(|| Error::UnsupportedCodec(codec_type.to_string()))?;
        Ok(constructor(conn, &self.config))
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("codec_types", &self.constructors.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_builtin(CodecConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed_pipe() -> BoxConnection {
        let (conn, _peer) = tokio::io::duplex(64);
        Box::new(conn)
    }

    #[test]
    fn new_registry_is_empty() {
        let registry = CodecRegistry::new();
        assert_eq!(registry.codec_types().count(), 0);
        assert!(registry.lookup(CodecType::BINCODE.as_str()).is_none());
    }

    #[test]
    fn default_holds_builtin_codecs() {
        let registry = CodecRegistry::default();
        assert!(registry.contains("application/bincode"));
        assert!(registry.contains("application/json"));
        assert_eq!(registry.codec_types().count(), 2);
    }

    #[tokio::test]
    async fn lookup_returns_registered_constructor() {
        let mut registry = CodecRegistry::new();
        registry.register("X", AnyCodec::json);

        let constructor = registry.lookup("X").expect("registered");
        let codec = constructor(boxed_pipe(), registry.config());
        assert_eq!(codec.codec_type(), CodecType::JSON);
    }

    #[test]
    fn lookup_of_unknown_type_is_none() {
        let registry = CodecRegistry::default();
        assert!(registry.lookup("application/gob").is_none());
        assert!(!registry.contains("application/gob"));
    }

    #[tokio::test]
    async fn register_overwrites_and_returns_previous() {
        let mut registry = CodecRegistry::new();
        assert!(registry.register("X", AnyCodec::bincode).is_none());

        let previous = registry.register("X", AnyCodec::json).expect("replaced");
        assert_eq!(
            previous(boxed_pipe(), registry.config()).codec_type(),
            CodecType::BINCODE
        );

        let codec = registry.new_codec("X", boxed_pipe()).unwrap();
        assert_eq!(codec.codec_type(), CodecType::JSON);
    }

    #[tokio::test]
    async fn new_codec_rejects_unknown_type() {
        let registry = CodecRegistry::default();
        match registry.new_codec("application/gob", boxed_pipe()) {
            Err(Error::UnsupportedCodec(name)) => assert_eq!(name, "application/gob"),
            Err(e) => panic!("Expected UnsupportedCodec, got {:?}", e),
            Ok(_) => panic!("Expected UnsupportedCodec"),
        }
    }

    #[tokio::test]
    async fn codecs_inherit_registry_config() {
        let config = CodecConfig::new().max_frame_size(1024);
        let registry = CodecRegistry::with_builtin(config);

        match registry.new_codec("application/bincode", boxed_pipe()).unwrap() {
            AnyCodec::Bincode(codec) => assert_eq!(codec.config().max_frame_size, 1024),
            AnyCodec::Json(_) => panic!("Expected bincode codec"),
        }
    }
}
