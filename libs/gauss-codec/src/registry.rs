use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::builtin::BuiltinCodec;
use crate::enums::{Enum, EnumCodec};
use crate::error::{BuildError, DecodeError, EncodeError};
use crate::value::Value;
use crate::wire::WireType;

/// Codec for one scalar wire type: `&[u8]` ↔ `Value`.
///
/// Codecs are shared between every field that uses the type and must not
/// keep mutable state.
pub trait ScalarCodec: Send + Sync {
    /// Registry key, e.g. `int8` or the name of a user enum.
    fn type_name(&self) -> &str;

    /// Wire type OID for parameters. `0` lets the server infer it.
    fn oid(&self) -> u32 {
        0
    }

    /// OID of the array type over this type. `0` if unknown.
    fn array_oid(&self) -> u32 {
        0
    }

    fn decode(&self, raw: &[u8]) -> Result<Value, DecodeError>;

    fn encode(&self, value: &Value, out: &mut Vec<u8>) -> Result<(), EncodeError>;
}

/// Scalar codecs by type name.
///
/// Built once at startup and then only read; clones share the codecs.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn ScalarCodec>>,
}

impl CodecRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a codec for every `WireType`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for wire in WireType::ALL {
            registry.register(Arc::new(BuiltinCodec::new(wire)));
        }
        registry
    }

    /// Register `codec` under its own type name. Returns the codec it replaced.
    pub fn register(&mut self, codec: Arc<dyn ScalarCodec>) -> Option<Arc<dyn ScalarCodec>> {
        let name = codec.type_name().to_string();
        self.register_as(name, codec)
    }

    /// Register `codec` under an explicit name, e.g. `varchar` for `text`.
    pub fn register_as(
        &mut self,
        name: impl Into<String>,
        codec: Arc<dyn ScalarCodec>,
    ) -> Option<Arc<dyn ScalarCodec>> {
        let name = name.into();
        let previous = self.codecs.insert(name.clone(), codec);
        if previous.is_some() {
            tracing::warn!(type_name = %name, "scalar codec replaced");
        }
        previous
    }

    /// Make `alias` resolve to the codec registered as `target`.
    pub fn alias(&mut self, alias: impl Into<String>, target: &str) -> Result<(), BuildError> {
        let codec = self.resolve(target)?;
        self.register_as(alias, codec);
        Ok(())
    }

    /// Build and register the label codec of a derived enum.
    pub fn register_enum<E: Enum>(&mut self) -> Result<(), BuildError> {
        let codec = EnumCodec::of::<E>()?;
        self.register(Arc::new(codec));
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ScalarCodec>, BuildError> {
        self.codecs
            .get(name)
            .cloned()
            .ok_or_else(|| BuildError::Unregistered(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}
