use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::enums::EnumCodec;
use crate::error::BuildError;
use crate::record::RecordCodec;
use crate::registry::CodecRegistry;
use crate::shape::{EnumShape, RecordShape, SemanticType};

/// Record and enum layouts declared in TOML.
///
/// ```toml
/// [[enum]]
/// name = "mood"
/// labels = ["sad", "ok", "happy"]
///
/// [[record]]
/// name = "person"
/// fields = [
///     { name = "id", type = "int8" },
///     { name = "mood", type = "mood?" },
///     { name = "tags", type = "text[]" },
/// ]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    #[serde(default, rename = "enum")]
    pub enums: Vec<EnumConfig>,

    #[serde(default, rename = "record")]
    pub records: Vec<RecordConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumConfig {
    pub name: String,
    pub labels: Vec<String>,
    /// Constructor names; defaults to the labels.
    #[serde(default)]
    pub constructors: Option<Vec<String>>,
    /// Server OIDs of the enum type and its array type; 0 lets the
    /// server infer them.
    #[serde(default)]
    pub oid: u32,
    #[serde(default)]
    pub array_oid: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordConfig {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SemanticType,
}

impl SchemaConfig {
    /// Load a schema from a TOML file.
    pub fn load(path: &str) -> Result<Self, BuildError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| BuildError::Config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse a schema from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, BuildError> {
        toml::from_str(toml_str).map_err(|e| BuildError::Config(e.to_string()))
    }

    /// Register every enum in `registry`, then derive every record.
    ///
    /// Enums are registered first so records may refer to them.
    pub fn build(&self, registry: &mut CodecRegistry) -> Result<Catalog, BuildError> {
        for config in &self.enums {
            let constructors = config.constructors.as_ref().unwrap_or(&config.labels);
            let shape = EnumShape::new(config.name.clone(), constructors.iter().cloned());
            let codec = EnumCodec::derive(config.labels.iter().cloned(), &shape)?
                .with_oids(config.oid, config.array_oid);
            registry.register(Arc::new(codec));
        }

        let mut records = BTreeMap::new();
        for config in &self.records {
            let mut shape = RecordShape::new(config.name.clone());
            for field in &config.fields {
                shape.push(field.name.clone(), field.ty.clone());
            }
            shape.check_unique()?;

            let codec = RecordCodec::derive(registry, &shape)?;
            if records.insert(config.name.clone(), codec).is_some() {
                return Err(BuildError::Config(format!(
                    "record '{}' declared twice",
                    config.name
                )));
            }
        }

        tracing::debug!(
            enums = self.enums.len(),
            records = records.len(),
            "schema catalog built"
        );
        Ok(Catalog { records })
    }
}

/// Record codecs built from a [`SchemaConfig`], by record name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: BTreeMap<String, RecordCodec>,
}

impl Catalog {
    pub fn get(&self, name: &str) -> Option<&RecordCodec> {
        self.records.get(name)
    }

    /// Record names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
