//! Product model name to 3-character abbreviation lookup.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::fields::ModelCode;
use crate::CodecError;

/// Exact, case-sensitive table from model names to model codes.
///
/// Deserializes from a `[models]` table:
///
/// ```toml
/// [models]
/// PSA10 = "PSA"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ModelTable")]
pub struct ModelCodeMap {
    entries: BTreeMap<String, ModelCode>,
}

#[derive(Deserialize)]
struct ModelTable {
    #[serde(default)]
    models: BTreeMap<String, String>,
}

impl TryFrom<ModelTable> for ModelCodeMap {
    type Error = CodecError;

    fn try_from(table: ModelTable) -> Result<Self, Self::Error> {
        Self::from_entries(table.models)
    }
}

impl ModelCodeMap {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table, validating every abbreviation.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, CodecError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut map = Self::new();
        for (name, code) in entries {
            map.insert(name, code.as_ref())?;
        }
        Ok(map)
    }

    /// Adds or replaces an entry, returning the previous abbreviation.
    pub fn insert(
        &mut self,
        model_name: impl Into<String>,
        code: &str,
    ) -> Result<Option<ModelCode>, CodecError> {
        let code = ModelCode::parse(code)?;
        Ok(self.entries.insert(model_name.into(), code))
    }

    /// Looks up the abbreviation for a model name.
    ///
    /// Unknown names are an error; there is no fallback abbreviation.
    pub fn abbreviate(&self, model_name: &str) -> Result<ModelCode, CodecError> {
        self.entries
            .get(model_name)
            .cloned()
            .ok_or_else(|| CodecError::UnknownModel {
                name: model_name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelCode)> {
        self.entries.iter().map(|(name, code)| (name.as_str(), code))
    }
}
