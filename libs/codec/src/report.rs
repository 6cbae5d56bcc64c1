//! Flat decode report for lookup screens and the HTTP API.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::detect::{DecodeError, Decoded};
use crate::fields::Components;
use crate::{CodeKind, FormatVersion};

/// Where a lookup took its format version from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    /// Supplied by the caller.
    Explicit,
    /// The persisted tag for this code.
    Stored,
    /// Shape detection.
    Detected,
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VersionSource::Explicit => "explicit",
            VersionSource::Stored => "stored",
            VersionSource::Detected => "detected",
        })
    }
}

/// Result of decoding one input, valid or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeReport {
    pub serial_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<FormatVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CodeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_date: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<FormatVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<VersionSource>,
}

impl DecodeReport {
    pub fn decoded(decoded: Decoded, source: VersionSource) -> Self {
        Self {
            formatted: Some(decoded.formatted()),
            valid: true,
            version: Some(decoded.version),
            kind: Some(decoded.kind()),
            lot_code: decoded.lot_code(),
            production_date: Some(decoded.production_datetime()),
            serial_number: decoded.code,
            components: Some(decoded.components),
            error: None,
            candidates: Vec::new(),
            source: Some(source),
        }
    }

    /// A `valid: false` report. Ambiguous inputs keep their candidate list.
    pub fn failed(code: &str, err: &DecodeError) -> Self {
        let candidates = match err {
            DecodeError::Ambiguous { candidates, .. } => candidates.clone(),
            _ => Vec::new(),
        };
        Self {
            serial_number: code.to_string(),
            formatted: None,
            valid: false,
            version: None,
            kind: None,
            lot_code: None,
            components: None,
            production_date: None,
            error: Some(err.to_string()),
            candidates,
            source: None,
        }
    }
}
