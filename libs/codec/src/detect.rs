//! Format detection and version-aware decoding.
//!
//! Codes carry no version marker, so an untagged code is matched against
//! every grammar in [`FormatVersion::ALL`] order. A stored version tag, when
//! one exists, always wins over detection.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::fields::{Components, Fields};
use crate::{CodeKind, CodecError, FormatVersion};

/// Errors from decoding a code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No grammar accepts the shape of the code.
    #[error("'{code}' does not match any known code format")]
    Unrecognized { code: String },

    /// The selected grammar rejected the code.
    #[error(transparent)]
    InvalidFormat(#[from] CodecError),

    /// Several grammars decode the code to different fields.
    #[error("'{code}' decodes differently under {}", join_versions(.candidates))]
    Ambiguous {
        code: String,
        candidates: Vec<FormatVersion>,
    },
}

impl DecodeError {
    /// True for both unrecognized shapes and out-of-range fields.
    pub fn is_invalid_format(&self) -> bool {
        matches!(
            self,
            DecodeError::Unrecognized { .. } | DecodeError::InvalidFormat(_)
        )
    }
}

fn join_versions(versions: &[FormatVersion]) -> String {
    versions
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every version whose grammar accepts the shape of `code`, in priority order.
pub fn candidates(code: &str) -> Vec<FormatVersion> {
    FormatVersion::ALL
        .into_iter()
        .filter(|version| version.validate(code))
        .collect()
}

/// The highest-priority version whose grammar accepts the shape of `code`.
pub fn detect(code: &str) -> Option<FormatVersion> {
    FormatVersion::ALL
        .into_iter()
        .find(|version| version.validate(code))
}

/// A successfully decoded code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub code: String,
    pub version: FormatVersion,
    pub fields: Fields,
    pub components: Components,
}

impl Decoded {
    /// Decodes `code` with exactly one grammar.
    pub fn with_version(code: &str, version: FormatVersion) -> Result<Self, CodecError> {
        let fields = version.parse(code)?;
        let components = version.components(code)?;
        Ok(Self {
            code: code.to_string(),
            version,
            fields,
            components,
        })
    }

    pub fn kind(&self) -> CodeKind {
        self.fields.kind()
    }

    /// Display form of the code.
    pub fn formatted(&self) -> String {
        self.version
            .display(&self.code)
            .unwrap_or_else(|_| self.code.clone())
    }

    /// Canonical code of the owning LOT, derived from the Serial's own fields.
    pub fn lot_code(&self) -> Option<String> {
        match self.kind() {
            CodeKind::Lot => None,
            CodeKind::Serial => self.version.encode(&self.fields.lot_fields()).ok(),
        }
    }

    /// Midnight of the attributed production day.
    pub fn production_datetime(&self) -> NaiveDateTime {
        self.fields.production_date().and_time(chrono::NaiveTime::MIN)
    }
}

/// Decodes `code`, trusting `stored_version` when present.
///
/// Without a tag, every grammar that accepts the shape is tried. One
/// successful parse is returned as-is; several successes that disagree are
/// reported as [`DecodeError::Ambiguous`] rather than picking one.
pub fn decode(code: &str, stored_version: Option<FormatVersion>) -> Result<Decoded, DecodeError> {
    if let Some(version) = stored_version {
        return Ok(Decoded::with_version(code, version)?);
    }

    let shapes = candidates(code);
    if shapes.is_empty() {
        return Err(DecodeError::Unrecognized {
            code: code.to_string(),
        });
    }

    let mut decoded: Vec<Decoded> = Vec::with_capacity(shapes.len());
    let mut first_error = None;
    for version in shapes {
        match Decoded::with_version(code, version) {
            Ok(d) => decoded.push(d),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    let Some(first) = decoded.first() else {
        return Err(match first_error {
            Some(e) => DecodeError::InvalidFormat(e),
            None => DecodeError::Unrecognized {
                code: code.to_string(),
            },
        });
    };

    if decoded.iter().all(|d| d.components == first.components) {
        return Ok(decoded.swap_remove(0));
    }

    Err(DecodeError::Ambiguous {
        code: code.to_string(),
        candidates: decoded.iter().map(|d| d.version).collect(),
    })
}
