//! Error types for code parsing, encoding, and model lookup.

use thiserror::Error;

use crate::{CodeKind, FormatVersion};

/// Errors produced by the codec layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The model name has no abbreviation in the model table.
    #[error("unknown model '{name}'")]
    UnknownModel { name: String },

    /// A model abbreviation is not exactly three `[A-Z0-9]` characters.
    #[error("invalid model code '{code}': expected 3 characters from [A-Z0-9]")]
    InvalidModelCode { code: String },

    /// A production line name is not of the form `CCNNN`.
    #[error("invalid line code '{line}': expected 2 uppercase letters followed by 3 digits")]
    InvalidLine { line: String },

    /// The code does not match the grammar, or a field is out of range.
    #[error("invalid {version} code '{code}': {reason}")]
    InvalidFormat {
        version: FormatVersion,
        code: String,
        reason: String,
    },

    /// A field value is zero or does not fit in its fixed width.
    #[error("{field} value {value} cannot be encoded in {width} {version} characters")]
    FieldOverflow {
        version: FormatVersion,
        field: &'static str,
        value: String,
        width: usize,
    },

    /// A field required by the grammar is absent.
    #[error("{version} codes require {field}")]
    MissingField {
        version: FormatVersion,
        field: &'static str,
    },

    /// A field is present that the grammar has no slot for.
    #[error("{version} codes have no slot for {field}")]
    UnsupportedField {
        version: FormatVersion,
        field: &'static str,
    },

    /// A LOT code was supplied where a Serial code was expected, or the reverse.
    #[error("'{code}' is not a {expected} code")]
    WrongKind { code: String, expected: CodeKind },

    /// Legacy fields were handed to a compact grammar, or the reverse.
    #[error("{version} cannot encode {found} fields")]
    FieldsMismatch {
        version: FormatVersion,
        found: &'static str,
    },
}

impl CodecError {
    pub(crate) fn invalid(version: FormatVersion, code: &str, reason: impl Into<String>) -> Self {
        CodecError::InvalidFormat {
            version,
            code: code.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow(
        version: FormatVersion,
        field: &'static str,
        value: impl ToString,
        width: usize,
    ) -> Self {
        CodecError::FieldOverflow {
            version,
            field,
            value: value.to_string(),
            width,
        }
    }

    /// Returns true if this error came from decoding a code.
    pub fn is_format_error(&self) -> bool {
        matches!(self, CodecError::InvalidFormat { .. })
    }

    /// Returns true if this error came from encoding fields.
    pub fn is_encode_error(&self) -> bool {
        matches!(
            self,
            CodecError::FieldOverflow { .. }
                | CodecError::MissingField { .. }
                | CodecError::UnsupportedField { .. }
                | CodecError::FieldsMismatch { .. }
        )
    }
}
