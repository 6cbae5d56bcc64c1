//! Minted LOT and Serial identifiers.
//!
//! Both are immutable once built. The canonical code is computed exactly
//! once, from the fields, and never re-derived from a display form.

use crate::fields::Fields;
use crate::{CodeKind, CodecError, FormatVersion};

/// A batch identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LotIdentifier {
    code: String,
    version: FormatVersion,
    fields: Fields,
}

impl LotIdentifier {
    /// Encodes LOT fields under `version`.
    pub fn encode(version: FormatVersion, fields: Fields) -> Result<Self, CodecError> {
        let code = version.encode(&fields)?;
        if fields.kind() != CodeKind::Lot {
            return Err(CodecError::WrongKind {
                code,
                expected: CodeKind::Lot,
            });
        }
        Ok(Self {
            code,
            version,
            fields,
        })
    }

    /// Rebuilds an identifier from a stored code and its version tag.
    pub fn parse(code: &str, version: FormatVersion) -> Result<Self, CodecError> {
        let fields = version.parse(code)?;
        if fields.kind() != CodeKind::Lot {
            return Err(CodecError::WrongKind {
                code: code.to_string(),
                expected: CodeKind::Lot,
            });
        }
        Ok(Self {
            code: code.to_string(),
            version,
            fields,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn sequence(&self) -> u16 {
        self.fields.sequence()
    }
}

/// A unit identifier, always encoded under its LOT's version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerialIdentifier {
    code: String,
    version: FormatVersion,
    fields: Fields,
    lot_code: String,
}

impl SerialIdentifier {
    /// Encodes unit `unit` of `lot`.
    pub fn for_lot(lot: &LotIdentifier, unit: u16) -> Result<Self, CodecError> {
        let fields = lot.fields.clone().with_unit(Some(unit));
        let code = lot.version.encode(&fields)?;
        Ok(Self {
            code,
            version: lot.version,
            fields,
            lot_code: lot.code.clone(),
        })
    }

    /// Rebuilds an identifier from a stored code and its version tag.
    ///
    /// The owning LOT code comes from the Serial's own fields.
    pub fn parse(code: &str, version: FormatVersion) -> Result<Self, CodecError> {
        let fields = version.parse(code)?;
        if fields.kind() != CodeKind::Serial {
            return Err(CodecError::WrongKind {
                code: code.to_string(),
                expected: CodeKind::Serial,
            });
        }
        let lot_code = version.encode(&fields.lot_fields())?;
        Ok(Self {
            code: code.to_string(),
            version,
            fields,
            lot_code,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn lot_code(&self) -> &str {
        &self.lot_code
    }

    pub fn unit(&self) -> u16 {
        self.fields.unit().unwrap_or_default()
    }
}
