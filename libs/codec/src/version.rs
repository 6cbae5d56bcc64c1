//! Format version tags and code kinds.

use std::fmt;
use std::str::FromStr;

use crate::CodecError;

/// The grammar version that produced (or accepts) a code.
///
/// Versions are append-only: new grammars get a new variant, old ones are
/// never removed, since codes minted under them stay in circulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormatVersion {
    /// Hyphenated legacy form with day-level date and shift letter.
    V0,
    /// First compact form: no country, 2-digit LOT sequence.
    V1,
    /// Compact form with country code and 3-digit LOT sequence.
    V2,
    /// Compact form with a 2-character base-36 LOT sequence.
    V3,
}

impl FormatVersion {
    /// Every known version, in the order they were introduced.
    ///
    /// This is also the detection priority: the legacy form is checked first
    /// because its separators make it unambiguous, and among compact forms an
    /// older grammar wins over a newer one of the same shape.
    pub const ALL: [FormatVersion; 4] = [
        FormatVersion::V0,
        FormatVersion::V1,
        FormatVersion::V2,
        FormatVersion::V3,
    ];

    /// The small-integer tag persisted next to each code.
    #[must_use]
    pub const fn tag(self) -> i16 {
        match self {
            FormatVersion::V0 => 0,
            FormatVersion::V1 => 1,
            FormatVersion::V2 => 2,
            FormatVersion::V3 => 3,
        }
    }

    /// Looks up a version by its persisted tag.
    pub fn from_tag(tag: i16) -> Option<Self> {
        match tag {
            0 => Some(FormatVersion::V0),
            1 => Some(FormatVersion::V1),
            2 => Some(FormatVersion::V2),
            3 => Some(FormatVersion::V3),
            _ => None,
        }
    }

    /// Returns true for the hyphenated legacy grammar.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        matches!(self, FormatVersion::V0)
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.tag())
    }
}

impl FromStr for FormatVersion {
    type Err = CodecError;

    /// Accepts `2`, `v2`, or `V2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('v')
            .or_else(|| s.strip_prefix('V'))
            .unwrap_or(s);
        digits
            .parse::<i16>()
            .ok()
            .and_then(Self::from_tag)
            .ok_or_else(|| CodecError::InvalidFormat {
                version: FormatVersion::V0,
                code: s.to_string(),
                reason: "unknown format version".to_string(),
            })
    }
}

impl serde::Serialize for FormatVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i16(self.tag())
    }
}

impl<'de> serde::Deserialize<'de> for FormatVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = i16::deserialize(deserializer)?;
        Self::from_tag(tag)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown format version {tag}")))
    }
}

/// Whether a code names a batch or a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeKind {
    Lot,
    Serial,
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeKind::Lot => f.write_str("lot"),
            CodeKind::Serial => f.write_str("serial"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_roundtrip() {
        for version in FormatVersion::ALL {
            assert_eq!(FormatVersion::from_tag(version.tag()), Some(version));
        }
        assert_eq!(FormatVersion::from_tag(4), None);
    }

    #[test]
    fn test_from_str_accepts_prefixed_and_bare() {
        assert_eq!("2".parse::<FormatVersion>().unwrap(), FormatVersion::V2);
        assert_eq!("v3".parse::<FormatVersion>().unwrap(), FormatVersion::V3);
        assert_eq!("V0".parse::<FormatVersion>().unwrap(), FormatVersion::V0);
        assert!("v9".parse::<FormatVersion>().is_err());
        assert!("two".parse::<FormatVersion>().is_err());
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&FormatVersion::V2).unwrap();
        assert_eq!(json, "2");
        let parsed: FormatVersion = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, FormatVersion::V1);
        assert!(serde_json::from_str::<FormatVersion>("7").is_err());
    }
}
