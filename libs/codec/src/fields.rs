//! Structured field types decoded from (and encoded into) codes.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{CodeKind, CodecError};

// =============================================================================
// Line and model
// =============================================================================

/// A production line name such as `KR001`: two country letters, three digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCode {
    country: String,
    number: u16,
}

impl LineCode {
    /// Builds a line code from its parts.
    pub fn new(country: &str, number: u16) -> Result<Self, CodecError> {
        let valid_country =
            country.len() == 2 && country.bytes().all(|b| b.is_ascii_uppercase());
        if !valid_country || number > 999 {
            return Err(CodecError::InvalidLine {
                line: format!("{country}{number:03}"),
            });
        }
        Ok(Self {
            country: country.to_string(),
            number,
        })
    }

    /// Parses a line name of the form `CCNNN`.
    pub fn parse(s: &str) -> Result<Self, CodecError> {
        let invalid = || CodecError::InvalidLine {
            line: s.to_string(),
        };
        if s.len() != 5 || !s.is_ascii() {
            return Err(invalid());
        }
        let (country, digits) = s.split_at(2);
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let number = digits.parse().map_err(|_| invalid())?;
        Self::new(country, number).map_err(|_| invalid())
    }

    /// The two-letter country prefix.
    pub fn country(&self) -> &str {
        &self.country
    }

    /// The numeric line within the country.
    pub fn number(&self) -> u16 {
        self.number
    }
}

impl fmt::Display for LineCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.country, self.number)
    }
}

impl FromStr for LineCode {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A three-character model abbreviation used inside compact codes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelCode(String);

impl ModelCode {
    /// Width of every model abbreviation.
    pub const WIDTH: usize = 3;

    pub fn parse(s: &str) -> Result<Self, CodecError> {
        let valid = s.len() == Self::WIDTH
            && s.bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !valid {
            return Err(CodecError::InvalidModelCode {
                code: s.to_string(),
            });
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModelCode {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ModelCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Dates
// =============================================================================

/// A calendar production month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Returns `None` unless `month` is in 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Midnight on the first day of the month is the nominal production date.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Work shift recorded by the legacy grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shift {
    Day,
    Night,
}

impl Shift {
    pub fn letter(self) -> char {
        match self {
            Shift::Day => 'D',
            Shift::Night => 'N',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'D' => Some(Shift::Day),
            'N' => Some(Shift::Night),
            _ => None,
        }
    }
}

// =============================================================================
// Decoded fields
// =============================================================================

/// Fields of the hyphenated legacy grammar.
///
/// Legacy codes carry the full model name and a day-level date with shift,
/// which no compact grammar can represent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LegacyFields {
    pub model_name: String,
    pub line: LineCode,
    pub production_date: NaiveDate,
    pub shift: Shift,
    pub sequence: u16,
    pub unit: Option<u16>,
}

/// Fields shared by the separator-free compact grammars.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompactFields {
    /// Absent for V1, which predates multi-country plants.
    pub country: Option<String>,
    pub line_number: u16,
    pub model: ModelCode,
    pub production_month: YearMonth,
    pub sequence: u16,
    pub unit: Option<u16>,
}

/// Decoded fields of any grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fields {
    Legacy(LegacyFields),
    Compact(CompactFields),
}

impl Fields {
    /// A LOT code has no unit sequence; a Serial code does.
    pub fn kind(&self) -> CodeKind {
        if self.unit().is_some() {
            CodeKind::Serial
        } else {
            CodeKind::Lot
        }
    }

    /// The LOT sequence within its line/model/month scope.
    pub fn sequence(&self) -> u16 {
        match self {
            Fields::Legacy(f) => f.sequence,
            Fields::Compact(f) => f.sequence,
        }
    }

    /// The unit sequence within the owning LOT, for Serial codes.
    pub fn unit(&self) -> Option<u16> {
        match self {
            Fields::Legacy(f) => f.unit,
            Fields::Compact(f) => f.unit,
        }
    }

    /// The day this code attributes production to.
    pub fn production_date(&self) -> NaiveDate {
        match self {
            Fields::Legacy(f) => f.production_date,
            Fields::Compact(f) => f.production_month.first_day(),
        }
    }

    /// Fields of the owning LOT: the same fields with the unit dropped.
    #[must_use]
    pub fn lot_fields(&self) -> Fields {
        self.clone().with_unit(None)
    }

    /// Returns these fields with the unit sequence replaced.
    #[must_use]
    pub fn with_unit(self, unit: Option<u16>) -> Fields {
        match self {
            Fields::Legacy(f) => Fields::Legacy(LegacyFields { unit, ..f }),
            Fields::Compact(f) => Fields::Compact(CompactFields { unit, ..f }),
        }
    }

    pub(crate) fn shape_name(&self) -> &'static str {
        match self {
            Fields::Legacy(_) => "legacy",
            Fields::Compact(_) => "compact",
        }
    }
}

/// Zero-padded field substrings as they appear in a code.
///
/// This is the flat view handed to lookup screens; its shape follows the
/// code rather than the typed [`Fields`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    pub line_number: String,
    pub model_code: String,
    pub production_month: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<String>,
    pub sequence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_sequence: Option<String>,
}
