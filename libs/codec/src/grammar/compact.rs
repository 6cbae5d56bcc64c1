//! Separator-free compact grammars (V1, V2, V3).
//!
//! All compact grammars are a fixed sequence of fixed-width segments
//! followed, for Serial codes, by a 3-digit unit sequence. They differ only
//! in which segments appear, in what order, and how the LOT sequence is
//! written, so one table-driven codec serves all three.

use std::sync::LazyLock;

use regex::Regex;

use crate::fields::{CompactFields, Components, ModelCode, YearMonth};
use crate::{CodecError, FormatVersion};

/// Width of the unit sequence appended to Serial codes.
pub(crate) const UNIT_WIDTH: usize = 3;

const UNIT_MAX: u16 = 999;
const BASE36_DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// How a sequence segment spells its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Radix {
    Decimal,
    Base36,
}

impl Radix {
    fn base(self) -> u32 {
        match self {
            Radix::Decimal => 10,
            Radix::Base36 => 36,
        }
    }

    fn char_class(self) -> &'static str {
        match self {
            Radix::Decimal => "[0-9]",
            Radix::Base36 => "[0-9A-Z]",
        }
    }

    /// Largest value representable in `width` characters.
    fn max(self, width: usize) -> u32 {
        self.base().pow(width as u32) - 1
    }

    fn encode(self, value: u16, width: usize) -> Option<String> {
        let value = u32::from(value);
        if value > self.max(width) {
            return None;
        }
        let base = self.base();
        let mut out = vec![b'0'; width];
        let mut rest = value;
        for slot in out.iter_mut().rev() {
            *slot = BASE36_DIGITS[(rest % base) as usize];
            rest /= base;
        }
        String::from_utf8(out).ok()
    }

    fn decode(self, digits: &str) -> Option<u16> {
        u16::from_str_radix(digits, self.base()).ok()
    }
}

/// One fixed-width slot of a compact code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment {
    /// Two uppercase letters.
    Country,
    /// Two-digit line number.
    Line,
    /// Three-character model abbreviation.
    Model,
    /// `YYMM`.
    Month,
    /// LOT sequence in the given radix and width.
    Sequence(Radix, usize),
}

impl Segment {
    fn width(self) -> usize {
        match self {
            Segment::Country | Segment::Line => 2,
            Segment::Model => ModelCode::WIDTH,
            Segment::Month => 4,
            Segment::Sequence(_, width) => width,
        }
    }

    fn pattern(self) -> String {
        match self {
            Segment::Country => "[A-Z]{2}".to_string(),
            Segment::Line => "[0-9]{2}".to_string(),
            Segment::Model => "[A-Z0-9]{3}".to_string(),
            Segment::Month => "[0-9]{4}".to_string(),
            Segment::Sequence(radix, width) => format!("{}{{{width}}}", radix.char_class()),
        }
    }
}

/// The segment table of one compact grammar.
#[derive(Debug)]
pub(crate) struct Layout {
    pub(crate) version: FormatVersion,
    segments: &'static [Segment],
    /// Segment counts per hyphen-separated display group.
    display_groups: &'static [usize],
}

pub(crate) static V1: Layout = Layout {
    version: FormatVersion::V1,
    segments: &[
        Segment::Model,
        Segment::Line,
        Segment::Month,
        Segment::Sequence(Radix::Decimal, 2),
    ],
    display_groups: &[1, 1, 1, 1],
};

pub(crate) static V2: Layout = Layout {
    version: FormatVersion::V2,
    segments: &[
        Segment::Country,
        Segment::Line,
        Segment::Model,
        Segment::Month,
        Segment::Sequence(Radix::Decimal, 3),
    ],
    display_groups: &[2, 1, 1, 1],
};

pub(crate) static V3: Layout = Layout {
    version: FormatVersion::V3,
    segments: &[
        Segment::Country,
        Segment::Line,
        Segment::Model,
        Segment::Month,
        Segment::Sequence(Radix::Base36, 2),
    ],
    display_groups: &[2, 1, 1, 1],
};

static V1_PATTERN: LazyLock<Regex> = LazyLock::new(|| V1.compile());
static V2_PATTERN: LazyLock<Regex> = LazyLock::new(|| V2.compile());
static V3_PATTERN: LazyLock<Regex> = LazyLock::new(|| V3.compile());

/// Reads consecutive fixed-width slices out of an ASCII code.
struct Cursor<'a> {
    code: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(code: &'a str) -> Self {
        Self { code, pos: 0 }
    }

    fn take(&mut self, width: usize) -> &'a str {
        let slice = &self.code[self.pos..self.pos + width];
        self.pos += width;
        slice
    }

    fn remaining(&self) -> usize {
        self.code.len() - self.pos
    }
}

impl Layout {
    fn compile(&self) -> Regex {
        let body: String = self.segments.iter().map(|s| s.pattern()).collect();
        let pattern = format!("^{body}(?:[0-9]{{{UNIT_WIDTH}}})?$");
        Regex::new(&pattern).expect("compact layout patterns are static and valid")
    }

    fn pattern(&self) -> &'static Regex {
        match self.version {
            FormatVersion::V1 => &V1_PATTERN,
            FormatVersion::V3 => &V3_PATTERN,
            _ => &V2_PATTERN,
        }
    }

    pub(crate) fn has_country(&self) -> bool {
        self.segments.contains(&Segment::Country)
    }

    /// Largest LOT sequence the sequence segment can spell.
    pub(crate) fn max_sequence(&self) -> u32 {
        self.segments
            .iter()
            .find_map(|segment| match *segment {
                Segment::Sequence(radix, width) => Some(radix.max(width)),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub(crate) fn max_unit(&self) -> u32 {
        u32::from(UNIT_MAX)
    }

    /// Total length of a LOT code.
    pub(crate) fn lot_len(&self) -> usize {
        self.segments.iter().map(|s| s.width()).sum()
    }

    /// Total length of a Serial code.
    pub(crate) fn serial_len(&self) -> usize {
        self.lot_len() + UNIT_WIDTH
    }

    pub(crate) fn validate(&self, code: &str) -> bool {
        self.pattern().is_match(code)
    }

    pub(crate) fn parse(&self, code: &str) -> Result<CompactFields, CodecError> {
        let version = self.version;
        if !self.validate(code) {
            return Err(CodecError::invalid(
                version,
                code,
                format!(
                    "expected {} (LOT) or {} (Serial) characters in {version} layout",
                    self.lot_len(),
                    self.serial_len()
                ),
            ));
        }

        let mut country = None;
        let mut line_number: u16 = 0;
        let mut model = None;
        let mut production_month = None;
        let mut sequence: u16 = 0;

        let mut cursor = Cursor::new(code);
        for segment in self.segments {
            let slice = cursor.take(segment.width());
            match *segment {
                Segment::Country => country = Some(slice.to_string()),
                Segment::Line => {
                    line_number = slice
                        .parse()
                        .map_err(|_| CodecError::invalid(version, code, "line is not numeric"))?;
                }
                Segment::Model => model = Some(ModelCode::parse(slice)?),
                Segment::Month => production_month = Some(parse_yymm(version, code, slice)?),
                Segment::Sequence(radix, _) => {
                    sequence = radix
                        .decode(slice)
                        .filter(|n| *n > 0)
                        .ok_or_else(|| {
                            CodecError::invalid(version, code, "LOT sequence must be at least 1")
                        })?;
                }
            }
        }

        let unit = if cursor.remaining() == UNIT_WIDTH {
            let unit = cursor
                .take(UNIT_WIDTH)
                .parse::<u16>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    CodecError::invalid(version, code, "unit sequence must be at least 1")
                })?;
            Some(unit)
        } else {
            None
        };

        let (Some(model), Some(production_month)) = (model, production_month) else {
            return Err(CodecError::invalid(version, code, "layout is missing segments"));
        };

        Ok(CompactFields {
            country,
            line_number,
            model,
            production_month,
            sequence,
            unit,
        })
    }

    pub(crate) fn encode(&self, fields: &CompactFields) -> Result<String, CodecError> {
        let version = self.version;
        if fields.country.is_some() && !self.has_country() {
            return Err(CodecError::UnsupportedField {
                version,
                field: "country_code",
            });
        }

        let mut out = String::with_capacity(self.serial_len());
        for segment in self.segments {
            let width = segment.width();
            match *segment {
                Segment::Country => {
                    let country = fields.country.as_deref().ok_or(CodecError::MissingField {
                        version,
                        field: "country_code",
                    })?;
                    if country.len() != width || !country.bytes().all(|b| b.is_ascii_uppercase())
                    {
                        return Err(CodecError::overflow(version, "country_code", country, width));
                    }
                    out.push_str(country);
                }
                Segment::Line => {
                    if fields.line_number > 99 {
                        return Err(CodecError::overflow(
                            version,
                            "line_number",
                            fields.line_number,
                            width,
                        ));
                    }
                    out.push_str(&format!("{:02}", fields.line_number));
                }
                Segment::Model => out.push_str(fields.model.as_str()),
                Segment::Month => out.push_str(&encode_yymm(version, fields.production_month)?),
                Segment::Sequence(radix, width) => {
                    let digits = Some(fields.sequence)
                        .filter(|n| *n > 0)
                        .and_then(|n| radix.encode(n, width))
                        .ok_or_else(|| {
                            CodecError::overflow(version, "sequence", fields.sequence, width)
                        })?;
                    out.push_str(&digits);
                }
            }
        }

        if let Some(unit) = fields.unit {
            if unit == 0 || unit > UNIT_MAX {
                return Err(CodecError::overflow(version, "unit_sequence", unit, UNIT_WIDTH));
            }
            out.push_str(&format!("{unit:03}"));
        }

        Ok(out)
    }

    /// Splits a validated code into its field substrings.
    pub(crate) fn components(&self, code: &str) -> Result<Components, CodecError> {
        if !self.validate(code) {
            return Err(CodecError::invalid(self.version, code, "layout mismatch"));
        }
        let mut components = Components {
            country_code: None,
            line_number: String::new(),
            model_code: String::new(),
            production_month: String::new(),
            production_day: None,
            shift: None,
            sequence: String::new(),
            unit_sequence: None,
        };
        let mut cursor = Cursor::new(code);
        for segment in self.segments {
            let slice = cursor.take(segment.width()).to_string();
            match segment {
                Segment::Country => components.country_code = Some(slice),
                Segment::Line => components.line_number = slice,
                Segment::Model => components.model_code = slice,
                Segment::Month => components.production_month = slice,
                Segment::Sequence(..) => components.sequence = slice,
            }
        }
        if cursor.remaining() == UNIT_WIDTH {
            components.unit_sequence = Some(cursor.take(UNIT_WIDTH).to_string());
        }
        Ok(components)
    }

    /// Inserts hyphens between display groups of a validated code.
    pub(crate) fn display(&self, code: &str) -> Result<String, CodecError> {
        if !self.validate(code) {
            return Err(CodecError::invalid(self.version, code, "layout mismatch"));
        }
        let mut cursor = Cursor::new(code);
        let mut segments = self.segments.iter();
        let mut groups: Vec<&str> = Vec::with_capacity(self.display_groups.len() + 1);
        for count in self.display_groups {
            let width: usize = segments.by_ref().take(*count).map(|s| s.width()).sum();
            groups.push(cursor.take(width));
        }
        if cursor.remaining() == UNIT_WIDTH {
            groups.push(cursor.take(UNIT_WIDTH));
        }
        Ok(groups.join("-"))
    }
}

fn parse_yymm(version: FormatVersion, code: &str, yymm: &str) -> Result<YearMonth, CodecError> {
    let (yy, mm) = yymm.split_at(2);
    let year = yy
        .parse::<i32>()
        .map_err(|_| CodecError::invalid(version, code, "year is not numeric"))?;
    let month = mm
        .parse::<u32>()
        .map_err(|_| CodecError::invalid(version, code, "month is not numeric"))?;
    YearMonth::new(2000 + year, month)
        .ok_or_else(|| CodecError::invalid(version, code, format!("month {mm} is not in 01-12")))
}

fn encode_yymm(version: FormatVersion, month: YearMonth) -> Result<String, CodecError> {
    let yy = month.year() - 2000;
    if !(0..=99).contains(&yy) {
        return Err(CodecError::overflow(version, "production_month", month, 4));
    }
    Ok(format!("{:02}{:02}", yy, month.month()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_lengths() {
        assert_eq!((V1.lot_len(), V1.serial_len()), (11, 14));
        assert_eq!((V2.lot_len(), V2.serial_len()), (14, 17));
        assert_eq!((V3.lot_len(), V3.serial_len()), (13, 16));
    }

    #[test]
    fn test_max_sequence() {
        assert_eq!(V1.max_sequence(), 99);
        assert_eq!(V2.max_sequence(), 999);
        assert_eq!(V3.max_sequence(), 1295);
        assert_eq!(V2.max_unit(), 999);
    }

    #[test]
    fn test_base36_sequence() {
        assert_eq!(Radix::Base36.encode(1, 2).as_deref(), Some("01"));
        assert_eq!(Radix::Base36.encode(10, 2).as_deref(), Some("0A"));
        assert_eq!(Radix::Base36.encode(999, 2).as_deref(), Some("RR"));
        assert_eq!(Radix::Base36.encode(1295, 2).as_deref(), Some("ZZ"));
        assert_eq!(Radix::Base36.encode(1296, 2), None);
        assert_eq!(Radix::Base36.decode("RR"), Some(999));
    }

    #[test]
    fn test_decimal_sequence_width() {
        assert_eq!(Radix::Decimal.encode(7, 3).as_deref(), Some("007"));
        assert_eq!(Radix::Decimal.encode(99, 2).as_deref(), Some("99"));
        assert_eq!(Radix::Decimal.encode(100, 2), None);
    }

    #[test]
    fn test_v2_parse_fields() {
        let fields = V2.parse("KR01PSA2511001").unwrap();
        assert_eq!(fields.country.as_deref(), Some("KR"));
        assert_eq!(fields.line_number, 1);
        assert_eq!(fields.model.as_str(), "PSA");
        assert_eq!(fields.production_month, YearMonth::new(2025, 11).unwrap());
        assert_eq!(fields.sequence, 1);
        assert_eq!(fields.unit, None);
    }

    #[test]
    fn test_v1_has_no_country() {
        let fields = V1.parse("PSA01251101").unwrap();
        assert_eq!(fields.country, None);
        assert_eq!(fields.line_number, 1);
        assert_eq!(fields.sequence, 1);

        let mut with_country = fields.clone();
        with_country.country = Some("KR".to_string());
        assert!(matches!(
            V1.encode(&with_country),
            Err(CodecError::UnsupportedField { .. })
        ));
        assert!(matches!(
            V2.encode(&fields),
            Err(CodecError::MissingField { .. })
        ));
    }

    #[test]
    fn test_zero_sequences_rejected() {
        assert!(V2.validate("KR01PSA2511000"));
        assert!(V2.parse("KR01PSA2511000").is_err());
        assert!(V2.parse("KR01PSA2511001000").is_err());
        assert!(V3.parse("KR01PSA251100").is_err());
    }

    #[test]
    fn test_display_groups() {
        assert_eq!(V2.display("KR01PSA2511001").unwrap(), "KR01-PSA-2511-001");
        assert_eq!(
            V2.display("KR01PSA2511001042").unwrap(),
            "KR01-PSA-2511-001-042"
        );
        assert_eq!(V1.display("PSA01251101").unwrap(), "PSA-01-2511-01");
        assert_eq!(V3.display("KR01PSA25110A").unwrap(), "KR01-PSA-2511-0A");
    }
}
