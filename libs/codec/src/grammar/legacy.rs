//! Hyphenated legacy grammar (V0).
//!
//! `MMMMM-CCNNN-YYMMDDS-SSS` for LOTs, with `-UUUU` appended for Serials:
//! full model name, production line, production day, shift letter, LOT
//! sequence, and unit sequence.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::fields::{Components, LegacyFields, LineCode, Shift};
use crate::{CodecError, FormatVersion};

pub(crate) const LOT_LEN: usize = 23;
pub(crate) const SERIAL_LEN: usize = 28;

const VERSION: FormatVersion = FormatVersion::V0;
const MODEL_NAME_WIDTH: usize = 5;
const SEQUENCE_WIDTH: usize = 3;
const UNIT_WIDTH: usize = 4;

pub(crate) const MAX_SEQUENCE: u16 = 999;
pub(crate) const MAX_UNIT: u16 = 9999;

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9]{5}-[A-Z]{2}[0-9]{3}-[0-9]{6}[DN]-[0-9]{3}(?:-[0-9]{4})?$")
        .expect("legacy pattern is static and valid")
});

pub(crate) fn validate(code: &str) -> bool {
    PATTERN.is_match(code)
}

pub(crate) fn parse(code: &str) -> Result<LegacyFields, CodecError> {
    if !validate(code) {
        return Err(CodecError::invalid(
            VERSION,
            code,
            "expected MMMMM-CCNNN-YYMMDDS-SSS with optional -UUUU",
        ));
    }

    let parts: Vec<&str> = code.split('-').collect();
    let line = LineCode::parse(parts[1])?;

    let stamp = parts[2];
    let number = |range: std::ops::Range<usize>| -> Result<u32, CodecError> {
        stamp[range]
            .parse()
            .map_err(|_| CodecError::invalid(VERSION, code, "date is not numeric"))
    };
    let (yy, mm, dd) = (number(0..2)?, number(2..4)?, number(4..6)?);
    let production_date = NaiveDate::from_ymd_opt(2000 + yy as i32, mm, dd).ok_or_else(|| {
        CodecError::invalid(
            VERSION,
            code,
            format!("{} is not a calendar date", &stamp[..6]),
        )
    })?;
    let shift = stamp[6..]
        .chars()
        .next()
        .and_then(Shift::from_letter)
        .ok_or_else(|| CodecError::invalid(VERSION, code, "shift must be D or N"))?;

    let sequence = positive(parts[3])
        .ok_or_else(|| CodecError::invalid(VERSION, code, "LOT sequence must be at least 1"))?;
    let unit = match parts.get(4) {
        Some(digits) => Some(positive(digits).ok_or_else(|| {
            CodecError::invalid(VERSION, code, "unit sequence must be at least 1")
        })?),
        None => None,
    };

    Ok(LegacyFields {
        model_name: parts[0].to_string(),
        line,
        production_date,
        shift,
        sequence,
        unit,
    })
}

pub(crate) fn encode(fields: &LegacyFields) -> Result<String, CodecError> {
    let model_ok = fields.model_name.len() == MODEL_NAME_WIDTH
        && fields
            .model_name
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
    if !model_ok {
        return Err(CodecError::overflow(
            VERSION,
            "model_name",
            &fields.model_name,
            MODEL_NAME_WIDTH,
        ));
    }

    let yy = fields.production_date.year() - 2000;
    if !(0..=99).contains(&yy) {
        return Err(CodecError::overflow(
            VERSION,
            "production_date",
            fields.production_date,
            6,
        ));
    }

    if fields.sequence == 0 || fields.sequence > MAX_SEQUENCE {
        return Err(CodecError::overflow(
            VERSION,
            "sequence",
            fields.sequence,
            SEQUENCE_WIDTH,
        ));
    }

    let mut out = format!(
        "{}-{}-{:02}{:02}{:02}{}-{:03}",
        fields.model_name,
        fields.line,
        yy,
        fields.production_date.month(),
        fields.production_date.day(),
        fields.shift.letter(),
        fields.sequence,
    );

    if let Some(unit) = fields.unit {
        if unit == 0 || unit > MAX_UNIT {
            return Err(CodecError::overflow(VERSION, "unit_sequence", unit, UNIT_WIDTH));
        }
        out.push_str(&format!("-{unit:04}"));
    }

    Ok(out)
}

pub(crate) fn components(code: &str) -> Result<Components, CodecError> {
    if !validate(code) {
        return Err(CodecError::invalid(VERSION, code, "layout mismatch"));
    }
    let parts: Vec<&str> = code.split('-').collect();
    let (country, line_number) = parts[1].split_at(2);
    let stamp = parts[2];
    Ok(Components {
        country_code: Some(country.to_string()),
        line_number: line_number.to_string(),
        model_code: parts[0].to_string(),
        production_month: stamp[..4].to_string(),
        production_day: Some(stamp[4..6].to_string()),
        shift: Some(stamp[6..].to_string()),
        sequence: parts[3].to_string(),
        unit_sequence: parts.get(4).map(|u| u.to_string()),
    })
}

fn positive(digits: &str) -> Option<u16> {
    digits.parse::<u16>().ok().filter(|n| *n > 0)
}
