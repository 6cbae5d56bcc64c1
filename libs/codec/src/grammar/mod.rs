//! Per-version code grammars.
//!
//! Every [`FormatVersion`] has exactly one grammar, selected by `match`.
//! Grammars are pure: `validate` checks shape only, `parse` adds range
//! checks, and `encode` is the exact inverse of `parse`.

mod compact;
mod legacy;

use crate::fields::{Components, Fields};
use crate::{CodeKind, CodecError, FormatVersion, SEQUENCE_CAPACITY};

use compact::Layout;

impl FormatVersion {
    fn layout(self) -> Option<&'static Layout> {
        match self {
            FormatVersion::V0 => None,
            FormatVersion::V1 => Some(&compact::V1),
            FormatVersion::V2 => Some(&compact::V2),
            FormatVersion::V3 => Some(&compact::V3),
        }
    }

    /// Total code length for the given kind under this grammar.
    #[must_use]
    pub fn code_len(self, kind: CodeKind) -> usize {
        match (self.layout(), kind) {
            (None, CodeKind::Lot) => legacy::LOT_LEN,
            (None, CodeKind::Serial) => legacy::SERIAL_LEN,
            (Some(layout), CodeKind::Lot) => layout.lot_len(),
            (Some(layout), CodeKind::Serial) => layout.serial_len(),
        }
    }

    /// Largest sequence this grammar can write for `kind`: the LOT sequence
    /// for LOTs and the unit sequence for Serials.
    #[must_use]
    pub fn max_sequence(self, kind: CodeKind) -> u32 {
        match (self.layout(), kind) {
            (None, CodeKind::Lot) => u32::from(legacy::MAX_SEQUENCE),
            (None, CodeKind::Serial) => u32::from(legacy::MAX_UNIT),
            (Some(layout), CodeKind::Lot) => layout.max_sequence(),
            (Some(layout), CodeKind::Serial) => layout.max_unit(),
        }
    }

    /// Largest value a counter minting `kind` codes under this grammar may
    /// issue: the grammar's limit, never above [`SEQUENCE_CAPACITY`].
    #[must_use]
    pub fn sequence_capacity(self, kind: CodeKind) -> u16 {
        u16::try_from(self.max_sequence(kind).min(u32::from(SEQUENCE_CAPACITY)))
            .unwrap_or(SEQUENCE_CAPACITY)
    }

    /// True when this grammar writes the line's country prefix.
    #[must_use]
    pub fn has_country(self) -> bool {
        match self.layout() {
            None => true,
            Some(layout) => layout.has_country(),
        }
    }

    /// Shape check only: no month or date range validation.
    #[must_use]
    pub fn validate(self, code: &str) -> bool {
        match self.layout() {
            None => legacy::validate(code),
            Some(layout) => layout.validate(code),
        }
    }

    /// Decodes a canonical code into typed fields.
    pub fn parse(self, code: &str) -> Result<Fields, CodecError> {
        match self.layout() {
            None => legacy::parse(code).map(Fields::Legacy),
            Some(layout) => layout.parse(code).map(Fields::Compact),
        }
    }

    /// Encodes fields into this grammar's canonical code.
    pub fn encode(self, fields: &Fields) -> Result<String, CodecError> {
        match (self.layout(), fields) {
            (None, Fields::Legacy(f)) => legacy::encode(f),
            (Some(layout), Fields::Compact(f)) => layout.encode(f),
            (_, other) => Err(CodecError::FieldsMismatch {
                version: self,
                found: other.shape_name(),
            }),
        }
    }

    /// Splits a code into its zero-padded field substrings.
    pub fn components(self, code: &str) -> Result<Components, CodecError> {
        match self.layout() {
            None => legacy::components(code),
            Some(layout) => layout.components(code),
        }
    }

    /// Human-readable form with hyphens between field groups.
    ///
    /// Presentation only: the result is not a canonical code and is rejected
    /// by every compact grammar's `validate`.
    pub fn display(self, code: &str) -> Result<String, CodecError> {
        match self.layout() {
            None if legacy::validate(code) => Ok(code.to_string()),
            None => Err(CodecError::invalid(self, code, "layout mismatch")),
            Some(layout) => layout.display(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{CompactFields, LegacyFields, LineCode, ModelCode, Shift, YearMonth};
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(FormatVersion::V0, "PSA10-KR001-251110D-001")]
    #[case(FormatVersion::V0, "PSA10-KR001-251110D-001-0001")]
    #[case(FormatVersion::V1, "PSA01251101")]
    #[case(FormatVersion::V1, "PSA01251101042")]
    #[case(FormatVersion::V2, "KR01PSA2511001")]
    #[case(FormatVersion::V2, "KR01PSA2511001042")]
    #[case(FormatVersion::V3, "KR01PSA25110A")]
    #[case(FormatVersion::V3, "KR01PSA25110A042")]
    fn test_code_roundtrip(#[case] version: FormatVersion, #[case] code: &str) {
        assert!(version.validate(code));
        let fields = version.parse(code).unwrap();
        assert_eq!(version.encode(&fields).unwrap(), code);
        assert_eq!(version.code_len(fields.kind()), code.len());
    }

    #[rstest]
    #[case(FormatVersion::V1, "PSA01251301")]
    #[case(FormatVersion::V2, "KR01PSA2500001")]
    #[case(FormatVersion::V3, "KR01PSA251301")]
    #[case(FormatVersion::V0, "PSA10-KR001-251100D-001")]
    fn test_shape_valid_but_out_of_range(#[case] version: FormatVersion, #[case] code: &str) {
        assert!(version.validate(code));
        let err = version.parse(code).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_fields_mismatch() {
        let legacy = FormatVersion::V0.parse("PSA10-KR001-251110D-001").unwrap();
        assert!(matches!(
            FormatVersion::V2.encode(&legacy),
            Err(CodecError::FieldsMismatch { .. })
        ));
        let compact = FormatVersion::V2.parse("KR01PSA2511001").unwrap();
        assert!(matches!(
            FormatVersion::V0.encode(&compact),
            Err(CodecError::FieldsMismatch { .. })
        ));
    }

    #[test]
    fn test_sequence_overflow() {
        let mut fields = match FormatVersion::V2.parse("KR01PSA2511001").unwrap() {
            Fields::Compact(f) => f,
            Fields::Legacy(_) => unreachable!(),
        };
        fields.sequence = 1000;
        let err = FormatVersion::V2
            .encode(&Fields::Compact(fields.clone()))
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::FieldOverflow {
                field: "sequence",
                ..
            }
        ));

        fields.country = None;
        fields.sequence = 100;
        assert!(FormatVersion::V1
            .encode(&Fields::Compact(fields))
            .unwrap_err()
            .is_encode_error());
    }

    #[rstest]
    #[case(FormatVersion::V0, CodeKind::Lot, 999)]
    #[case(FormatVersion::V0, CodeKind::Serial, 999)]
    #[case(FormatVersion::V1, CodeKind::Lot, 99)]
    #[case(FormatVersion::V1, CodeKind::Serial, 999)]
    #[case(FormatVersion::V2, CodeKind::Lot, 999)]
    #[case(FormatVersion::V3, CodeKind::Lot, 999)]
    #[case(FormatVersion::V3, CodeKind::Serial, 999)]
    fn test_sequence_capacity(
        #[case] version: FormatVersion,
        #[case] kind: CodeKind,
        #[case] capacity: u16,
    ) {
        assert_eq!(version.sequence_capacity(kind), capacity);
    }

    #[test]
    fn test_display_is_not_canonical() {
        let formatted = FormatVersion::V2.display("KR01PSA2511001").unwrap();
        assert_eq!(formatted, "KR01-PSA-2511-001");
        for version in FormatVersion::ALL {
            assert!(!version.validate(&formatted), "{version} accepted {formatted}");
        }
        assert_eq!(
            FormatVersion::V0
                .display("PSA10-KR001-251110D-001-0001")
                .unwrap(),
            "PSA10-KR001-251110D-001-0001"
        );
    }

    fn model_code() -> impl Strategy<Value = ModelCode> {
        "[A-Z0-9]{3}".prop_map(|s| ModelCode::parse(&s).unwrap())
    }

    fn year_month() -> impl Strategy<Value = YearMonth> {
        (2000i32..=2099, 1u32..=12).prop_map(|(y, m)| YearMonth::new(y, m).unwrap())
    }

    fn compact_fields(
        with_country: bool,
        max_sequence: u16,
    ) -> impl Strategy<Value = CompactFields> {
        (
            "[A-Z]{2}",
            0u16..=99,
            model_code(),
            year_month(),
            1u16..=max_sequence,
            proptest::option::of(1u16..=999),
        )
            .prop_map(move |(country, line_number, model, production_month, sequence, unit)| {
                CompactFields {
                    country: with_country.then_some(country),
                    line_number,
                    model,
                    production_month,
                    sequence,
                    unit,
                }
            })
    }

    fn legacy_fields() -> impl Strategy<Value = LegacyFields> {
        (
            "[A-Z0-9]{5}",
            "[A-Z]{2}",
            0u16..=999,
            (2000i32..=2099, 1u32..=12, 1u32..=28),
            prop_oneof![Just(Shift::Day), Just(Shift::Night)],
            1u16..=999,
            proptest::option::of(1u16..=9999),
        )
            .prop_map(|(model_name, country, number, (y, m, d), shift, sequence, unit)| {
                LegacyFields {
                    model_name,
                    line: LineCode::new(&country, number).unwrap(),
                    production_date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
                    shift,
                    sequence,
                    unit,
                }
            })
    }

    // Well-formed codes: calendar months, days up to 28, non-zero sequences.
    const V0_CODE: &str = "[A-Z0-9]{5}-[A-Z]{2}[0-9]{3}-[0-9]{2}(0[1-9]|1[0-2])(0[1-9]|1[0-9]|2[0-8])[DN]-(00[1-9]|0[1-9][0-9]|[1-9][0-9]{2})(-(000[1-9]|00[1-9][0-9]|0[1-9][0-9]{2}|[1-9][0-9]{3}))?";
    const V1_CODE: &str = "[A-Z0-9]{3}[0-9]{2}[0-9]{2}(0[1-9]|1[0-2])(0[1-9]|[1-9][0-9])(00[1-9]|0[1-9][0-9]|[1-9][0-9]{2})?";
    const V2_CODE: &str = "[A-Z]{2}[0-9]{2}[A-Z0-9]{3}[0-9]{2}(0[1-9]|1[0-2])(00[1-9]|0[1-9][0-9]|[1-9][0-9]{2})(00[1-9]|0[1-9][0-9]|[1-9][0-9]{2})?";
    const V3_CODE: &str = "[A-Z]{2}[0-9]{2}[A-Z0-9]{3}[0-9]{2}(0[1-9]|1[0-2])(0[1-9A-Z]|[1-9A-Z][0-9A-Z])(00[1-9]|0[1-9][0-9]|[1-9][0-9]{2})?";

    proptest! {
        #[test]
        fn prop_v0_fields_roundtrip(fields in legacy_fields()) {
            let fields = Fields::Legacy(fields);
            let code = FormatVersion::V0.encode(&fields).unwrap();
            prop_assert_eq!(FormatVersion::V0.parse(&code).unwrap(), fields);
        }

        #[test]
        fn prop_v1_fields_roundtrip(fields in compact_fields(false, 99)) {
            let fields = Fields::Compact(fields);
            let code = FormatVersion::V1.encode(&fields).unwrap();
            prop_assert_eq!(FormatVersion::V1.parse(&code).unwrap(), fields);
        }

        #[test]
        fn prop_v2_fields_roundtrip(fields in compact_fields(true, 999)) {
            let fields = Fields::Compact(fields);
            let code = FormatVersion::V2.encode(&fields).unwrap();
            prop_assert_eq!(FormatVersion::V2.parse(&code).unwrap(), fields);
        }

        #[test]
        fn prop_v3_fields_roundtrip(fields in compact_fields(true, 1295)) {
            let fields = Fields::Compact(fields);
            let code = FormatVersion::V3.encode(&fields).unwrap();
            prop_assert_eq!(FormatVersion::V3.parse(&code).unwrap(), fields);
        }

        #[test]
        fn prop_v0_codes_roundtrip(code in V0_CODE) {
            let fields = FormatVersion::V0.parse(&code).unwrap();
            prop_assert_eq!(FormatVersion::V0.encode(&fields).unwrap(), code);
        }

        #[test]
        fn prop_v1_codes_roundtrip(code in V1_CODE) {
            let fields = FormatVersion::V1.parse(&code).unwrap();
            prop_assert_eq!(FormatVersion::V1.encode(&fields).unwrap(), code);
        }

        #[test]
        fn prop_v2_codes_roundtrip(code in V2_CODE) {
            let fields = FormatVersion::V2.parse(&code).unwrap();
            prop_assert_eq!(FormatVersion::V2.encode(&fields).unwrap(), code);
        }

        #[test]
        fn prop_v3_codes_roundtrip(code in V3_CODE) {
            let fields = FormatVersion::V3.parse(&code).unwrap();
            prop_assert_eq!(FormatVersion::V3.encode(&fields).unwrap(), code);
        }
    }
}
