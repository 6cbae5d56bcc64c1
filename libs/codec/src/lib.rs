//! # lotline-codec
//!
//! LOT and Serial identifier grammars for the lotline production tracker.
//!
//! ## Design Principles
//!
//! - Every code has one canonical, fixed-width string form
//! - Grammars are pure: `parse(encode(f)) == f` and `encode(parse(c)) == c`
//! - Codes carry no version marker; the stored version tag is authoritative
//! - Versions are a closed, append-only set dispatched by `match`
//!
//! ## Code Formats
//!
//! | Version | LOT | Serial |
//! |---------|-----|--------|
//! | V0 | `PSA10-KR001-251110D-001` | `PSA10-KR001-251110D-001-0001` |
//! | V1 | `PSA01251101` | `PSA01251101001` |
//! | V2 | `KR01PSA2511001` | `KR01PSA2511001001` |
//! | V3 | `KR01PSA251101` | `KR01PSA251101001` |
//!
//! Display forms (`KR01-PSA-2511-001`) are presentation only and are never
//! accepted by `validate` or `parse`.

mod detect;
mod error;
mod fields;
mod grammar;
mod identifier;
mod model_map;
mod report;
mod version;

pub use detect::{candidates, decode, detect, DecodeError, Decoded};
pub use error::CodecError;
pub use fields::{
    CompactFields, Components, Fields, LegacyFields, LineCode, ModelCode, Shift, YearMonth,
};
pub use identifier::{LotIdentifier, SerialIdentifier};
pub use model_map::ModelCodeMap;
pub use report::{DecodeReport, VersionSource};
pub use version::{CodeKind, FormatVersion};

/// Largest sequence any scope may issue.
pub const SEQUENCE_CAPACITY: u16 = 999;
