//! Identifier minting and lookup.
//!
//! [`IdentifierService`] ties together the model table, the sequence
//! allocator, the active grammar, and identifier persistence. Minting is
//! all-or-nothing per code: nothing is persisted unless a canonical code was
//! produced, and no mint error is retried here.

use std::sync::Arc;

use chrono::NaiveDate;
use lotline_codec::{
    decode, CodeKind, CodecError, CompactFields, DecodeError, Decoded, Fields, FormatVersion,
    LineCode, LotIdentifier, ModelCodeMap, SerialIdentifier, YearMonth,
};
use thiserror::Error;
use tracing::{info, instrument};

use crate::allocator::{AllocError, AllocationScope, AllocatorConfig, SequenceAllocator};
use crate::db::{DbError, IdentifierStore, ScopeCounter, Stores};

pub use lotline_codec::{DecodeReport, VersionSource};

/// Errors from minting LOT or Serial identifiers.
#[derive(Debug, Error)]
pub enum MintError {
    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("invalid production line '{0}'")]
    InvalidLine(String),

    #[error("{0} is a retired format and cannot mint new codes")]
    RetiredFormat(FormatVersion),

    #[error("LOT '{0}' not found")]
    UnknownLot(String),

    #[error("sequence scope '{scope_key}' is exhausted")]
    Exhausted { scope_key: String },

    #[error("sequence scope '{scope_key}' is contended; retry later")]
    Contention { scope_key: String },

    #[error(transparent)]
    Codec(CodecError),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl From<CodecError> for MintError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::UnknownModel { name } => MintError::UnknownModel(name),
            CodecError::InvalidLine { line } => MintError::InvalidLine(line),
            other => MintError::Codec(other),
        }
    }
}

impl From<AllocError> for MintError {
    fn from(err: AllocError) -> Self {
        match err {
            AllocError::Exhausted { scope_key, .. } => MintError::Exhausted { scope_key },
            AllocError::Contention { scope_key, .. } => MintError::Contention { scope_key },
            AllocError::Store(e) => MintError::Store(e),
        }
    }
}

/// Mints and decodes LOT and Serial identifiers.
#[derive(Clone)]
pub struct IdentifierService {
    allocator: SequenceAllocator,
    identifiers: Arc<dyn IdentifierStore>,
    models: Arc<ModelCodeMap>,
    active_format: FormatVersion,
}

impl IdentifierService {
    pub fn new(
        allocator: SequenceAllocator,
        identifiers: Arc<dyn IdentifierStore>,
        models: Arc<ModelCodeMap>,
        active_format: FormatVersion,
    ) -> Self {
        Self {
            allocator,
            identifiers,
            models,
            active_format,
        }
    }

    /// Wires a service over one backend's stores.
    pub fn from_stores(
        stores: &Stores,
        allocator: AllocatorConfig,
        models: ModelCodeMap,
        active_format: FormatVersion,
    ) -> Self {
        Self::new(
            SequenceAllocator::new(stores.counters.clone(), allocator),
            stores.identifiers.clone(),
            Arc::new(models),
            active_format,
        )
    }

    /// Grammar used for newly minted LOTs.
    pub fn active_format(&self) -> FormatVersion {
        self.active_format
    }

    pub fn models(&self) -> &ModelCodeMap {
        &self.models
    }

    /// Mints and persists the next LOT for `line`, `model_name`, and the
    /// month of `target_date`, encoded under the active grammar.
    #[instrument(skip(self), fields(version = %self.active_format))]
    pub async fn mint_lot(
        &self,
        line: &str,
        model_name: &str,
        target_date: NaiveDate,
    ) -> Result<LotIdentifier, MintError> {
        let version = self.active_format;
        if version.is_legacy() {
            return Err(MintError::RetiredFormat(version));
        }

        let line = LineCode::parse(line)?;
        let model = self.models.abbreviate(model_name)?;
        let month = YearMonth::from_date(target_date);

        let mut fields = CompactFields {
            country: version
                .has_country()
                .then(|| line.country().to_string()),
            line_number: line.number(),
            model: model.clone(),
            production_month: month,
            sequence: 1,
            unit: None,
        };
        // Fail on fields the grammar cannot hold before a sequence is spent.
        version.encode(&Fields::Compact(fields.clone()))?;

        let scope = AllocationScope::lot(version, line, model, month);
        fields.sequence = self.allocator.reserve_next(&scope).await?;

        let lot = LotIdentifier::encode(version, Fields::Compact(fields))?;
        self.identifiers.insert_lot(&lot).await?;

        info!(code = %lot.code(), scope_key = %scope, "Minted LOT");
        Ok(lot)
    }

    /// Mints and persists the next Serial of `lot`, under the LOT's own
    /// grammar so the LOT code is recoverable from the Serial.
    #[instrument(skip(self, lot), fields(lot_code = %lot.code()))]
    pub async fn mint_serial(&self, lot: &LotIdentifier) -> Result<SerialIdentifier, MintError> {
        let scope = AllocationScope::serial(lot);
        let unit = self.allocator.reserve_next(&scope).await?;

        let serial = SerialIdentifier::for_lot(lot, unit)?;
        self.identifiers.insert_serial(&serial).await?;

        info!(code = %serial.code(), unit, "Minted Serial");
        Ok(serial)
    }

    /// Decodes a code, trusting `stored_version` over detection.
    pub fn decode(
        &self,
        code: &str,
        stored_version: Option<FormatVersion>,
    ) -> Result<Decoded, DecodeError> {
        decode(code, stored_version)
    }

    /// Builds a decode report for any input.
    ///
    /// The version is taken from `explicit_version`, else the persisted tag,
    /// else detection. Invalid codes produce `valid: false`; only store
    /// failures are returned as errors.
    pub async fn lookup(
        &self,
        code: &str,
        explicit_version: Option<FormatVersion>,
    ) -> Result<DecodeReport, DbError> {
        let (version, source) = match explicit_version {
            Some(v) => (Some(v), VersionSource::Explicit),
            None => match self.identifiers.find(code).await? {
                Some(stored) => (Some(stored.format_version), VersionSource::Stored),
                None => (None, VersionSource::Detected),
            },
        };

        Ok(match decode(code, version) {
            Ok(decoded) => DecodeReport::decoded(decoded, source),
            Err(e) => DecodeReport::failed(code, &e),
        })
    }

    /// Loads a persisted LOT by its canonical code.
    pub async fn lot_by_code(&self, code: &str) -> Result<LotIdentifier, MintError> {
        let stored = self
            .identifiers
            .find(code)
            .await?
            .filter(|s| s.kind == CodeKind::Lot)
            .ok_or_else(|| MintError::UnknownLot(code.to_string()))?;
        Ok(LotIdentifier::parse(
            &stored.canonical_code,
            stored.format_version,
        )?)
    }

    /// Counter state for a scope key.
    pub async fn scope_counter(&self, scope_key: &str) -> Result<Option<ScopeCounter>, DbError> {
        self.allocator.last_issued(scope_key).await
    }
}
