use chrono::NaiveDate;
use lotline_codec::{CodeKind, DecodeError, FormatVersion, ModelCodeMap};
use lotline_service::allocator::AllocatorConfig;
use lotline_service::db::Stores;
use lotline_service::service::{IdentifierService, MintError, VersionSource};

fn models() -> ModelCodeMap {
    ModelCodeMap::from_entries([("PSA10", "PSA"), ("QRX10", "QRX"), ("KR0 Mini", "KR0")]).unwrap()
}

fn service(active: FormatVersion) -> IdentifierService {
    IdentifierService::from_stores(
        &Stores::memory(),
        AllocatorConfig::default(),
        models(),
        active,
    )
}

fn nov_15() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 15).unwrap()
}

#[tokio::test]
async fn test_mint_lot_current_format() {
    let service = service(FormatVersion::V2);

    let lot = service.mint_lot("KR001", "PSA10", nov_15()).await.unwrap();
    assert_eq!(lot.code(), "KR01PSA2511001");
    assert_eq!(lot.version(), FormatVersion::V2);
    assert_eq!(lot.sequence(), 1);
    assert_eq!(
        FormatVersion::V2.display(lot.code()).unwrap(),
        "KR01-PSA-2511-001"
    );

    let next = service.mint_lot("KR001", "PSA10", nov_15()).await.unwrap();
    assert_eq!(next.code(), "KR01PSA2511002");

    let counter = service
        .scope_counter("lot:KR001:PSA:2025-11")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counter.last_issued, 2);
}

#[tokio::test]
async fn test_mint_lot_under_each_compact_format() {
    let v1 = service(FormatVersion::V1);
    assert_eq!(
        v1.mint_lot("KR001", "PSA10", nov_15()).await.unwrap().code(),
        "PSA01251101"
    );

    let v3 = service(FormatVersion::V3);
    assert_eq!(
        v3.mint_lot("KR001", "PSA10", nov_15()).await.unwrap().code(),
        "KR01PSA251101"
    );
}

#[tokio::test]
async fn test_mint_lot_unknown_model() {
    let service = service(FormatVersion::V2);
    match service.mint_lot("KR001", "ZZZ99", nov_15()).await {
        Err(MintError::UnknownModel(name)) => assert_eq!(name, "ZZZ99"),
        other => panic!("expected unknown model, got {other:?}"),
    }
}

#[tokio::test]
async fn test_mint_lot_invalid_line() {
    let service = service(FormatVersion::V2);
    assert!(matches!(
        service.mint_lot("KR01", "PSA10", nov_15()).await,
        Err(MintError::InvalidLine(_))
    ));
}

#[tokio::test]
async fn test_unencodable_line_spends_no_sequence() {
    // V1 has a 2-digit line slot.
    let service = service(FormatVersion::V1);
    assert!(matches!(
        service.mint_lot("KR100", "PSA10", nov_15()).await,
        Err(MintError::Codec(_))
    ));
    assert!(service
        .scope_counter("lot:v1:100:PSA:2025-11")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_countryless_format_shares_scope_across_countries() {
    let service = service(FormatVersion::V1);

    let korea = service.mint_lot("KR001", "PSA10", nov_15()).await.unwrap();
    let states = service.mint_lot("US001", "PSA10", nov_15()).await.unwrap();
    assert_eq!(korea.code(), "PSA01251101");
    assert_eq!(states.code(), "PSA01251102");

    let counter = service
        .scope_counter("lot:v1:01:PSA:2025-11")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counter.last_issued, 2);
    assert!(service
        .scope_counter("lot:US001:PSA:2025-11")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_two_digit_sequence_exhausts_at_99() {
    let service = service(FormatVersion::V1);
    for _ in 0..99 {
        service.mint_lot("KR001", "PSA10", nov_15()).await.unwrap();
    }

    for _ in 0..3 {
        match service.mint_lot("KR001", "PSA10", nov_15()).await {
            Err(MintError::Exhausted { scope_key }) => {
                assert_eq!(scope_key, "lot:v1:01:PSA:2025-11")
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    let counter = service
        .scope_counter("lot:v1:01:PSA:2025-11")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counter.last_issued, 99);
}

#[tokio::test]
async fn test_retired_format_cannot_mint() {
    let service = service(FormatVersion::V0);
    assert!(matches!(
        service.mint_lot("KR001", "PSA10", nov_15()).await,
        Err(MintError::RetiredFormat(FormatVersion::V0))
    ));
}

#[tokio::test]
async fn test_mint_serial_uses_lot_format() {
    let service = service(FormatVersion::V2);
    let lot = service.mint_lot("KR001", "PSA10", nov_15()).await.unwrap();

    let first = service.mint_serial(&lot).await.unwrap();
    let second = service.mint_serial(&lot).await.unwrap();
    assert_eq!(first.code(), "KR01PSA2511001001");
    assert_eq!(second.code(), "KR01PSA2511001002");
    assert_eq!(first.version(), lot.version());
    assert_eq!(first.lot_code(), lot.code());
    assert!(first.code().starts_with(lot.code()));

    let counter = service
        .scope_counter("serial:v2:KR01PSA2511001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counter.last_issued, 2);
}

#[tokio::test]
async fn test_lot_by_code() {
    let service = service(FormatVersion::V2);
    let lot = service.mint_lot("KR001", "PSA10", nov_15()).await.unwrap();
    let serial = service.mint_serial(&lot).await.unwrap();

    assert_eq!(service.lot_by_code(lot.code()).await.unwrap(), lot);
    assert!(matches!(
        service.lot_by_code(serial.code()).await,
        Err(MintError::UnknownLot(_))
    ));
    assert!(matches!(
        service.lot_by_code("KR01PSA2511999").await,
        Err(MintError::UnknownLot(_))
    ));
}

#[tokio::test]
async fn test_lookup_minted_lot() {
    let service = service(FormatVersion::V2);
    service.mint_lot("KR001", "PSA10", nov_15()).await.unwrap();

    let report = service.lookup("KR01PSA2511001", None).await.unwrap();
    assert!(report.valid);
    assert_eq!(report.source, Some(VersionSource::Stored));
    assert_eq!(report.formatted.as_deref(), Some("KR01-PSA-2511-001"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["serial_number"], "KR01PSA2511001");
    assert_eq!(json["version"], 2);
    assert_eq!(json["production_date"], "2025-11-01T00:00:00");
    assert_eq!(
        json["components"],
        serde_json::json!({
            "country_code": "KR",
            "line_number": "01",
            "model_code": "PSA",
            "production_month": "2511",
            "sequence": "001",
        })
    );
}

#[tokio::test]
async fn test_lookup_legacy_serial() {
    let service = service(FormatVersion::V2);
    let report = service
        .lookup("PSA10-KR001-251110D-001-0001", None)
        .await
        .unwrap();

    assert!(report.valid);
    assert_eq!(report.version, Some(FormatVersion::V0));
    assert_eq!(report.kind, Some(CodeKind::Serial));
    assert_eq!(report.source, Some(VersionSource::Detected));
    assert_eq!(report.lot_code.as_deref(), Some("PSA10-KR001-251110D-001"));
    assert_eq!(
        report.formatted.as_deref(),
        Some("PSA10-KR001-251110D-001-0001")
    );

    let components = report.components.unwrap();
    assert_eq!(components.model_code, "PSA10");
    assert_eq!(components.production_day.as_deref(), Some("10"));
    assert_eq!(components.shift.as_deref(), Some("D"));
    assert_eq!(components.unit_sequence.as_deref(), Some("0001"));
}

#[tokio::test]
async fn test_lookup_invalid_never_errors() {
    let service = service(FormatVersion::V2);
    for code in ["", "KR01-PSA-2511-001", "KR01PSA2513001", "not a code"] {
        let report = service.lookup(code, None).await.unwrap();
        assert!(!report.valid, "{code} should be invalid");
        assert!(report.error.is_some());
        assert!(report.components.is_none());
        assert_eq!(report.serial_number, code);
    }
}

#[tokio::test]
async fn test_stored_tag_resolves_overlap() {
    // The first V1 Serial of model KR0 on line 01 is also a well-formed V2 LOT.
    let service = service(FormatVersion::V1);
    let lot = service.mint_lot("KR001", "KR0 Mini", nov_15()).await.unwrap();
    let serial = service.mint_serial(&lot).await.unwrap();
    assert_eq!(serial.code(), "KR001251101001");

    assert!(matches!(
        service.decode(serial.code(), None),
        Err(DecodeError::Ambiguous { .. })
    ));

    let report = service.lookup(serial.code(), None).await.unwrap();
    assert!(report.valid);
    assert_eq!(report.version, Some(FormatVersion::V1));
    assert_eq!(report.source, Some(VersionSource::Stored));
    assert_eq!(report.lot_code.as_deref(), Some("KR001251101"));
}

#[tokio::test]
async fn test_untagged_overlap_reports_candidates() {
    let service = service(FormatVersion::V2);
    let report = service.lookup("KR001251101001", None).await.unwrap();
    assert!(!report.valid);
    assert_eq!(report.candidates, vec![FormatVersion::V1, FormatVersion::V2]);

    let forced = service
        .lookup("KR001251101001", Some(FormatVersion::V2))
        .await
        .unwrap();
    assert!(forced.valid);
    assert_eq!(forced.kind, Some(CodeKind::Lot));
    assert_eq!(forced.source, Some(VersionSource::Explicit));
}
