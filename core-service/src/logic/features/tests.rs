//! Sample validation tests

use serde_json::{json, Map, Value};

use super::{validate, Provenance, RawSample, SampleError, SampleOrigin, Variant};

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("test fixture must be an object"),
    }
}

#[test]
fn test_validate_extracts_required_features_only() {
    let raw = RawSample::manual(fields(json!({
        "inter_arrival_time": 0.02,
        "dns_rate": 5,
        "label": "ignored"
    })));

    let features = validate(&raw, Variant::Dns.required_features()).unwrap();

    assert_eq!(features.len(), 2);
    assert_eq!(features.get("inter_arrival_time"), Some(0.02));
    assert_eq!(features.get("dns_rate"), Some(5.0));
    assert_eq!(features.get("label"), None);
}

#[test]
fn test_missing_feature_is_rejected() {
    let raw = RawSample::manual(fields(json!({ "inter_arrival_time": 0.02 })));

    let err = validate(&raw, Variant::Dns.required_features()).unwrap_err();
    assert_eq!(err, SampleError::Missing("dns_rate".to_string()));
}

#[test]
fn test_null_feature_is_not_coerced_to_zero() {
    let raw = RawSample::manual(fields(json!({
        "inter_arrival_time": null,
        "dns_rate": 5.0
    })));

    let err = validate(&raw, Variant::Dns.required_features()).unwrap_err();
    assert_eq!(err, SampleError::Null("inter_arrival_time".to_string()));
    assert_eq!(err.field(), "inter_arrival_time");
}

#[test]
fn test_string_feature_is_rejected() {
    let raw = RawSample::manual(fields(json!({
        "inter_arrival_time": 0.01,
        "packet_length": "1400"
    })));

    let err = validate(&raw, Variant::Dos.required_features()).unwrap_err();
    assert!(matches!(err, SampleError::NotNumeric(ref f) if f == "packet_length"));
}

#[test]
fn test_live_sample_drops_empty_provenance() {
    let raw = RawSample::live(Map::new(), None, Some(Provenance::default()));
    assert_eq!(raw.origin, SampleOrigin::Live);
    assert!(raw.provenance.is_none());

    let tagged = Provenance {
        source_ip: Some("10.0.0.5".to_string()),
        ..Default::default()
    };
    let raw = RawSample::live(Map::new(), None, Some(tagged.clone()));
    assert_eq!(raw.provenance, Some(tagged));
}

#[test]
fn test_variant_parsing() {
    assert_eq!("DNS".parse::<Variant>().unwrap(), Variant::Dns);
    assert_eq!(" dos ".parse::<Variant>().unwrap(), Variant::Dos);
    assert!("icmp".parse::<Variant>().is_err());

    assert_eq!(Variant::Dns.journal_table(), "anomalies");
    assert_eq!(Variant::Dos.journal_table(), "dos_anomalies");
    assert_eq!(Variant::Dos.env_prefix(), "DOS_");
}
