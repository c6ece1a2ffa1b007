//! JSON subsystem conformance tests.
//!
//! Covers the document grammar, the lexer's token rules, the accessor
//! surface and both entry points (in-memory and file).

use opensk::json::{parse_file, parse_str, parse_str_with, JsonType, JsonValue, Limits};
use opensk::{DebugAllocator, ErrorCode};
use std::io::Write;

/// `"\uXXXX"` as JSON text.
fn u_escape(hex: &str) -> String {
    format!("{{\"s\": \"{}u{}\"}}", '\\', hex)
}

// ============================================================================
// Document grammar
// ============================================================================

#[test]
fn document_round_trip_structure() {
    let doc = parse_str(
        r#"{
            "name": "foo",
            "count": 3,
            "ratio": -12.5e2,
            "flags": [true, false, null],
            "nested": { "inner": [] }
        }"#,
    )
    .unwrap();

    assert_eq!(doc.len(), 5);
    assert_eq!(doc.get("name").unwrap().as_str(), "foo");
    assert_eq!(doc.get("count").unwrap().as_number(), 3.0);
    assert_eq!(doc.get("ratio").unwrap().as_number(), -1250.0);

    let flags = doc.get("flags").unwrap();
    assert_eq!(flags.json_type(), JsonType::Array);
    assert_eq!(flags.array_len(), 3);
    assert_eq!(flags.get_index(0), Some(&JsonValue::Bool(true)));
    assert_eq!(flags.get_index(2).unwrap().json_type(), JsonType::Null);
    assert_eq!(flags.get_index(3), None);

    let nested = doc.get("nested").unwrap().as_object();
    assert_eq!(nested.get("inner").unwrap().array_len(), 0);
}

#[test]
fn document_properties_keep_insertion_order() {
    let doc = parse_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
    let keys: Vec<&str> = doc.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, ["z", "a", "m"]);
    assert_eq!(doc.property(1).map(|(k, _)| k), Some("a"));
    assert!(doc.property(3).is_none());
}

#[test]
fn document_duplicate_key_replaces_in_place() {
    let doc = parse_str(r#"{"a": 1, "b": 2, "a": "three"}"#).unwrap();
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.property(0).map(|(k, _)| k), Some("a"));
    assert_eq!(doc.get("a").unwrap().as_str(), "three");
}

#[test]
fn document_must_be_object() {
    for text in ["[1, 2]", "\"text\"", "42", "null", ""] {
        let result = parse_str(text);
        assert!(
            matches!(result, Err(ErrorCode::UnexpectedToken { .. })),
            "{text:?} -> {result:?}"
        );
    }
}

#[test]
fn document_trailing_content_rejected() {
    assert!(matches!(
        parse_str(r#"{"a": 1} {"b": 2}"#),
        Err(ErrorCode::UnexpectedToken { .. })
    ));
}

#[test]
fn document_malformed_structure_rejected() {
    for text in [
        r#"{"a" 1}"#,
        r#"{"a": 1,}"#,
        r#"{"a": [1,]}"#,
        r#"{"a": [1 2]}"#,
        r#"{1: 2}"#,
        r#"{"a": 1"#,
        r#"{"a": @}"#,
    ] {
        let result = parse_str(text);
        assert!(
            matches!(result, Err(ErrorCode::UnexpectedToken { .. })),
            "{text:?} -> {result:?}"
        );
    }
}

#[test]
fn document_comments_are_whitespace() {
    let doc = parse_str(
        "// leading\n{ /* a */ \"a\" /* b */ : // c\n 1 /* d */ }\n// trailing",
    )
    .unwrap();
    assert_eq!(doc.get("a").unwrap().as_number(), 1.0);
}

// ============================================================================
// Tokens
// ============================================================================

#[test]
fn string_escapes_decode() {
    let doc = parse_str(r#"{"s": "q\"b\\s\/n\nt\tr\rb\bf\f"}"#).unwrap();
    assert_eq!(
        doc.get("s").unwrap().as_str(),
        "q\"b\\s/n\nt\tr\rb\u{8}f\u{c}"
    );
}

#[test]
fn string_unicode_escape_ascii_only() {
    let doc = parse_str(&u_escape("0041")).unwrap();
    assert_eq!(doc.get("s").unwrap().as_str(), "A");

    assert_eq!(
        parse_str(&u_escape("00FF")),
        Err(ErrorCode::UnsupportedEscape(0x00FF))
    );
    assert_eq!(
        parse_str(&u_escape("20AC")),
        Err(ErrorCode::UnsupportedEscape(0x20AC))
    );
}

#[test]
fn string_invalid_escape_rejected() {
    assert_eq!(
        parse_str(r#"{"s": "\x41"}"#),
        Err(ErrorCode::InvalidEscapeCode(b'x'))
    );
}

#[test]
fn string_utf8_passes_through() {
    let doc = parse_str(r#"{"s": "héllo ✓"}"#).unwrap();
    assert_eq!(doc.get("s").unwrap().as_str(), "héllo ✓");
}

#[test]
fn numbers_decode() {
    let doc = parse_str(r#"{"a": [0, -0, 10, 0.5, 1.25e2, 7e+1], "small": 25E-1}"#).unwrap();
    let values: Vec<f64> = doc
        .get("a")
        .unwrap()
        .as_array()
        .iter()
        .map(JsonValue::as_number)
        .collect();
    assert_eq!(values, [0.0, 0.0, 10.0, 0.5, 125.0, 70.0]);
    assert!((doc.get("small").unwrap().as_number() - 2.5).abs() < 1e-12);
}

#[test]
fn numbers_malformed_rejected() {
    for bad in ["01", "-", "1.", "1.e5", "1e", "1e+", "-a"] {
        let text = format!("{{\"n\": {bad}}}");
        assert_eq!(
            parse_str(&text),
            Err(ErrorCode::InvalidNumberFormat),
            "{bad}"
        );
    }
}

#[test]
fn keywords_case_sensitive() {
    assert_eq!(
        parse_str(r#"{"k": True}"#),
        Err(ErrorCode::InvalidKeyword("True".into()))
    );
    assert_eq!(
        parse_str(r#"{"k": nulls}"#),
        Err(ErrorCode::InvalidKeyword("nulls".into()))
    );
}

// ============================================================================
// Accessors
// ============================================================================

#[test]
fn try_casts_report_mismatch() {
    let doc = parse_str(r#"{"n": 4, "s": "x", "b": false, "a": [], "o": {}}"#).unwrap();
    let n = doc.get("n").unwrap();
    assert_eq!(n.try_as_number(), Some(4.0));
    assert_eq!(n.try_as_str(), None);
    assert_eq!(n.try_as_bool(), None);
    assert!(n.try_as_array().is_none());
    assert!(n.try_as_object().is_none());

    assert_eq!(doc.get("b").unwrap().try_as_bool(), Some(false));
    assert!(doc.get("a").unwrap().try_as_array().is_some());
    assert!(doc.get("o").unwrap().try_as_object().is_some());
}

#[test]
fn unchecked_casts_default_on_mismatch() {
    let doc = parse_str(r#"{"s": "x"}"#).unwrap();
    let s = doc.get("s").unwrap();
    assert_eq!(s.as_number(), 0.0);
    assert!(!s.as_bool());
    assert!(s.as_array().is_empty());
    assert!(s.as_object().is_empty());
    assert_eq!(s.array_len(), 0);
    assert_eq!(JsonValue::Null.as_str(), "");
}

// ============================================================================
// Limits and allocation
// ============================================================================

#[test]
fn limits_nesting_depth() {
    let limits = Limits {
        max_nesting_depth: 2,
        ..Limits::manifest()
    };
    let alloc = opensk::DefaultAllocator;
    assert!(parse_str_with(r#"{"a": {"b": 1}}"#, &alloc, limits).is_ok());
    assert!(matches!(
        parse_str_with(r#"{"a": {"b": [1]}}"#, &alloc, limits),
        Err(ErrorCode::NestingTooDeep(..))
    ));
}

#[test]
fn limits_string_length() {
    let limits = Limits {
        max_string_length: 8,
        ..Limits::manifest()
    };
    let alloc = opensk::DefaultAllocator;
    assert!(parse_str_with(r#"{"k": "12345678"}"#, &alloc, limits).is_ok());
    assert!(matches!(
        parse_str_with(r#"{"k": "123456789"}"#, &alloc, limits),
        Err(ErrorCode::StringTooLong(..))
    ));
}

#[test]
fn allocation_failure_propagates() {
    let text = r#"{"a": [1, 2, 3], "b": {"c": "text"}}"#;
    let counting = DebugAllocator::new();
    parse_str_with(text, &counting, Limits::manifest()).unwrap();
    let requests = counting.requests();
    assert!(requests > 0);

    for n in 0..requests {
        let failing = DebugAllocator::failing_at(n);
        assert_eq!(
            parse_str_with(text, &failing, Limits::manifest()),
            Err(ErrorCode::OutOfHostMemory),
            "failure at request {n}"
        );
    }
}

// ============================================================================
// File source
// ============================================================================

#[test]
fn file_parse() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"drivers": [], "layer": {{}}}}"#).unwrap();
    let doc = parse_file(file.path()).unwrap();
    assert_eq!(doc.len(), 2);
}

#[test]
fn file_larger_than_one_block() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let long = "x".repeat(3000);
    write!(file, "{{\"pad\": \"{long}\", \"end\": true}}").unwrap();
    let doc = parse_file(file.path()).unwrap();
    assert_eq!(doc.get("pad").unwrap().as_str().len(), 3000);
    assert!(doc.get("end").unwrap().as_bool());
}

#[test]
fn file_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let result = parse_file(dir.path().join("missing.json"));
    assert!(matches!(result, Err(ErrorCode::FileNotFound(_))));
}

#[test]
fn file_directory_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let result = parse_file(dir.path());
    assert!(matches!(result, Err(ErrorCode::UnsupportedFileSource(_))));
}
