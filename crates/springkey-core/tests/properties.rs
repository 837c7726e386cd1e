//! Property-Based Tests for Request and Envelope Invariants
//!
//! These tests verify that the request/response surface holds for arbitrary
//! inputs:
//! 1. PARSING: arbitrary bytes never panic, and yield a message or a bad request
//! 2. KEY IDS: every key id renders as 16 lowercase hex characters
//! 3. ENVELOPE: any string content round-trips through the JSON envelope
//! 4. CORRELATION: interaction ids are 32 lowercase hex characters
//!
//! Uses proptest for property-based testing with arbitrary inputs.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::Value;
use springkey_core::{
    derive_interaction_id, Action, ActionEngine, ActionError, ErrorKind, Field, KeyId, Payload,
    ProtocolMessage, Response,
};

fn is_lower_hex(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

// =============================================================================
// PARSING: never panics, only ever a message or a bad request
// =============================================================================

proptest! {
    #[test]
    fn prop_parse_arbitrary_bytes(raw in proptest::collection::vec(any::<u8>(), 0..256)) {
        match ProtocolMessage::parse(&raw) {
            Ok(_) => {}
            Err(err) => prop_assert_eq!(err.kind(), ErrorKind::BadRequest),
        }
    }

    #[test]
    fn prop_string_members_survive_parsing(
        name in "[^\\x00]{0,40}",
        email in "[a-z]{1,10}@[a-z]{1,10}\\.com",
    ) {
        let raw = serde_json::json!({ "name": name, "email": email }).to_string();
        let msg = ProtocolMessage::parse(raw.as_bytes()).unwrap();

        let expected = if name.is_empty() { None } else { Some(name.as_str()) };
        prop_assert_eq!(msg.field(Field::Name), expected);
        prop_assert_eq!(msg.field(Field::Email), Some(email.as_str()));
    }

    #[test]
    fn prop_non_object_top_level_is_bad_request(n in any::<i64>(), s in ".{0,20}") {
        for raw in [
            serde_json::json!(n).to_string(),
            serde_json::json!(s).to_string(),
            serde_json::json!([s]).to_string(),
        ] {
            let err = ProtocolMessage::parse(raw.as_bytes()).unwrap_err();
            prop_assert_eq!(err, ActionError::MALFORMED_REQUEST);
        }
    }

    /// Arbitrary armor text never panics an action, it only fails
    #[test]
    fn prop_expand_garbage_is_codec_error(text in ".{1,200}") {
        let msg = ProtocolMessage::builder().public_key(text).build();
        let response = ActionEngine::default().respond(Action::Expand, &msg);
        prop_assert_eq!(response.error().map(|e| e.kind()), Some(ErrorKind::Codec));
    }
}

// =============================================================================
// KEY IDS: canonical 16-character lowercase hex
// =============================================================================

proptest! {
    #[test]
    fn prop_key_id_rendering(id in any::<u64>()) {
        let key_id = KeyId::new(id);
        let rendered = key_id.long_id();

        prop_assert_eq!(rendered.len(), 16);
        prop_assert!(is_lower_hex(&rendered));
        prop_assert_eq!(rendered.parse::<KeyId>().unwrap(), key_id);
        prop_assert_eq!(KeyId::from_bytes(&key_id.to_bytes()).unwrap(), key_id);
    }
}

// =============================================================================
// ENVELOPE: content is escaped, shape is fixed
// =============================================================================

proptest! {
    #[test]
    fn prop_certificate_fields_escaped(
        name in ".{0,40}",
        email in ".{0,40}",
        ids in proptest::collection::vec(any::<u64>(), 0..5),
    ) {
        let sigs: Vec<KeyId> = ids.iter().copied().map(KeyId::new).collect();
        let response = Response::Success(Payload::Certificate {
            name: name.clone(),
            email: email.clone(),
            keyid: KeyId::new(7),
            sigs: sigs.clone(),
        });

        let value: Value = serde_json::from_str(&response.to_json()).unwrap();
        prop_assert_eq!(&value["result"], "ok");

        let body = value["response"].as_object().unwrap();
        prop_assert_eq!(body.len(), 4);
        prop_assert_eq!(&body["name"], &Value::from(name));
        prop_assert_eq!(&body["email"], &Value::from(email));
        prop_assert_eq!(body["sigs"].as_array().unwrap().len(), sigs.len());
    }
}

// =============================================================================
// CORRELATION: interaction id shape
// =============================================================================

proptest! {
    #[test]
    fn prop_interaction_id_shape(secs in 0i64..4_000_000_000, nonce in any::<u64>()) {
        let at = Utc.timestamp_opt(secs, 0).unwrap();
        let id = derive_interaction_id(at, nonce);

        prop_assert_eq!(id.as_str().len(), 32);
        prop_assert!(is_lower_hex(id.as_str()));
        prop_assert_eq!(derive_interaction_id(at, nonce), id);
    }
}
