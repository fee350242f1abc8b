use std::str::FromStr;

use super::id::*;

#[test]
fn test_entry_id_display() {
    assert_eq!(EntryId(42).to_string(), "42");
}

#[test]
fn test_entry_id_from_str() {
    assert_eq!(EntryId::from_str(" 7 ").unwrap(), EntryId(7));
    assert!(EntryId::from_str("seven").is_err());
}

#[test]
fn test_entry_id_serializes_as_number() {
    assert_eq!(serde_json::to_string(&EntryId(3)).unwrap(), "3");
}

#[test]
fn test_user_id_roundtrip() {
    let id = UserId::new("auth0|abc");
    assert_eq!(id.as_str(), "auth0|abc");
    assert_eq!(id.to_string(), "auth0|abc");
    assert_eq!(id.clone().into_inner(), "auth0|abc".to_string());
}

#[test]
fn test_user_id_serializes_transparently() {
    let json = serde_json::to_string(&UserId::new("u-1")).unwrap();
    assert_eq!(json, "\"u-1\"");
}
