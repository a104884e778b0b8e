use serde_json::json;

use super::*;

fn norm(raw: Value) -> UserProfile {
    normalize(raw).unwrap().unwrap()
}

#[test]
fn null_normalizes_to_none() {
    assert!(normalize(Value::Null).unwrap().is_none());
}

#[test]
fn non_objects_are_rejected() {
    assert!(matches!(normalize(json!("alice")), Err(ProfileError::UnrecognizedShape("string"))));
    assert!(matches!(normalize(json!([1])), Err(ProfileError::UnrecognizedShape("array"))));
}

#[test]
fn username_falls_back_to_user_name_then_nick_name() {
    assert_eq!(norm(json!({ "userName": "a", "nickName": "b" })).username(), Some("a"));
    assert_eq!(norm(json!({ "nickName": "b" })).username(), Some("b"));
    assert_eq!(norm(json!({ "username": "x", "userName": "a" })).username(), Some("x"));
    assert!(norm(json!({ "email": "e" })).get("username").is_none());
}

#[test]
fn present_but_null_alias_still_wins() {
    let p = norm(json!({ "userName": null, "nickName": "b" }));
    assert_eq!(p.get("username"), Some(&Value::Null));
}

#[test]
fn explicit_is_admin_is_kept_verbatim() {
    let p = norm(json!({ "isAdmin": false, "role": 0, "id": 1 }));
    assert_eq!(p.get("isAdmin"), Some(&json!(false)));
    let p = norm(json!({ "isAdmin": "yes" }));
    assert_eq!(p.get("isAdmin"), Some(&json!("yes")));
    assert!(!p.is_admin());
}

#[test]
fn role_decides_admin_before_id() {
    assert!(norm(json!({ "role": 0, "id": 7 })).is_admin());
    assert!(!norm(json!({ "role": 1, "id": 1 })).is_admin());
    assert_eq!(norm(json!({ "role": "0" })).get("isAdmin"), Some(&json!(false)));
}

#[test]
fn id_one_is_admin_without_role() {
    assert!(norm(json!({ "id": 1 })).is_admin());
    let p = norm(json!({ "id": 2 }));
    assert!(p.get("isAdmin").is_none());
    assert!(!p.is_admin());
}

#[test]
fn normalize_is_idempotent() {
    let samples = [
        json!({ "userName": "a", "role": 0 }),
        json!({ "nickName": "n", "id": 1 }),
        json!({ "id": 3, "extra": { "deep": true } }),
        json!({ "username": "u", "isAdmin": true }),
    ];
    for raw in samples {
        let once = norm(raw);
        let twice = norm(once.clone().into_value());
        assert_eq!(once, twice);
    }
}

#[test]
fn unknown_fields_pass_through() {
    let p = norm(json!({ "id": 9, "avatar": "a.png", "stats": [1, 2] }));
    assert_eq!(p.get("avatar"), Some(&json!("a.png")));
    assert_eq!(p.get("stats"), Some(&json!([1, 2])));
}

#[test]
fn nested_payload_uses_user_field() {
    let payload = AuthPayload::from_login(json!({ "token": "t", "user": { "userName": "a", "id": 1 } })).unwrap();
    assert!(matches!(payload, AuthPayload::Nested { .. }));
    let (token, profile) = payload.into_session_parts().unwrap();
    assert_eq!(token, "t");
    assert_eq!(profile.username(), Some("a"));
    assert!(profile.is_admin());
    assert!(profile.get("token").is_none());
}

#[test]
fn flat_payload_passes_whole_object_through() {
    let payload = AuthPayload::from_login(json!({ "token": "t", "nickName": "n", "role": 1, "user": null })).unwrap();
    assert!(matches!(payload, AuthPayload::Flat { .. }));
    let (token, profile) = payload.into_session_parts().unwrap();
    assert_eq!(token, "t");
    assert_eq!(profile.username(), Some("n"));
    assert_eq!(profile.get("token"), Some(&json!("t")));
    assert_eq!(profile.get("user"), Some(&Value::Null));
}

#[test]
fn oauth_callback_strips_token_from_profile() {
    let payload = AuthPayload::from_oauth_callback(json!({ "token": "gh", "userName": "octo", "id": 5 })).unwrap();
    assert_eq!(payload.token(), "gh");
    let (token, profile) = payload.into_session_parts().unwrap();
    assert_eq!(token, "gh");
    assert!(profile.get("token").is_none());
    assert_eq!(profile.username(), Some("octo"));
}

#[test]
fn missing_or_non_string_token_is_rejected() {
    assert!(matches!(AuthPayload::from_login(json!({ "user": {} })), Err(ProfileError::MissingToken)));
    assert!(matches!(AuthPayload::from_login(json!({ "token": 42 })), Err(ProfileError::MissingToken)));
    assert!(matches!(AuthPayload::from_oauth_callback(Value::Null), Err(ProfileError::UnrecognizedShape("null"))));
}

#[test]
fn nested_user_that_is_not_an_object_is_rejected() {
    let payload = AuthPayload::from_login(json!({ "token": "t", "user": "alice" })).unwrap();
    assert!(matches!(payload.into_session_parts(), Err(ProfileError::UnrecognizedShape("string"))));
}
