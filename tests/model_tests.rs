// Unit tests for the core model types: role sets, pagination
// normalization, and password hashing.

use shoplist_api::auth::{hash_password, verify_password};
use shoplist_api::models::{Pagination, Role, RoleSet};

#[test]
fn test_role_set_grants_on_any_overlap() {
    let roles = RoleSet::new(vec![Role::User, Role::SuperUser]);

    assert!(roles.has_any(&[Role::SuperUser]));
    assert!(roles.has_any(&[Role::Admin, Role::SuperUser]));
    assert!(!roles.has_any(&[Role::Admin]));
}

#[test]
fn test_role_set_empty_requirement_always_grants() {
    let plain = RoleSet::new(vec![Role::User]);
    let nobody = RoleSet::new(vec![]);

    assert!(plain.has_any(&[]));
    assert!(nobody.has_any(&[]));
}

#[test]
fn test_role_set_from_names_skips_unknown_entries() {
    let roles = RoleSet::from_names(["admin", "moderator", "user"]);

    assert!(roles.contains(Role::Admin));
    assert!(roles.contains(Role::User));
    assert!(!roles.contains(Role::SuperUser));
    assert_eq!(roles.to_names(), vec!["admin", "user"]);
}

#[test]
fn test_role_set_deduplicates() {
    let roles = RoleSet::new(vec![Role::User, Role::User, Role::Admin]);
    assert_eq!(roles.to_names(), vec!["user", "admin"]);
}

#[test]
fn test_role_serializes_camel_case() {
    assert_eq!(
        serde_json::to_string(&Role::SuperUser).unwrap(),
        "\"superUser\""
    );
    assert_eq!(Role::SuperUser.as_str(), "superUser");
    assert_eq!(Role::parse("superUser"), Some(Role::SuperUser));
    assert_eq!(Role::parse("superuser"), None);
}

#[test]
fn test_pagination_defaults() {
    let page = Pagination::clamped(None, None);
    assert_eq!(page.limit, 10);
    assert_eq!(page.offset, 0);
}

#[test]
fn test_pagination_clamps_out_of_range_values() {
    let page = Pagination::clamped(Some(0), Some(-5));
    assert_eq!(page.limit, 1);
    assert_eq!(page.offset, 0);

    let page = Pagination::clamped(Some(-3), None);
    assert_eq!(page.limit, 1);
}

#[test]
fn test_pagination_passes_valid_values_through() {
    let page = Pagination::clamped(Some(25), Some(50));
    assert_eq!(page.limit, 25);
    assert_eq!(page.offset, 50);
}

#[test]
fn test_password_hash_and_verify_roundtrip() {
    let hash = hash_password("correct horse battery staple").unwrap();

    // PHC string format, never the plaintext.
    assert!(hash.starts_with("$argon2"));
    assert!(!hash.contains("correct horse"));

    assert!(verify_password("correct horse battery staple", &hash));
    assert!(!verify_password("wrong password", &hash));
}

#[test]
fn test_same_password_hashes_differently_per_salt() {
    let first = hash_password("hunter22").unwrap();
    let second = hash_password("hunter22").unwrap();

    assert_ne!(first, second);
    assert!(verify_password("hunter22", &first));
    assert!(verify_password("hunter22", &second));
}

#[test]
fn test_verify_rejects_malformed_stored_hash() {
    assert!(!verify_password("anything", "not-a-phc-string"));
    assert!(!verify_password("anything", ""));
}
