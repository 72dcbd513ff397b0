use std::fs;

use gateway::{SessionIdentity, StoredIdentity};
use logisim_core::model::AccountId;

#[test]
fn stored_identity_follows_session_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.json");
    let identity = StoredIdentity::new(&path);

    assert_eq!(identity.current_account_id(), None);

    fs::write(
        &path,
        r#"{"currentUser": {"id": "acc-42"}, "accessToken": "secret"}"#,
    )
    .unwrap();
    assert_eq!(identity.current_account_id(), Some(AccountId::new("acc-42")));
    assert_eq!(identity.access_token().as_deref(), Some("secret"));

    fs::write(&path, r#"{"currentUser": null}"#).unwrap();
    assert_eq!(identity.current_account_id(), None);
    assert_eq!(identity.access_token(), None);
}

#[test]
fn corrupt_session_file_means_signed_out() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.json");
    fs::write(&path, "{not json").unwrap();

    let identity = StoredIdentity::new(&path);
    assert_eq!(identity.current_account_id(), None);
}
