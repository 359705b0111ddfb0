use super::*;
use crate::state::storage::MemoryStorage;

fn profile(name: &str, user_type: &str) -> UserInfo {
    UserInfo {
        id: Some(1),
        username: Some(name.to_owned()),
        user_type: Some(user_type.to_owned()),
        ..UserInfo::default()
    }
}

fn fresh() -> (Arc<MemoryStorage>, Session) {
    let storage = Arc::new(MemoryStorage::new());
    let session = Session::restore(storage.clone());
    (storage, session)
}

#[test]
fn empty_storage_restores_unauthenticated() {
    let (_, session) = fresh();
    let snap = session.snapshot();
    assert!(!snap.is_logged_in());
    assert!(snap.profile.is_none());
    assert!(!session.is_admin());
}

#[test]
fn set_token_persists_and_bumps_generation() {
    let (storage, session) = fresh();
    let generation = session.set_token("tok-1");
    assert_eq!(generation, 1);
    assert_eq!(session.token().as_deref(), Some("tok-1"));
    assert_eq!(storage.get_item(TOKEN_KEY).as_deref(), Some("tok-1"));
    assert_eq!(session.bearer(), Some(("tok-1".to_owned(), 1)));
}

#[test]
fn set_empty_token_logs_out() {
    let (_, session) = fresh();
    session.set_token("tok-1");
    session.set_token("");
    assert!(!session.is_logged_in());
}

#[test]
fn apply_profile_replaces_wholesale_and_persists() {
    let (storage, session) = fresh();
    let generation = session.set_token("tok-1");
    assert!(session.apply_profile(generation, Some(profile("ann", "ADMIN"))));
    assert!(session.is_admin());
    assert!(storage.get_item(USER_INFO_KEY).unwrap().contains("ann"));

    assert!(session.apply_profile(generation, Some(UserInfo { username: Some("bo".to_owned()), ..UserInfo::default() })));
    let current = session.profile().unwrap();
    assert_eq!(current.username.as_deref(), Some("bo"));
    assert!(current.user_type.is_none());
}

#[test]
fn failed_fetch_clears_profile_but_keeps_token() {
    let (storage, session) = fresh();
    let generation = session.set_token("tok-1");
    session.apply_profile(generation, Some(profile("ann", "USER")));
    assert!(session.apply_profile(generation, None));
    assert_eq!(session.token().as_deref(), Some("tok-1"));
    assert!(session.profile().is_none());
    assert!(storage.get_item(USER_INFO_KEY).is_none());
}

#[test]
fn stale_profile_after_logout_is_ignored() {
    let (storage, session) = fresh();
    let generation = session.set_token("tok-1");
    session.logout();
    assert!(!session.apply_profile(generation, Some(profile("ann", "USER"))));
    assert!(session.profile().is_none());
    assert!(storage.get_item(USER_INFO_KEY).is_none());
}

#[test]
fn stale_profile_after_relogin_is_ignored() {
    let (_, session) = fresh();
    let first = session.set_token("tok-1");
    let second = session.set_token("tok-2");
    assert!(!session.apply_profile(first, Some(profile("old", "USER"))));
    assert!(session.apply_profile(second, Some(profile("new", "USER"))));
    assert_eq!(session.profile().unwrap().username.as_deref(), Some("new"));
}

#[test]
fn logout_clears_storage_and_restore_is_unauthenticated() {
    let (storage, session) = fresh();
    let generation = session.set_token("tok-1");
    session.apply_profile(generation, Some(profile("ann", "USER")));
    session.logout();

    assert!(storage.get_item(TOKEN_KEY).is_none());
    assert!(storage.get_item(USER_INFO_KEY).is_none());
    let restored = Session::restore(storage);
    assert_eq!(restored.snapshot(), SessionSnapshot::default());
}

#[test]
fn restore_reads_token_and_profile() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set_item(TOKEN_KEY, "tok-9").unwrap();
    storage.set_item(USER_INFO_KEY, r#"{"username":"ann","userType":"ADMIN"}"#).unwrap();
    let session = Session::restore(storage);
    assert_eq!(session.token().as_deref(), Some("tok-9"));
    assert!(session.is_admin());
}

#[test]
fn restore_drops_orphaned_profile() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set_item(USER_INFO_KEY, r#"{"username":"ann"}"#).unwrap();
    let session = Session::restore(storage.clone());
    assert!(session.profile().is_none());
    assert!(storage.get_item(USER_INFO_KEY).is_none());
}

#[test]
fn restore_drops_malformed_profile_but_keeps_token() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set_item(TOKEN_KEY, "tok-9").unwrap();
    storage.set_item(USER_INFO_KEY, "{broken").unwrap();
    let session = Session::restore(storage.clone());
    assert_eq!(session.token().as_deref(), Some("tok-9"));
    assert!(session.profile().is_none());
    assert!(storage.get_item(USER_INFO_KEY).is_none());
}

#[test]
fn expire_transitions_exactly_once_per_generation() {
    let (_, session) = fresh();
    let generation = session.set_token("tok-1");
    assert!(session.expire(generation));
    assert!(!session.expire(generation));
    assert!(!session.is_logged_in());
}

#[test]
fn expire_with_old_generation_keeps_new_session() {
    let (_, session) = fresh();
    let old = session.set_token("tok-1");
    session.set_token("tok-2");
    assert!(!session.expire(old));
    assert_eq!(session.token().as_deref(), Some("tok-2"));
}
