use picvote_core::db::open_shared_in_memory;
use picvote_core::model::identity::Credentials;
use picvote_core::remote::{
    AuthError, LocalGalleryService, LocalIdentityProvider, RemoteGallery, SimulatedLatency,
};
use picvote_core::repo::kv_repo::{KeyValueStore, SqliteKeyValueStore, CURRENT_IDENTITY_KEY};
use picvote_core::service::session_service::{SessionError, SessionService};

fn session(
    store: SqliteKeyValueStore,
) -> SessionService<LocalIdentityProvider, SqliteKeyValueStore> {
    SessionService::new(LocalIdentityProvider::new(), store)
}

#[tokio::test]
async fn sign_in_persists_identity_but_never_the_password() {
    let conn = open_shared_in_memory().unwrap();
    let store = SqliteKeyValueStore::new(conn.clone());
    let service = session(store.clone());

    let identity = service
        .sign_in(&Credentials::new("Ada.Lovelace@example.com", "hunter22"))
        .await
        .unwrap();

    assert!(identity.id.starts_with("u-"));
    let raw = store.get_raw(CURRENT_IDENTITY_KEY).unwrap().unwrap();
    assert!(!raw.contains("hunter22"));

    let stored_values: Vec<String> = {
        let guard = conn.lock().unwrap();
        let mut stmt = guard.prepare("SELECT value FROM kv_entries;").unwrap();
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        rows
    };
    assert!(stored_values.iter().all(|value| !value.contains("hunter22")));
}

#[tokio::test]
async fn same_email_signs_back_in_as_same_author() {
    let conn = open_shared_in_memory().unwrap();
    let service = session(SqliteKeyValueStore::new(conn));

    let first = service
        .sign_in(&Credentials::new("ada@example.com", "secret-1"))
        .await
        .unwrap();
    service.sign_out().unwrap();
    let second = service
        .sign_in(&Credentials::new(" ADA@example.com ", "another-secret"))
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn failed_sign_in_keeps_existing_session() {
    let conn = open_shared_in_memory().unwrap();
    let service = session(SqliteKeyValueStore::new(conn));
    let current = service
        .sign_in(&Credentials::new("ada@example.com", "secret-1"))
        .await
        .unwrap();

    let err = service
        .sign_in(&Credentials::new("not-an-email", "secret-1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Auth(AuthError::InvalidCredentials(_))
    ));
    assert_eq!(service.resume().unwrap(), Some(current));
}

#[tokio::test]
async fn gallery_session_follows_sign_in_and_sign_out() {
    let conn = open_shared_in_memory().unwrap();
    let service = session(SqliteKeyValueStore::new(conn.clone()));
    let remote = LocalGalleryService::new(conn, SimulatedLatency::none());
    assert_eq!(remote.get_session().await.unwrap(), None);

    let identity = service
        .sign_in(&Credentials::new("grace@example.com", "compiler"))
        .await
        .unwrap();
    assert_eq!(remote.get_session().await.unwrap(), Some(identity));

    service.sign_out().unwrap();
    service.sign_out().unwrap();
    assert_eq!(remote.get_session().await.unwrap(), None);
}
