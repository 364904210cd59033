use super::test_db;

#[tokio::test]
async fn test_shutdown_state_initial() {
    let (db, _file) = test_db().await;

    assert!(
        db.was_unclean_shutdown().await.unwrap(),
        "a fresh database has no clean shutdown recorded"
    );

    db.close().await;
}

#[tokio::test]
async fn test_shutdown_state_clean_lifecycle() {
    let (db, _file) = test_db().await;

    db.set_clean_start().await.unwrap();
    assert!(
        db.was_unclean_shutdown().await.unwrap(),
        "after start, should still indicate unclean (not yet shut down)"
    );

    db.set_clean_shutdown().await.unwrap();
    assert!(!db.was_unclean_shutdown().await.unwrap());

    db.close().await;
}

#[tokio::test]
async fn test_shutdown_state_unclean_detection() {
    let temp_file = tempfile::NamedTempFile::new().unwrap();

    // First session: start but never shut down (crash)
    {
        let db = crate::db::Database::new(temp_file.path()).await.unwrap();
        db.set_clean_start().await.unwrap();
        db.close().await;
    }

    let db = crate::db::Database::new(temp_file.path()).await.unwrap();
    assert!(db.was_unclean_shutdown().await.unwrap());
    db.close().await;
}

#[tokio::test]
async fn test_ping_open_database() {
    let (db, _file) = test_db().await;

    db.ping().await.unwrap();

    db.close().await;
}
