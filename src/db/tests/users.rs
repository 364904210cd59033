use super::{new_song, new_task, test_db};
use crate::db::NewUser;

fn user(external_id: &str, email: &str) -> NewUser {
    NewUser {
        external_id: external_id.to_string(),
        email: Some(email.to_string()),
        first_name: Some("Ada".to_string()),
        ..NewUser::default()
    }
}

#[tokio::test]
async fn test_upsert_is_idempotent_on_identity() {
    let (db, _file) = test_db().await;

    let first = db.upsert_user(&user("ext_1", "a@example.com")).await.unwrap();
    let second = db.upsert_user(&user("ext_1", "b@example.com")).await.unwrap();
    assert_eq!(first, second);

    let row = db.find_user_by_external_id("ext_1").await.unwrap().unwrap();
    assert_eq!(row.email.as_deref(), Some("b@example.com"));
    assert_eq!(row.first_name.as_deref(), Some("Ada"));

    db.close().await;
}

#[tokio::test]
async fn test_insert_if_absent_keeps_existing_profile() {
    let (db, _file) = test_db().await;

    let id = db.upsert_user(&user("ext_1", "real@example.com")).await.unwrap();
    let again = db
        .insert_user_if_absent(&user("ext_1", "placeholder@example.invalid"))
        .await
        .unwrap();
    assert_eq!(id, again);

    let row = db.find_user_by_external_id("ext_1").await.unwrap().unwrap();
    assert_eq!(row.email.as_deref(), Some("real@example.com"));

    db.close().await;
}

#[tokio::test]
async fn test_update_missing_user_reports_false() {
    let (db, _file) = test_db().await;

    assert!(!db.update_user(&user("ghost", "g@example.com")).await.unwrap());

    db.upsert_user(&user("ext_1", "a@example.com")).await.unwrap();
    assert!(db.update_user(&user("ext_1", "new@example.com")).await.unwrap());

    db.close().await;
}

#[tokio::test]
async fn test_delete_cascades_to_tasks_and_links() {
    let (db, _file) = test_db().await;

    let id = db.upsert_user(&user("ext_1", "a@example.com")).await.unwrap();
    let task = db.insert_task(&new_task(id, "https://youtu.be/x")).await.unwrap();
    let song = db.create_song_for_user(id, &new_song("kept")).await.unwrap();

    assert!(db.delete_user_by_external_id("ext_1").await.unwrap());
    assert!(!db.delete_user_by_external_id("ext_1").await.unwrap());

    assert!(db.find_user_by_external_id("ext_1").await.unwrap().is_none());
    assert!(db.get_task(task).await.unwrap().is_none());
    assert_eq!(db.count_songs_for_user(id).await.unwrap(), 0);
    // The song row itself outlives the link
    assert!(db.get_song(song).await.unwrap().is_some());

    db.close().await;
}
