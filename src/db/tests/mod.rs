use crate::db::*;
use tempfile::NamedTempFile;

mod state;
mod tasks;
mod users;

/// Fresh database in a temp file; keep the file alive for the duration of the test
async fn test_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

async fn test_user(db: &Database, external_id: &str) -> crate::types::UserId {
    db.upsert_user(&NewUser {
        external_id: external_id.to_string(),
        email: Some(format!("{external_id}@example.invalid")),
        ..NewUser::default()
    })
    .await
    .unwrap()
}

fn new_task(user_id: crate::types::UserId, url: &str) -> NewTask {
    NewTask {
        user_id,
        task_type: crate::types::TASK_TYPE_DOWNLOAD.to_string(),
        source_url: url.to_string(),
        source_type: crate::types::SourcePlatform::Youtube,
    }
}

fn new_song(title: &str) -> NewSong {
    NewSong {
        title: title.to_string(),
        artist: "Artist".to_string(),
        duration: 212,
        source_url: Some("https://youtu.be/abc".to_string()),
        source_type: crate::types::SourcePlatform::Youtube,
        source_id: "abc".to_string(),
        file_url: format!("https://bucket.s3.amazonaws.com/{title}.mp3"),
        storage_key: Some(format!("1/{title}.mp3")),
        thumbnail_url: None,
        is_processed: false,
    }
}
