use super::{new_song, new_task, test_db, test_user};
use crate::error::{DatabaseError, Error, TaskError};
use crate::types::{SourcePlatform, TaskInfo, TaskStatus};

#[tokio::test]
async fn test_insert_and_get_task() {
    let (db, _file) = test_db().await;
    let user = test_user(&db, "user_a").await;

    let id = db
        .insert_task(&new_task(user, "https://youtu.be/abc"))
        .await
        .unwrap();
    assert!(id.0 > 0);

    let row = db.get_task(id).await.unwrap().unwrap();
    assert_eq!(row.user_id, user);
    assert_eq!(row.status(), TaskStatus::Pending);
    assert_eq!(row.progress, 0);
    assert_eq!(row.task_type, "download");
    assert_eq!(row.source_type, "YOUTUBE");
    assert!(row.started_at.is_none());
    assert!(row.result_song_id.is_none());

    let info = TaskInfo::try_from(row).unwrap();
    assert_eq!(info.source_type, SourcePlatform::Youtube);
    assert_eq!(info.status, TaskStatus::Pending);

    db.close().await;
}

#[tokio::test]
async fn test_task_for_missing_user_is_a_constraint_violation() {
    let (db, _file) = test_db().await;

    let err = db
        .insert_task(&new_task(
            crate::types::UserId(424_242),
            "https://youtu.be/abc",
        ))
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Database(DatabaseError::ConstraintViolation(_))),
        "{err:?}"
    );

    db.close().await;
}

#[tokio::test]
async fn test_get_task_for_user_hides_other_owners() {
    let (db, _file) = test_db().await;
    let owner = test_user(&db, "owner").await;
    let other = test_user(&db, "other").await;

    let id = db
        .insert_task(&new_task(owner, "https://youtu.be/abc"))
        .await
        .unwrap();

    assert!(db.get_task_for_user(id, owner).await.unwrap().is_some());
    assert!(db.get_task_for_user(id, other).await.unwrap().is_none());

    db.close().await;
}

#[tokio::test]
async fn test_full_success_lifecycle() {
    let (db, _file) = test_db().await;
    let user = test_user(&db, "user_a").await;
    let id = db
        .insert_task(&new_task(user, "https://youtu.be/abc"))
        .await
        .unwrap();

    db.mark_task_processing(id).await.unwrap();
    let row = db.get_task(id).await.unwrap().unwrap();
    assert_eq!(row.status(), TaskStatus::Processing);
    assert_eq!(row.progress, 10);
    assert!(row.started_at.is_some());

    db.update_task_progress(id, 30).await.unwrap();
    db.update_task_progress(id, 70).await.unwrap();

    let song_id = db.create_song_for_user(user, &new_song("a")).await.unwrap();
    db.complete_task(id, song_id).await.unwrap();

    let row = db.get_task(id).await.unwrap().unwrap();
    assert_eq!(row.status(), TaskStatus::Completed);
    assert_eq!(row.progress, 100);
    assert_eq!(row.result_song_id, Some(song_id));
    assert!(row.error_message.is_none());
    assert!(row.completed_at.is_some());

    db.close().await;
}

#[tokio::test]
async fn test_pending_task_can_fail_directly() {
    let (db, _file) = test_db().await;
    let user = test_user(&db, "user_a").await;
    let id = db
        .insert_task(&new_task(user, "https://youtu.be/abc"))
        .await
        .unwrap();

    db.fail_task(id, "tool missing").await.unwrap();

    let row = db.get_task(id).await.unwrap().unwrap();
    assert_eq!(row.status(), TaskStatus::Failed);
    assert_eq!(row.error_message.as_deref(), Some("tool missing"));
    assert!(row.result_song_id.is_none());

    db.close().await;
}

#[tokio::test]
async fn test_terminal_tasks_reject_every_transition() {
    let (db, _file) = test_db().await;
    let user = test_user(&db, "user_a").await;
    let id = db
        .insert_task(&new_task(user, "https://youtu.be/abc"))
        .await
        .unwrap();
    db.mark_task_processing(id).await.unwrap();
    db.fail_task(id, "boom").await.unwrap();

    let song_id = db.create_song_for_user(user, &new_song("late")).await.unwrap();

    assert!(matches!(
        db.mark_task_processing(id).await,
        Err(Error::Task(TaskError::InvalidTransition {
            to: TaskStatus::Processing,
            ..
        }))
    ));
    assert!(matches!(
        db.complete_task(id, song_id).await,
        Err(Error::Task(TaskError::InvalidTransition {
            to: TaskStatus::Completed,
            ..
        }))
    ));
    assert!(matches!(
        db.fail_task(id, "again").await,
        Err(Error::Task(TaskError::InvalidTransition { .. }))
    ));
    assert!(matches!(
        db.update_task_progress(id, 90).await,
        Err(Error::Task(TaskError::InvalidTransition { .. }))
    ));

    // Row unchanged
    let row = db.get_task(id).await.unwrap().unwrap();
    assert_eq!(row.status(), TaskStatus::Failed);
    assert_eq!(row.error_message.as_deref(), Some("boom"));
    assert!(row.result_song_id.is_none());

    db.close().await;
}

#[tokio::test]
async fn test_pending_task_cannot_complete() {
    let (db, _file) = test_db().await;
    let user = test_user(&db, "user_a").await;
    let id = db
        .insert_task(&new_task(user, "https://youtu.be/abc"))
        .await
        .unwrap();
    let song_id = db.create_song_for_user(user, &new_song("a")).await.unwrap();

    let err = db.complete_task(id, song_id).await.unwrap_err();
    match err {
        Error::Task(TaskError::InvalidTransition { id: got, expected, to }) => {
            assert_eq!(got, id);
            assert_eq!(expected, "PROCESSING");
            assert_eq!(to, TaskStatus::Completed);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    db.close().await;
}

#[tokio::test]
async fn test_completed_task_cannot_fail() {
    let (db, _file) = test_db().await;
    let user = test_user(&db, "user_a").await;
    let id = db
        .insert_task(&new_task(user, "https://youtu.be/abc"))
        .await
        .unwrap();
    db.mark_task_processing(id).await.unwrap();
    let song_id = db.create_song_for_user(user, &new_song("a")).await.unwrap();
    db.complete_task(id, song_id).await.unwrap();

    let err = db.fail_task(id, "late failure").await.unwrap_err();
    match err {
        Error::Task(TaskError::InvalidTransition { expected, to, .. }) => {
            assert_eq!(expected, "PENDING or PROCESSING");
            assert_eq!(to, TaskStatus::Failed);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let row = db.get_task(id).await.unwrap().unwrap();
    assert_eq!(row.status(), TaskStatus::Completed);
    assert_eq!(row.result_song_id, Some(song_id));

    db.close().await;
}

#[tokio::test]
async fn test_progress_never_moves_backwards() {
    let (db, _file) = test_db().await;
    let user = test_user(&db, "user_a").await;
    let id = db
        .insert_task(&new_task(user, "https://youtu.be/abc"))
        .await
        .unwrap();
    db.mark_task_processing(id).await.unwrap();
    db.update_task_progress(id, 70).await.unwrap();

    assert!(matches!(
        db.update_task_progress(id, 30).await,
        Err(Error::Task(TaskError::ProgressRegression { progress: 30, .. }))
    ));
    // Same value is accepted
    db.update_task_progress(id, 70).await.unwrap();

    let row = db.get_task(id).await.unwrap().unwrap();
    assert_eq!(row.progress, 70);

    db.close().await;
}

#[tokio::test]
async fn test_list_recent_tasks_is_newest_first_and_limited() {
    let (db, _file) = test_db().await;
    let user = test_user(&db, "user_a").await;
    let other = test_user(&db, "user_b").await;

    let mut ids = Vec::new();
    for i in 0..12 {
        ids.push(
            db.insert_task(&new_task(user, &format!("https://youtu.be/{i}")))
                .await
                .unwrap(),
        );
    }
    db.insert_task(&new_task(other, "https://youtu.be/other"))
        .await
        .unwrap();

    let rows = db.list_recent_tasks(user, 10).await.unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0].id, ids[11]);
    assert_eq!(rows[9].id, ids[2]);
    assert!(rows.iter().all(|r| r.user_id == user));

    assert_eq!(db.count_tasks_for_user(user).await.unwrap(), 12);
    assert_eq!(db.count_tasks_for_user(other).await.unwrap(), 1);

    db.close().await;
}

#[tokio::test]
async fn test_unfinished_and_stale_task_queries() {
    let (db, _file) = test_db().await;
    let user = test_user(&db, "user_a").await;

    let pending = db.insert_task(&new_task(user, "https://youtu.be/1")).await.unwrap();
    let processing = db.insert_task(&new_task(user, "https://youtu.be/2")).await.unwrap();
    let done = db.insert_task(&new_task(user, "https://youtu.be/3")).await.unwrap();
    db.mark_task_processing(processing).await.unwrap();
    db.fail_task(done, "x").await.unwrap();

    let unfinished: Vec<_> = db
        .list_unfinished_tasks()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(unfinished, vec![pending, processing]);

    // Backdate the processing task so only it is stale
    sqlx::query("UPDATE tasks SET started_at = 1000 WHERE id = ?")
        .bind(processing)
        .execute(db.pool())
        .await
        .unwrap();

    let cutoff = chrono::Utc::now().timestamp() - 60;
    let stale: Vec<_> = db
        .list_stale_tasks(cutoff)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(stale, vec![processing]);

    db.close().await;
}
