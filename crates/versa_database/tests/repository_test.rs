//! Repository tests against in-memory SQLite.

use versa_database::{
    Backend, ChannelKind, ChannelRow, CoreSettingsRow, DbPool, GuildRow, MemberRow, Model,
    ModelKind, Repository, UserRow, now, run_migrations,
};

fn repository() -> Repository {
    let pool = DbPool::sqlite_in_memory().expect("in-memory pool");
    let applied = run_migrations(&pool).expect("migrations");
    assert!(!applied.is_empty());
    Repository::new(pool)
}

fn guild(id: i64) -> GuildRow {
    GuildRow {
        id,
        name: format!("guild-{id}"),
        owner_id: 1,
        is_active: true,
        created_at: now(),
        updated_at: now(),
    }
}

#[tokio::test]
async fn test_pool_reports_backend() {
    let repo = repository();
    assert_eq!(repo.pool().backend(), Backend::Sqlite);
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let pool = DbPool::sqlite_in_memory().unwrap();
    run_migrations(&pool).unwrap();
    assert!(run_migrations(&pool).unwrap().is_empty());
}

#[tokio::test]
async fn test_insert_then_find() {
    let repo = repository();
    assert!(repo.find::<GuildRow>(10).await.unwrap().is_none());

    repo.insert(guild(10)).await.unwrap();

    let loaded: GuildRow = repo.find(10).await.unwrap().expect("stored guild");
    assert_eq!(loaded.name, "guild-10");
    assert_eq!(loaded.kind(), ModelKind::Guild);
}

#[tokio::test]
async fn test_save_updates_existing_row() {
    let repo = repository();
    repo.insert(guild(11)).await.unwrap();

    let mut renamed = guild(11);
    renamed.name = "renamed".to_string();
    repo.save(renamed).await.unwrap();

    let loaded: GuildRow = repo.find(11).await.unwrap().unwrap();
    assert_eq!(loaded.name, "renamed");
}

#[tokio::test]
async fn test_save_inserts_missing_row() {
    let repo = repository();
    repo.save(UserRow::new(5)).await.unwrap();
    let loaded: UserRow = repo.find(5).await.unwrap().unwrap();
    assert!(loaded.is_active);
}

#[tokio::test]
async fn test_save_clears_nullable_column() {
    let repo = repository();
    let mut user = UserRow::inactive(6);
    user.register_message_id = Some(99);
    repo.save(user.clone()).await.unwrap();

    user.register_message_id = None;
    user.is_active = true;
    repo.save(user).await.unwrap();

    let loaded: UserRow = repo.find(6).await.unwrap().unwrap();
    assert_eq!(loaded.register_message_id, None);
    assert!(loaded.is_active);
}

#[tokio::test]
async fn test_delete_reports_removal() {
    let repo = repository();
    repo.insert(UserRow::new(7)).await.unwrap();
    assert!(repo.delete::<UserRow>(7).await.unwrap());
    assert!(!repo.delete::<UserRow>(7).await.unwrap());
    assert!(repo.find::<UserRow>(7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_member_composite_key() {
    let repo = repository();
    let member = MemberRow {
        guild_id: 1,
        user_id: 2,
        nick: Some("nick".to_string()),
        created_at: now(),
        updated_at: now(),
    };
    repo.insert(member.clone()).await.unwrap();

    assert!(repo.find::<MemberRow>((1, 3)).await.unwrap().is_none());
    let loaded: MemberRow = repo.find((1, 2)).await.unwrap().unwrap();
    assert_eq!(loaded.nick.as_deref(), Some("nick"));
    assert_eq!(loaded.key(), (1, 2));
}

#[tokio::test]
async fn test_channel_kind_is_stored() {
    let repo = repository();
    let channel = ChannelRow {
        id: 20,
        guild_id: Some(1),
        kind: ChannelKind::Voice.to_string(),
        name: "General".to_string(),
        created_at: now(),
        updated_at: now(),
    };
    repo.insert(channel).await.unwrap();

    let loaded: ChannelRow = repo.find(20).await.unwrap().unwrap();
    assert_eq!(loaded.channel_kind(), Some(ChannelKind::Voice));
    assert_eq!(loaded.kind(), ModelKind::VoiceChannel);
}

#[tokio::test]
async fn test_get_or_create_core_settings() {
    let repo = repository();

    let (settings, created) = repo
        .get_or_create("default".to_string(), || CoreSettingsRow::new("default"))
        .await
        .unwrap();
    assert!(created);
    assert_eq!(settings.prefixes().unwrap(), vec!["!"]);

    let (_, created) = repo
        .get_or_create("default".to_string(), || CoreSettingsRow::new("default"))
        .await
        .unwrap();
    assert!(!created);
}

#[tokio::test]
async fn test_insert_duplicate_key_fails() {
    let repo = repository();
    repo.insert(UserRow::new(8)).await.unwrap();
    let err = repo.insert(UserRow::new(8)).await.unwrap_err();
    assert!(err.is_already_exists(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_insert_or_get_returns_existing_row() {
    let repo = repository();
    repo.insert(guild(12)).await.unwrap();

    let mut late = guild(12);
    late.name = "written later".to_string();
    let (stored, created) = repo.insert_or_get(late).await.unwrap();
    assert!(!created);
    assert_eq!(stored.name, "guild-12");

    let (fresh, created) = repo.insert_or_get(guild(13)).await.unwrap();
    assert!(created);
    assert_eq!(fresh.name, "guild-13");
}

#[tokio::test]
async fn test_sqlite_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test_db.sqlite3");
    let pool = DbPool::connect(Backend::Sqlite, path.to_str().unwrap(), 4).unwrap();
    run_migrations(&pool).unwrap();

    let repo = Repository::new(pool);
    repo.save(UserRow::new(1)).await.unwrap();
    assert!(path.exists());
}
