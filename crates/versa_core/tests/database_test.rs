//! Database adapter tests against in-memory SQLite.

use serenity::all::{ChannelId, ChannelType, GuildChannel, GuildId, MessageId, UserId};
use versa_core::{Database, DiscordModel, RegisterOutcome, UnregisterOutcome};
use versa_database::{
    ChannelRow, DatabaseResult, DbPool, GuildRow, MessageRow, UserRow, now, run_migrations,
    to_db_id,
};
use versa_error::DatabaseErrorKind;

fn database() -> Database {
    let pool = DbPool::sqlite_in_memory().expect("in-memory pool");
    run_migrations(&pool).expect("migrations");
    Database::new(pool)
}

#[derive(Debug, Clone)]
struct FakeGuild {
    id: u64,
    name: &'static str,
}

impl DiscordModel for FakeGuild {
    type Model = GuildRow;

    fn to_model(&self) -> DatabaseResult<GuildRow> {
        Ok(GuildRow {
            id: to_db_id(self.id),
            name: self.name.to_string(),
            owner_id: 1,
            is_active: true,
            created_at: now(),
            updated_at: now(),
        })
    }
}

#[derive(Debug, Clone)]
struct FakeUser(u64);

impl DiscordModel for FakeUser {
    type Model = UserRow;

    fn to_model(&self) -> DatabaseResult<UserRow> {
        Ok(UserRow::new(to_db_id(self.0)))
    }
}

fn prompt(id: i64, author_id: i64) -> MessageRow {
    MessageRow {
        id,
        channel_id: 5,
        guild_id: Some(6),
        author_id,
        created_at: now(),
        updated_at: now(),
    }
}

fn channel(id: u64, kind: ChannelType) -> GuildChannel {
    let mut channel = GuildChannel::default();
    channel.id = ChannelId::new(id);
    channel.guild_id = GuildId::new(6);
    channel.kind = kind;
    channel.name = format!("channel-{id}");
    channel
}

#[tokio::test]
async fn test_wrap_creates_then_loads() {
    let db = database();

    let first = db.wrap(FakeGuild { id: 10, name: "first" }).await.unwrap();
    assert!(!first.existed_already());
    assert_eq!(first.model().name, "first");

    // The stored record wins over the live object's values.
    let second = db.wrap(FakeGuild { id: 10, name: "renamed" }).await.unwrap();
    assert!(second.existed_already());
    assert_eq!(second.model().name, "first");
    assert_eq!(second.inner().name, "renamed");
}

#[tokio::test]
async fn test_wrap_without_create_writes_nothing() {
    let db = database();

    let wrapped = db
        .wrap_with(FakeGuild { id: 11, name: "transient" }, false)
        .await
        .unwrap();
    assert!(!wrapped.existed_already());
    assert!(db.repository().find::<GuildRow>(11).await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_user_is_not_created() {
    let db = database();

    let err = db.wrap(FakeUser(42)).await.unwrap_err();
    assert!(err.is_user_missing());
    assert!(db.user_record(UserId::new(42)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_inactive_user_cannot_be_wrapped() {
    let db = database();
    db.repository().save(UserRow::inactive(43)).await.unwrap();

    let err = db.wrap(FakeUser(43)).await.unwrap_err();
    assert!(matches!(err.kind, DatabaseErrorKind::InactiveUser(43)));
}

#[tokio::test]
async fn test_registered_user_wraps() {
    let db = database();
    let user_id = UserId::new(44);
    assert_eq!(
        db.register_user(user_id).await.unwrap(),
        RegisterOutcome::Registered
    );
    assert_eq!(
        db.register_user(user_id).await.unwrap(),
        RegisterOutcome::AlreadyRegistered
    );

    let wrapped = db.wrap(FakeUser(44)).await.unwrap();
    assert!(wrapped.existed_already());
    assert!(wrapped.model().is_active);
}

#[tokio::test]
async fn test_unregister_active_user_deletes_record() {
    let db = database();
    let user_id = UserId::new(45);
    db.register_user(user_id).await.unwrap();

    assert_eq!(
        db.unregister_user(user_id).await.unwrap(),
        UnregisterOutcome::Removed
    );
    assert!(db.user_record(user_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unregister_unknown_user_remembers_opt_out() {
    let db = database();
    let user_id = UserId::new(46);

    assert_eq!(
        db.unregister_user(user_id).await.unwrap(),
        UnregisterOutcome::Removed
    );
    let record = db.user_record(user_id).await.unwrap().expect("opt-out record");
    assert!(!record.is_active);

    assert_eq!(
        db.unregister_user(user_id).await.unwrap(),
        UnregisterOutcome::AlreadyUnregistered
    );
}

#[tokio::test]
async fn test_registration_by_reaction() {
    let db = database();
    let user_id = UserId::new(47);

    assert!(db.begin_registration(user_id, prompt(900, 1)).await.unwrap());
    assert_eq!(db.register_message(user_id).await.unwrap().map(|m| m.id), Some(900));
    // A new prompt replaces the unanswered one.
    assert!(db.begin_registration(user_id, prompt(901, 1)).await.unwrap());
    assert_eq!(db.register_message(user_id).await.unwrap().map(|m| m.id), Some(901));
    assert!(db.repository().find::<MessageRow>(900).await.unwrap().is_none());

    assert!(
        !db.confirm_registration(user_id, MessageId::new(900))
            .await
            .unwrap()
    );
    assert!(
        db.confirm_registration(user_id, MessageId::new(901))
            .await
            .unwrap()
    );

    let record = db.user_record(user_id).await.unwrap().unwrap();
    assert!(record.is_active);
    assert_eq!(record.register_message_id, None);
    assert!(db.repository().find::<MessageRow>(901).await.unwrap().is_none());

    // Registered users are not prompted again.
    assert!(!db.begin_registration(user_id, prompt(903, 1)).await.unwrap());
    assert!(db.repository().find::<MessageRow>(903).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pending_user_is_prompted_again() {
    let db = database();
    let user_id = UserId::new(49);
    db.begin_registration(user_id, prompt(904, 1)).await.unwrap();

    // Not an opt-out: the user never answered the prompt.
    let err = db.wrap(FakeUser(49)).await.unwrap_err();
    assert!(err.is_user_missing());
    assert!(!err.is_user_inactive());
}

#[tokio::test]
async fn test_unregister_pending_user_records_opt_out() {
    let db = database();
    let user_id = UserId::new(50);
    db.begin_registration(user_id, prompt(905, 1)).await.unwrap();

    assert_eq!(
        db.unregister_user(user_id).await.unwrap(),
        UnregisterOutcome::Removed
    );
    let record = db.user_record(user_id).await.unwrap().expect("opt-out record");
    assert!(!record.is_active);
    assert_eq!(record.register_message_id, None);
    assert!(db.repository().find::<MessageRow>(905).await.unwrap().is_none());

    let err = db.wrap(FakeUser(50)).await.unwrap_err();
    assert!(err.is_user_inactive());
    assert!(!db.begin_registration(user_id, prompt(906, 1)).await.unwrap());
    assert_eq!(
        db.unregister_user(user_id).await.unwrap(),
        UnregisterOutcome::AlreadyUnregistered
    );
}

#[tokio::test]
async fn test_register_command_clears_pending_prompt() {
    let db = database();
    let user_id = UserId::new(48);
    db.begin_registration(user_id, prompt(902, 1)).await.unwrap();

    assert_eq!(
        db.register_user(user_id).await.unwrap(),
        RegisterOutcome::Registered
    );
    assert!(db.repository().find::<MessageRow>(902).await.unwrap().is_none());
    assert!(db.register_message(user_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_channel_of_wrong_kind_is_rejected() {
    let db = database();

    let err = db
        .wrap_text_channel(channel(60, ChannelType::Voice))
        .await
        .unwrap_err();
    assert!(matches!(err.kind, DatabaseErrorKind::UnsupportedObject(_)));
    assert!(db.repository().find::<ChannelRow>(60).await.unwrap().is_none());

    let err = db
        .wrap_category_channel(channel(61, ChannelType::Text))
        .await
        .unwrap_err();
    assert!(matches!(err.kind, DatabaseErrorKind::UnsupportedObject(_)));
    assert!(db.repository().find::<ChannelRow>(61).await.unwrap().is_none());

    let wrapped = db
        .wrap_voice_channel(channel(62, ChannelType::Stage))
        .await
        .unwrap();
    assert_eq!(wrapped.model().kind, "voice");
}

#[tokio::test]
async fn test_threads_are_unsupported() {
    let db = database();

    for (id, kind) in [
        (63, ChannelType::PublicThread),
        (64, ChannelType::PrivateThread),
        (65, ChannelType::Forum),
    ] {
        let err = db.wrap(channel(id, kind)).await.unwrap_err();
        assert!(
            matches!(err.kind, DatabaseErrorKind::UnsupportedObject(_)),
            "{kind:?} should be unsupported, got {err}"
        );
        assert!(
            db.repository()
                .find::<ChannelRow>(to_db_id(id))
                .await
                .unwrap()
                .is_none()
        );
    }
}

#[tokio::test]
async fn test_reload_save_delete() {
    let db = database();
    let mut wrapped = db.wrap(FakeGuild { id: 12, name: "guild" }).await.unwrap();

    wrapped.model_mut().name = "changed".to_string();
    db.save(&mut wrapped).await.unwrap();

    let mut other = db.wrap(FakeGuild { id: 12, name: "guild" }).await.unwrap();
    assert_eq!(other.model().name, "changed");

    assert!(db.delete(&wrapped).await.unwrap());
    assert!(!db.reload(&mut other).await.unwrap());
    assert!(!other.existed_already());
    assert_eq!(other.model().name, "changed");
}

#[tokio::test]
async fn test_staff_requires_active_record() {
    let db = database();
    let mut staff = UserRow::new(49);
    staff.is_staff = true;
    db.repository().save(staff.clone()).await.unwrap();
    assert!(db.is_staff(UserId::new(49)).await.unwrap());

    staff.is_active = false;
    db.repository().save(staff).await.unwrap();
    assert!(!db.is_staff(UserId::new(49)).await.unwrap());
    assert!(!db.is_staff(UserId::new(50)).await.unwrap());
}

#[tokio::test]
async fn test_core_settings_created_once() {
    let db = database();

    let (mut settings, created) = db.core_settings("main").await.unwrap();
    assert!(created);
    assert_eq!(settings.prefixes().unwrap(), vec!["!".to_string()]);

    settings.set_prefixes(&["?", ">>"]).unwrap();
    settings.description = "A bot".to_string();
    db.save_core_settings(settings).await.unwrap();

    let (settings, created) = db.core_settings("main").await.unwrap();
    assert!(!created);
    assert_eq!(settings.prefixes().unwrap(), vec!["?".to_string(), ">>".to_string()]);
    assert_eq!(settings.description, "A bot");

    let (_, created) = db.core_settings("other").await.unwrap();
    assert!(created);
}
