//! Record types and the [`Model`] trait.
//!
//! Each platform object kind maps to one record type. The record owns its
//! key, knows how to find, insert, upsert and delete itself, and decides
//! whether it may be created implicitly.

use crate::connection::{DbConn, with_connection};
use crate::schema::{channels, core_settings, emojis, guilds, members, messages, roles, users};
use crate::DatabaseResult;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use versa_error::{DatabaseError, DatabaseErrorKind};

/// Current time as stored in the database.
pub fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

/// Convert a Discord snowflake to the signed column type.
///
/// Snowflakes are unsigned 64-bit integers; the cast keeps the bits.
pub fn to_db_id(id: u64) -> i64 {
    id as i64
}

/// Convert a stored id back to a snowflake.
pub fn from_db_id(id: i64) -> u64 {
    id as u64
}

/// Kind of record, used in logs and error messages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelKind {
    /// Discord user
    User,
    /// Discord guild
    Guild,
    /// Guild member
    Member,
    /// Guild text channel
    TextChannel,
    /// Guild voice channel
    VoiceChannel,
    /// Channel category
    CategoryChannel,
    /// Guild role
    Role,
    /// Custom emoji
    Emoji,
    /// Message
    Message,
    /// Bot-wide settings of a namespace
    CoreSettings,
}

/// Channel variants stored in the `channels` table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChannelKind {
    /// Text channel
    Text,
    /// Voice channel
    Voice,
    /// Category
    Category,
}

impl ChannelKind {
    /// Record kind of channels of this variant.
    pub fn model_kind(&self) -> ModelKind {
        match self {
            ChannelKind::Text => ModelKind::TextChannel,
            ChannelKind::Voice => ModelKind::VoiceChannel,
            ChannelKind::Category => ModelKind::CategoryChannel,
        }
    }
}

/// A persistent record.
///
/// Every method taking a connection is blocking; use
/// [`Repository`](crate::Repository) from async code.
pub trait Model: Clone + Debug + Send + Sync + 'static {
    /// Primary key.
    type Key: Clone + Debug + Send + Sync + 'static;

    /// Short model name for logs.
    const NAME: &'static str;

    /// Whether a missing record may be created on first wrap.
    const AUTO_CREATE: bool = true;

    /// Primary key of this record.
    fn key(&self) -> Self::Key;

    /// Kind of this record.
    fn kind(&self) -> ModelKind;

    /// Refresh `updated_at`.
    fn touch(&mut self);

    /// Validate a record that was just loaded.
    fn check_loaded(&self) -> DatabaseResult<()> {
        Ok(())
    }

    /// Error for a missing record that may not be auto-created.
    #[track_caller]
    fn missing(key: &Self::Key) -> DatabaseError {
        DatabaseError::new(DatabaseErrorKind::DoesNotExist {
            model: Self::NAME.to_string(),
            key: format!("{:?}", key),
        })
    }

    /// Load by key.
    fn find(conn: &mut DbConn, key: &Self::Key) -> DatabaseResult<Option<Self>>;

    /// Insert a new row.
    fn insert(&self, conn: &mut DbConn) -> DatabaseResult<()>;

    /// Update the row with this key, inserting it when absent.
    fn upsert(&self, conn: &mut DbConn) -> DatabaseResult<()>;

    /// Delete by key, returning the number of removed rows.
    fn delete(conn: &mut DbConn, key: &Self::Key) -> DatabaseResult<usize>;
}

macro_rules! impl_model {
    (
        $row:ty, $table:ident, $name:literal, key: $key:ty,
        key_of: |$s:ident| $key_of:expr,
        find: |$k:ident| $find:expr,
        kind: |$ks:ident| $kind:expr
        $(, extra: { $($extra:tt)* })?
    ) => {
        impl Model for $row {
            type Key = $key;

            const NAME: &'static str = $name;

            fn key(&self) -> Self::Key {
                let $s = self;
                $key_of
            }

            fn kind(&self) -> ModelKind {
                let $ks = self;
                $kind
            }

            fn touch(&mut self) {
                self.updated_at = now();
            }

            fn find(conn: &mut DbConn, key: &Self::Key) -> DatabaseResult<Option<Self>> {
                let $k = key;
                with_connection!(conn, |c| {
                    $table::table
                        .find($find)
                        .select(<$row>::as_select())
                        .first::<$row>(c)
                        .optional()
                        .map_err(DatabaseError::from)
                })
            }

            fn insert(&self, conn: &mut DbConn) -> DatabaseResult<()> {
                with_connection!(conn, |c| {
                    diesel::insert_into($table::table)
                        .values(self)
                        .execute(c)
                        .map(|_| ())
                        .map_err(DatabaseError::from)
                })
            }

            fn upsert(&self, conn: &mut DbConn) -> DatabaseResult<()> {
                let $k = &self.key();
                with_connection!(conn, |c| {
                    c.transaction::<_, DatabaseError, _>(|c| {
                        let updated = diesel::update($table::table.find($find))
                            .set(self)
                            .execute(c)?;
                        if updated == 0 {
                            diesel::insert_into($table::table).values(self).execute(c)?;
                        }
                        Ok(())
                    })
                })
            }

            fn delete(conn: &mut DbConn, key: &Self::Key) -> DatabaseResult<usize> {
                let $k = key;
                with_connection!(conn, |c| {
                    diesel::delete($table::table.find($find))
                        .execute(c)
                        .map_err(DatabaseError::from)
                })
            }

            $($($extra)*)?
        }
    };
}

// ============================================================================
// Users
// ============================================================================

/// Registered Discord user.
///
/// Users opt in with `register`; an inactive row marks a user who opted out
/// or whose registration is still pending.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = users, treat_none_as_null = true)]
pub struct UserRow {
    pub id: i64,
    pub is_active: bool,
    pub is_staff: bool,
    pub register_message_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl UserRow {
    /// Active, non-staff user.
    pub fn new(id: i64) -> Self {
        let now = now();
        Self {
            id,
            is_active: true,
            is_staff: false,
            register_message_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Inactive user.
    pub fn inactive(id: i64) -> Self {
        Self {
            is_active: false,
            ..Self::new(id)
        }
    }

    /// Inactive user waiting for a reaction to the prompt `message_id`.
    pub fn pending(id: i64, message_id: i64) -> Self {
        Self {
            register_message_id: Some(message_id),
            ..Self::inactive(id)
        }
    }

    /// Whether a registration prompt is open and unanswered.
    pub fn is_pending(&self) -> bool {
        !self.is_active && self.register_message_id.is_some()
    }

    /// Whether the user opted out.
    pub fn has_opted_out(&self) -> bool {
        !self.is_active && self.register_message_id.is_none()
    }
}

impl_model!(
    UserRow, users, "user", key: i64,
    key_of: |s| s.id,
    find: |k| *k,
    kind: |_s| ModelKind::User,
    extra: {
        const AUTO_CREATE: bool = false;

        // A pending user never agreed to storage, so they load as missing
        // and get the prompt again.
        fn check_loaded(&self) -> DatabaseResult<()> {
            if self.is_active {
                Ok(())
            } else if self.is_pending() {
                Err(Self::missing(&self.id))
            } else {
                Err(DatabaseError::new(DatabaseErrorKind::InactiveUser(self.id)))
            }
        }

        fn missing(key: &i64) -> DatabaseError {
            DatabaseError::new(DatabaseErrorKind::UserDoesNotExist(*key))
        }
    }
);

// ============================================================================
// Guilds and members
// ============================================================================

/// Guild the bot has seen.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = guilds, treat_none_as_null = true)]
pub struct GuildRow {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl_model!(
    GuildRow, guilds, "guild", key: i64,
    key_of: |s| s.id,
    find: |k| *k,
    kind: |_s| ModelKind::Guild
);

/// Membership of a user in a guild.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = members, primary_key(guild_id, user_id), treat_none_as_null = true)]
pub struct MemberRow {
    pub guild_id: i64,
    pub user_id: i64,
    pub nick: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl_model!(
    MemberRow, members, "member", key: (i64, i64),
    key_of: |s| (s.guild_id, s.user_id),
    find: |k| (k.0, k.1),
    kind: |_s| ModelKind::Member
);

// ============================================================================
// Channels, roles, emojis, messages
// ============================================================================

/// Text, voice or category channel.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = channels, treat_none_as_null = true)]
pub struct ChannelRow {
    pub id: i64,
    pub guild_id: Option<i64>,
    pub kind: String,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ChannelRow {
    /// Parsed channel variant; `None` for values written by something else.
    pub fn channel_kind(&self) -> Option<ChannelKind> {
        self.kind.parse().ok()
    }
}

impl_model!(
    ChannelRow, channels, "channel", key: i64,
    key_of: |s| s.id,
    find: |k| *k,
    kind: |s| s
        .channel_kind()
        .map(|kind| kind.model_kind())
        .unwrap_or(ModelKind::TextChannel)
);

/// Guild role.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = roles, treat_none_as_null = true)]
pub struct RoleRow {
    pub id: i64,
    pub guild_id: i64,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl_model!(
    RoleRow, roles, "role", key: i64,
    key_of: |s| s.id,
    find: |k| *k,
    kind: |_s| ModelKind::Role
);

/// Custom emoji.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = emojis, treat_none_as_null = true)]
pub struct EmojiRow {
    pub id: i64,
    pub guild_id: Option<i64>,
    pub name: String,
    pub animated: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl_model!(
    EmojiRow, emojis, "emoji", key: i64,
    key_of: |s| s.id,
    find: |k| *k,
    kind: |_s| ModelKind::Emoji
);

/// Message the bot keeps track of (e.g. registration prompts).
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = messages, treat_none_as_null = true)]
pub struct MessageRow {
    pub id: i64,
    pub channel_id: i64,
    pub guild_id: Option<i64>,
    pub author_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl_model!(
    MessageRow, messages, "message", key: i64,
    key_of: |s| s.id,
    find: |k| *k,
    kind: |_s| ModelKind::Message
);

// ============================================================================
// Core settings
// ============================================================================

/// Bot-wide settings stored per namespace.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = core_settings, primary_key(name), treat_none_as_null = true)]
pub struct CoreSettingsRow {
    pub name: String,
    /// JSON array of command prefixes.
    pub prefixes: String,
    pub description: String,
    pub status: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl CoreSettingsRow {
    /// Settings for `name` with the `!` prefix and no description.
    pub fn new(name: impl Into<String>) -> Self {
        let now = now();
        Self {
            name: name.into(),
            prefixes: r#"["!"]"#.to_string(),
            description: String::new(),
            status: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Decoded prefixes.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the column does not hold a JSON
    /// array of strings.
    pub fn prefixes(&self) -> DatabaseResult<Vec<String>> {
        Ok(serde_json::from_str(&self.prefixes)?)
    }

    /// Replace the stored prefixes.
    pub fn set_prefixes<S: AsRef<str>>(&mut self, prefixes: &[S]) -> DatabaseResult<()> {
        let prefixes: Vec<&str> = prefixes.iter().map(AsRef::as_ref).collect();
        self.prefixes = serde_json::to_string(&prefixes)?;
        Ok(())
    }
}

impl_model!(
    CoreSettingsRow, core_settings, "core_settings", key: String,
    key_of: |s| s.name.clone(),
    find: |k| k.as_str(),
    kind: |_s| ModelKind::CoreSettings
);
