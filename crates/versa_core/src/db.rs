//! Database adapter for platform objects.
//!
//! [`Database`] attaches a stored record to a Discord object. Each Discord
//! type maps to exactly one record type through [`DiscordModel`]; wrapping
//! loads the record by key, or creates it when it is missing.
//!
//! Users are the exception: they opt in through registration, so wrapping a
//! user never creates a record.

use serenity::all::{
    ChannelType, CurrentUser, Emoji, Guild, GuildChannel, Member, Message, MessageId,
    ReactionType, Role, User, UserId,
};
use std::ops::{Deref, DerefMut};
use tracing::{debug, info, instrument};
use versa_database::{
    ChannelKind, ChannelRow, CoreSettingsRow, DatabaseResult, DbPool, EmojiRow, GuildRow,
    MemberRow, MessageRow, Model, Repository, RoleRow, UserRow, now, to_db_id,
};
use versa_error::{DatabaseError, DatabaseErrorKind};

/// A Discord object type with a stored counterpart.
pub trait DiscordModel: Send + Sync + 'static {
    /// Record type this object is stored as.
    type Model: Model;

    /// Build the record for this object.
    ///
    /// The record is only written when no record with its key exists yet.
    ///
    /// # Errors
    ///
    /// Returns an unsupported-object error for values of this type that
    /// have no record kind, such as thread channels.
    fn to_model(&self) -> DatabaseResult<Self::Model>;
}

impl DiscordModel for User {
    type Model = UserRow;

    fn to_model(&self) -> DatabaseResult<UserRow> {
        Ok(UserRow::new(to_db_id(self.id.get())))
    }
}

impl DiscordModel for CurrentUser {
    type Model = UserRow;

    fn to_model(&self) -> DatabaseResult<UserRow> {
        Ok(UserRow::new(to_db_id(self.id.get())))
    }
}

impl DiscordModel for Guild {
    type Model = GuildRow;

    fn to_model(&self) -> DatabaseResult<GuildRow> {
        let now = now();
        Ok(GuildRow {
            id: to_db_id(self.id.get()),
            name: self.name.clone(),
            owner_id: to_db_id(self.owner_id.get()),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Record variant of a guild channel type.
pub fn channel_kind(kind: ChannelType) -> Option<ChannelKind> {
    match kind {
        ChannelType::Text | ChannelType::News => Some(ChannelKind::Text),
        ChannelType::Voice | ChannelType::Stage => Some(ChannelKind::Voice),
        ChannelType::Category => Some(ChannelKind::Category),
        _ => None,
    }
}

impl DiscordModel for GuildChannel {
    type Model = ChannelRow;

    fn to_model(&self) -> DatabaseResult<ChannelRow> {
        let kind = channel_kind(self.kind).ok_or_else(|| {
            DatabaseError::new(DatabaseErrorKind::UnsupportedObject(format!(
                "{:?} channel",
                self.kind
            )))
        })?;
        let now = now();
        Ok(ChannelRow {
            id: to_db_id(self.id.get()),
            guild_id: Some(to_db_id(self.guild_id.get())),
            kind: kind.to_string(),
            name: self.name.clone(),
            created_at: now,
            updated_at: now,
        })
    }
}

impl DiscordModel for Role {
    type Model = RoleRow;

    fn to_model(&self) -> DatabaseResult<RoleRow> {
        let now = now();
        Ok(RoleRow {
            id: to_db_id(self.id.get()),
            guild_id: to_db_id(self.guild_id.get()),
            name: self.name.clone(),
            created_at: now,
            updated_at: now,
        })
    }
}

impl DiscordModel for Emoji {
    type Model = EmojiRow;

    fn to_model(&self) -> DatabaseResult<EmojiRow> {
        let now = now();
        Ok(EmojiRow {
            id: to_db_id(self.id.get()),
            guild_id: None,
            name: self.name.clone(),
            animated: self.animated,
            created_at: now,
            updated_at: now,
        })
    }
}

impl DiscordModel for ReactionType {
    type Model = EmojiRow;

    fn to_model(&self) -> DatabaseResult<EmojiRow> {
        match self {
            ReactionType::Custom { animated, id, name } => {
                let now = now();
                Ok(EmojiRow {
                    id: to_db_id(id.get()),
                    guild_id: None,
                    name: name.clone().unwrap_or_default(),
                    animated: *animated,
                    created_at: now,
                    updated_at: now,
                })
            }
            other => Err(DatabaseError::new(DatabaseErrorKind::UnsupportedObject(
                format!("unicode emoji {}", other),
            ))),
        }
    }
}

impl DiscordModel for Member {
    type Model = MemberRow;

    fn to_model(&self) -> DatabaseResult<MemberRow> {
        let now = now();
        Ok(MemberRow {
            guild_id: to_db_id(self.guild_id.get()),
            user_id: to_db_id(self.user.id.get()),
            nick: self.nick.clone(),
            created_at: now,
            updated_at: now,
        })
    }
}

impl DiscordModel for Message {
    type Model = MessageRow;

    fn to_model(&self) -> DatabaseResult<MessageRow> {
        let now = now();
        Ok(MessageRow {
            id: to_db_id(self.id.get()),
            channel_id: to_db_id(self.channel_id.get()),
            guild_id: self.guild_id.map(|id| to_db_id(id.get())),
            author_id: to_db_id(self.author.id.get()),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Discord object together with its stored record.
///
/// Dereferences to the Discord object, so every field and method of the
/// object stays available.
#[derive(Debug, Clone)]
pub struct Wrapped<T: DiscordModel> {
    inner: T,
    model: T::Model,
    existed_already: bool,
}

impl<T: DiscordModel> Wrapped<T> {
    /// Pair an object with its record.
    pub fn new(inner: T, model: T::Model, existed_already: bool) -> Self {
        Self {
            inner,
            model,
            existed_already,
        }
    }

    /// The Discord object.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// The stored record.
    pub fn model(&self) -> &T::Model {
        &self.model
    }

    /// Mutable access to the record; call [`Database::save`] to persist.
    pub fn model_mut(&mut self) -> &mut T::Model {
        &mut self.model
    }

    /// Whether the record was found in storage rather than created.
    pub fn existed_already(&self) -> bool {
        self.existed_already
    }

    /// Split into object and record.
    pub fn into_parts(self) -> (T, T::Model) {
        (self.inner, self.model)
    }
}

impl<T: DiscordModel> Deref for Wrapped<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: DiscordModel> DerefMut for Wrapped<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

/// Values that identify a Discord user.
pub trait IntoUser {
    /// The underlying user.
    fn into_user(self) -> User;
}

impl IntoUser for User {
    fn into_user(self) -> User {
        self
    }
}

impl IntoUser for Member {
    fn into_user(self) -> User {
        self.user
    }
}

impl IntoUser for CurrentUser {
    fn into_user(self) -> User {
        (*self).clone()
    }
}

/// Result of a `register` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The user had an active record already.
    AlreadyRegistered,
    /// The user record was created or reactivated.
    Registered,
}

/// Result of an `unregister` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisterOutcome {
    /// The user had opted out already.
    AlreadyUnregistered,
    /// The user data was removed and the opt-out recorded.
    Removed,
}

/// Wraps Discord objects in stored records.
#[derive(Debug, Clone)]
pub struct Database {
    repository: Repository,
}

impl Database {
    /// Create an adapter over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self {
            repository: Repository::new(pool),
        }
    }

    /// Underlying repository.
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Underlying pool.
    pub fn pool(&self) -> &DbPool {
        self.repository.pool()
    }

    async fn load_object<T: DiscordModel>(
        &self,
        object: T,
        create_if_new: bool,
    ) -> DatabaseResult<Wrapped<T>> {
        let fresh = object.to_model()?;
        let key = fresh.key();

        if create_if_new && T::Model::AUTO_CREATE {
            let (model, created) = self
                .repository
                .get_or_create(key, move || fresh)
                .await?;
            model.check_loaded()?;
            if created {
                debug!(model = T::Model::NAME, key = ?model.key(), "Created record");
            }
            return Ok(Wrapped::new(object, model, !created));
        }

        match self.repository.find::<T::Model>(key.clone()).await? {
            Some(model) => {
                model.check_loaded()?;
                Ok(Wrapped::new(object, model, true))
            }
            None if !T::Model::AUTO_CREATE => Err(T::Model::missing(&key)),
            None => Ok(Wrapped::new(object, fresh, false)),
        }
    }

    /// Wrap any supported Discord object.
    ///
    /// # Errors
    ///
    /// Users without a record, or with an unanswered registration prompt,
    /// fail with *user does not exist*; opted-out users with *inactive user*.
    /// Query and connection failures are
    /// propagated.
    #[instrument(skip(self, object), fields(model = T::Model::NAME))]
    pub async fn wrap<T: DiscordModel>(&self, object: T) -> DatabaseResult<Wrapped<T>> {
        self.load_object(object, true).await
    }

    /// Wrap an object and report whether its record existed already.
    #[deprecated(note = "use Database::wrap or the wrap_* methods instead")]
    pub async fn load<T: DiscordModel>(&self, object: T) -> DatabaseResult<(Wrapped<T>, bool)> {
        let wrapped = self.load_object(object, true).await?;
        let existed_already = wrapped.existed_already();
        Ok((wrapped, existed_already))
    }

    /// Wrap a user, or the user behind a member.
    pub async fn wrap_user(&self, user: impl IntoUser) -> DatabaseResult<Wrapped<User>> {
        self.wrap(user.into_user()).await
    }

    /// Wrap a guild.
    pub async fn wrap_guild(&self, guild: Guild) -> DatabaseResult<Wrapped<Guild>> {
        self.wrap(guild).await
    }

    async fn wrap_channel_of(
        &self,
        channel: GuildChannel,
        expected: ChannelKind,
    ) -> DatabaseResult<Wrapped<GuildChannel>> {
        if channel_kind(channel.kind) != Some(expected) {
            return Err(DatabaseError::new(DatabaseErrorKind::UnsupportedObject(
                format!("{:?} channel is not a {} channel", channel.kind, expected),
            )));
        }
        self.wrap(channel).await
    }

    /// Wrap a text channel.
    pub async fn wrap_text_channel(
        &self,
        channel: GuildChannel,
    ) -> DatabaseResult<Wrapped<GuildChannel>> {
        self.wrap_channel_of(channel, ChannelKind::Text).await
    }

    /// Wrap a voice channel.
    pub async fn wrap_voice_channel(
        &self,
        channel: GuildChannel,
    ) -> DatabaseResult<Wrapped<GuildChannel>> {
        self.wrap_channel_of(channel, ChannelKind::Voice).await
    }

    /// Wrap a channel category.
    pub async fn wrap_category_channel(
        &self,
        channel: GuildChannel,
    ) -> DatabaseResult<Wrapped<GuildChannel>> {
        self.wrap_channel_of(channel, ChannelKind::Category).await
    }

    /// Wrap a role.
    pub async fn wrap_role(&self, role: Role) -> DatabaseResult<Wrapped<Role>> {
        self.wrap(role).await
    }

    /// Wrap a custom emoji.
    pub async fn wrap_emoji(&self, emoji: Emoji) -> DatabaseResult<Wrapped<Emoji>> {
        self.wrap(emoji).await
    }

    /// Wrap a guild member.
    pub async fn wrap_member(&self, member: Member) -> DatabaseResult<Wrapped<Member>> {
        self.wrap(member).await
    }

    /// Wrap a message.
    ///
    /// With `create_if_new` unset a missing record is not written; the
    /// returned value carries an unsaved record and
    /// `existed_already() == false`.
    pub async fn wrap_message(
        &self,
        message: Message,
        create_if_new: bool,
    ) -> DatabaseResult<Wrapped<Message>> {
        self.load_object(message, create_if_new).await
    }

    /// Wrap with explicit control over record creation.
    pub async fn wrap_with<T: DiscordModel>(
        &self,
        object: T,
        create_if_new: bool,
    ) -> DatabaseResult<Wrapped<T>> {
        self.load_object(object, create_if_new).await
    }

    /// Re-read the record of `wrapped`.
    ///
    /// Returns whether the record still exists; when it does not, the
    /// in-memory record is left untouched.
    pub async fn reload<T: DiscordModel>(&self, wrapped: &mut Wrapped<T>) -> DatabaseResult<bool> {
        match self.repository.find::<T::Model>(wrapped.model.key()).await? {
            Some(model) => {
                wrapped.model = model;
                wrapped.existed_already = true;
                Ok(true)
            }
            None => {
                wrapped.existed_already = false;
                Ok(false)
            }
        }
    }

    /// Persist the record of `wrapped`.
    pub async fn save<T: DiscordModel>(&self, wrapped: &mut Wrapped<T>) -> DatabaseResult<()> {
        wrapped.model = self.repository.save(wrapped.model.clone()).await?;
        Ok(())
    }

    /// Delete the record of `wrapped`, returning whether a row was removed.
    pub async fn delete<T: DiscordModel>(&self, wrapped: &Wrapped<T>) -> DatabaseResult<bool> {
        self.repository
            .delete::<T::Model>(wrapped.model.key())
            .await
    }

    // ------------------------------------------------------------------
    // Users by id
    // ------------------------------------------------------------------

    /// Stored record of a user, active or not.
    pub async fn user_record(&self, user_id: UserId) -> DatabaseResult<Option<UserRow>> {
        self.repository.find(to_db_id(user_id.get())).await
    }

    /// Whether a user is flagged as bot staff.
    pub async fn is_staff(&self, user_id: UserId) -> DatabaseResult<bool> {
        Ok(self
            .user_record(user_id)
            .await?
            .is_some_and(|user| user.is_active && user.is_staff))
    }

    async fn drop_register_message(&self, user: &mut UserRow) -> DatabaseResult<()> {
        if let Some(message_id) = user.register_message_id.take() {
            self.repository.delete::<MessageRow>(message_id).await?;
        }
        Ok(())
    }

    /// Opt a user in.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn register_user(&self, user_id: UserId) -> DatabaseResult<RegisterOutcome> {
        let mut user = match self.user_record(user_id).await? {
            Some(user) if user.is_active => return Ok(RegisterOutcome::AlreadyRegistered),
            Some(user) => user,
            None => UserRow::inactive(to_db_id(user_id.get())),
        };
        self.drop_register_message(&mut user).await?;
        user.is_active = true;
        self.repository.save(user).await?;
        info!("User registered");
        Ok(RegisterOutcome::Registered)
    }

    /// Opt a user out.
    ///
    /// An active user's record is deleted. A user without a record, or with
    /// an unanswered prompt, is stored as inactive so the opt-out is
    /// remembered.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn unregister_user(&self, user_id: UserId) -> DatabaseResult<UnregisterOutcome> {
        match self.user_record(user_id).await? {
            Some(user) if user.has_opted_out() => Ok(UnregisterOutcome::AlreadyUnregistered),
            Some(mut user) if user.is_pending() => {
                self.drop_register_message(&mut user).await?;
                self.repository.save(user).await?;
                info!("Pending registration dropped, user opted out");
                Ok(UnregisterOutcome::Removed)
            }
            Some(mut user) => {
                self.drop_register_message(&mut user).await?;
                self.repository.delete::<UserRow>(user.id).await?;
                info!("User data removed");
                Ok(UnregisterOutcome::Removed)
            }
            None => {
                self.repository
                    .save(UserRow::inactive(to_db_id(user_id.get())))
                    .await?;
                info!("User opted out");
                Ok(UnregisterOutcome::Removed)
            }
        }
    }

    /// Record a registration prompt sent to a user without a record.
    ///
    /// A pending user's earlier prompt is replaced. Returns `false` and
    /// writes nothing when the user is registered or opted out.
    #[instrument(skip(self, prompt), fields(user_id = %user_id, message_id = prompt.id))]
    pub async fn begin_registration(
        &self,
        user_id: UserId,
        prompt: MessageRow,
    ) -> DatabaseResult<bool> {
        let mut user = match self.user_record(user_id).await? {
            Some(mut user) if user.is_pending() => {
                self.drop_register_message(&mut user).await?;
                user
            }
            Some(_) => return Ok(false),
            None => UserRow::inactive(to_db_id(user_id.get())),
        };
        user.register_message_id = Some(prompt.id);
        self.repository.save(prompt).await?;
        self.repository.save(user).await?;
        debug!("Registration pending");
        Ok(true)
    }

    /// Registration prompt of a pending user.
    pub async fn register_message(&self, user_id: UserId) -> DatabaseResult<Option<MessageRow>> {
        match self
            .user_record(user_id)
            .await?
            .and_then(|user| user.register_message_id)
        {
            Some(message_id) => self.repository.find(message_id).await,
            None => Ok(None),
        }
    }

    /// Activate a pending user who confirmed the prompt `message_id`.
    ///
    /// Returns `false` when `message_id` is not the user's prompt.
    #[instrument(skip(self), fields(user_id = %user_id, message_id = %message_id))]
    pub async fn confirm_registration(
        &self,
        user_id: UserId,
        message_id: MessageId,
    ) -> DatabaseResult<bool> {
        let Some(mut user) = self.user_record(user_id).await? else {
            return Ok(false);
        };
        if user.register_message_id != Some(to_db_id(message_id.get())) {
            return Ok(false);
        }
        self.drop_register_message(&mut user).await?;
        user.is_active = true;
        self.repository.save(user).await?;
        info!("Registration confirmed");
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Core settings
    // ------------------------------------------------------------------

    /// Settings of `namespace`, created with defaults when missing.
    ///
    /// Returns the row and whether it was created.
    #[instrument(skip(self))]
    pub async fn core_settings(&self, namespace: &str) -> DatabaseResult<(CoreSettingsRow, bool)> {
        let name = namespace.to_string();
        self.repository
            .get_or_create(name.clone(), move || CoreSettingsRow::new(name))
            .await
    }

    /// Persist core settings.
    pub async fn save_core_settings(
        &self,
        settings: CoreSettingsRow,
    ) -> DatabaseResult<CoreSettingsRow> {
        self.repository.save(settings).await
    }
}
