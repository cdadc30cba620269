// Channel list and active-channel timeline kept current from change feeds

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use huddle_store::repositories::{
    ChannelRepository, MemberRepository, MessageRepository, UserRepository, CHANNEL_MEMBERS, MESSAGES,
};
use huddle_store::{event_column, ChangeFeed, FeedEvent, FeedSpec, RemoteStore, StoreError};
use huddle_types::{
    canonical_direct_name, initials, AuthUser, Channel, ChangeEvent, ChangeKind, ChannelKind, Environment,
    MemberSummary, Message, User,
};

use crate::error::{Result, SyncError};
use crate::mode::SyncMode;
use crate::timeline::Timeline;

/// Channels shown when the store cannot be reached outside production
pub fn placeholder_channels() -> Vec<Channel> {
    vec![Channel::placeholder("1", "general"), Channel::placeholder("2", "random")]
}

/// Synchronized view of the signed-in user's channels and the active channel's messages
pub struct ChatSync {
    user: Option<AuthUser>,
    environment: Environment,
    channel_repo: ChannelRepository,
    member_repo: MemberRepository,
    message_repo: MessageRepository,
    user_repo: UserRepository,
    store: Arc<dyn RemoteStore>,
    mode: SyncMode,
    channels: Vec<Channel>,
    direct_messages: Vec<Channel>,
    active: Option<Channel>,
    messages: Timeline<Message>,
    users: HashMap<String, User>,
    loading: bool,
    last_error: Option<String>,
    message_feed: Option<ChangeFeed>,
    membership_feed: Option<ChangeFeed>,
}

impl ChatSync {
    pub fn new(store: Arc<dyn RemoteStore>, user: Option<AuthUser>, environment: Environment) -> Self {
        let mode = if store.is_available() {
            SyncMode::Live
        } else {
            SyncMode::degraded("store not configured")
        };
        Self {
            user,
            environment,
            channel_repo: ChannelRepository::new(store.clone()),
            member_repo: MemberRepository::new(store.clone()),
            message_repo: MessageRepository::new(store.clone()),
            user_repo: UserRepository::new(store.clone()),
            store,
            mode,
            channels: Vec::new(),
            direct_messages: Vec::new(),
            active: None,
            messages: Timeline::new(),
            users: HashMap::new(),
            loading: false,
            last_error: None,
            message_feed: None,
            membership_feed: None,
        }
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn mode(&self) -> &SyncMode {
        &self.mode
    }

    /// Group channels
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn direct_messages(&self) -> &[Channel] {
        &self.direct_messages
    }

    pub fn active_channel(&self) -> Option<&Channel> {
        self.active.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.entries()
    }

    pub fn users(&self) -> &HashMap<String, User> {
        &self.users
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the most recent failure, for inline banners
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn has_message_feed(&self) -> bool {
        self.message_feed.is_some()
    }

    /// Initial load: channels, users, membership feed, and a default selection
    pub async fn load(&mut self) -> SyncMode {
        self.loading = true;
        let mode = self.list_channels().await;

        if let Err(e) = self.fetch_users().await {
            tracing::debug!("User cache not loaded: {}", e);
        }
        if !mode.is_degraded() {
            if let Err(e) = self.watch_memberships().await {
                tracing::debug!("Membership feed not opened: {}", e);
            }
        }
        if self.active.is_none() {
            if let Some(first) = self.channels.first().cloned() {
                if let Err(e) = self.select(first).await {
                    tracing::debug!("Default channel not selected: {}", e);
                }
            }
        }

        self.loading = false;
        mode
    }

    /// Refresh channel and direct-message lists.
    ///
    /// Never fails: on total failure the lists become empty, or the fixed
    /// placeholder set outside production, and a degraded mode is returned.
    pub async fn list_channels(&mut self) -> SyncMode {
        let user_id = match &self.user {
            Some(user) => user.id.clone(),
            None => {
                self.direct_messages.clear();
                if self.store.is_available() && !self.mode.is_degraded() {
                    self.channels.clear();
                    return self.mode.clone();
                }
                let reason = self
                    .mode
                    .reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| "store not configured".to_string());
                self.fall_back(reason);
                return self.mode.clone();
            }
        };

        match self.fetch_channels(&user_id).await {
            Ok(channels) => {
                let (direct, group): (Vec<Channel>, Vec<Channel>) =
                    channels.into_iter().partition(Channel::is_direct);
                self.channels = group;
                self.direct_messages = direct;
                self.mode = SyncMode::Live;
                self.last_error = None;
            }
            Err(e) => {
                tracing::error!("Error fetching channels: {}", e);
                self.last_error = Some(e.to_string());
                self.direct_messages.clear();
                self.fall_back(e.to_string());
            }
        }
        self.mode.clone()
    }

    fn fall_back(&mut self, reason: String) {
        self.channels = if self.environment.is_production() {
            Vec::new()
        } else {
            placeholder_channels()
        };
        self.mode = SyncMode::degraded(reason);
    }

    async fn fetch_channels(&self, user_id: &str) -> std::result::Result<Vec<Channel>, StoreError> {
        match self.channel_repo.list_for_user(user_id).await {
            Ok(channels) => Ok(channels),
            Err(e) if e.is_unavailable() => Err(e),
            Err(e) => {
                tracing::warn!("Channel listing function failed, using membership join: {}", e);
                let all = self.channel_repo.list_all().await?;
                let member_of = self.member_repo.channel_ids_for_user(user_id).await?;
                Ok(all
                    .into_iter()
                    .filter(|c| member_of.iter().any(|id| *id == c.id))
                    .collect())
            }
        }
    }

    /// Make `channel` active: close the previous feed, open one for this
    /// channel, load its history and mark it read.
    pub async fn select(&mut self, channel: Channel) -> Result<()> {
        if let Some(feed) = self.message_feed.take() {
            feed.close().await;
        }
        self.messages.clear();
        self.active = Some(channel.clone());

        let spec = FeedSpec::new(MESSAGES)
            .on(FeedEvent::Insert)
            .filter_eq("channel_id", &channel.id);
        let mut first_error = None;
        match self.store.subscribe(spec).await {
            Ok(feed) => self.message_feed = Some(feed),
            Err(e) => {
                tracing::error!("Error subscribing to channel {}: {}", channel.id, e);
                first_error = Some(SyncError::from(e));
            }
        }

        match self.message_repo.list_for_channel(&channel.id).await {
            Ok(history) => self.messages.extend(history),
            Err(e) => {
                tracing::error!("Error fetching messages: {}", e);
                first_error.get_or_insert(SyncError::from(e));
            }
        }

        if let Some(user) = &self.user {
            if let Err(e) = self.member_repo.mark_read(&channel.id, &user.id, Utc::now()).await {
                tracing::warn!("Could not update last read marker for {}: {}", channel.id, e);
            }
        }

        match first_error {
            Some(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Select a channel already listed, or fetch it by id
    pub async fn select_by_id(&mut self, channel_id: &str) -> Result<()> {
        let known = self
            .channels
            .iter()
            .chain(self.direct_messages.iter())
            .find(|c| c.id == channel_id)
            .cloned();
        let channel = match known {
            Some(channel) => channel,
            None => self
                .channel_repo
                .get(channel_id)
                .await
                .map_err(|e| self.record(e.into()))?
                .ok_or(SyncError::NoActiveSelection("channel"))?,
        };
        self.select(channel).await
    }

    /// Post a message to the active channel
    pub async fn send(&mut self, content: &str) -> Result<Message> {
        if content.trim().is_empty() {
            return Err(SyncError::EmptyContent);
        }
        let user_id = self.user.as_ref().ok_or(SyncError::NotAuthenticated)?.id.clone();
        let channel_id = self
            .active
            .as_ref()
            .ok_or(SyncError::NoActiveSelection("channel"))?
            .id
            .clone();

        match self.message_repo.insert(&channel_id, &user_id, content).await {
            Ok(message) => {
                self.messages.insert(message.clone());
                Ok(message)
            }
            Err(e) => {
                tracing::error!("Error sending message: {}", e);
                Err(self.record(e.into()))
            }
        }
    }

    /// Create a channel and make it active.
    ///
    /// The privileged stored function is tried first; the plain insert path
    /// also adds the creator as admin so the channel is readable right away.
    pub async fn create_channel(&mut self, name: &str, kind: ChannelKind, is_private: bool) -> Result<Channel> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SyncError::MissingName("channel name"));
        }
        let user_id = self.user.as_ref().ok_or(SyncError::NotAuthenticated)?.id.clone();

        let created = match self.channel_repo.create_privileged(name, kind, is_private).await {
            Ok(Some(channel)) => Ok(channel),
            Ok(None) => self.insert_channel(name, kind, is_private, &user_id).await,
            Err(e) if e.is_unavailable() => Err(e),
            Err(e) => {
                tracing::warn!("Channel creation function unavailable, inserting directly: {}", e);
                self.insert_channel(name, kind, is_private, &user_id).await
            }
        };

        let channel = created.map_err(|e| {
            tracing::error!("Error creating channel: {}", e);
            self.record(e.into())
        })?;
        self.activate_new(channel.clone()).await;
        Ok(channel)
    }

    async fn insert_channel(
        &self,
        name: &str,
        kind: ChannelKind,
        is_private: bool,
        user_id: &str,
    ) -> std::result::Result<Channel, StoreError> {
        let channel = self.channel_repo.insert(name, kind, is_private, user_id).await?;
        self.ensure_member(&channel.id, user_id, true).await?;
        Ok(channel)
    }

    /// Membership insert that treats an existing row as success
    async fn ensure_member(&self, channel_id: &str, user_id: &str, is_admin: bool) -> std::result::Result<(), StoreError> {
        match self.member_repo.add(channel_id, user_id, is_admin).await {
            Ok(_) | Err(StoreError::Conflict(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Open (or create) the direct channel with another user and make it active.
    ///
    /// Both participants compute the same canonical name, and the lookup
    /// resolves to the earliest channel with that name.
    pub async fn create_direct_channel(&mut self, other_user_id: &str) -> Result<Channel> {
        let other_user_id = other_user_id.trim();
        if other_user_id.is_empty() {
            return Err(SyncError::MissingName("user id"));
        }
        let user_id = self.user.as_ref().ok_or(SyncError::NotAuthenticated)?.id.clone();
        let name = canonical_direct_name(&user_id, other_user_id);

        let channel = self
            .open_direct(&name, &user_id, other_user_id)
            .await
            .map_err(|e| {
                tracing::error!("Error creating direct message: {}", e);
                self.record(e.into())
            })?;
        self.activate_new(channel.clone()).await;
        Ok(channel)
    }

    async fn open_direct(
        &self,
        name: &str,
        user_id: &str,
        other_user_id: &str,
    ) -> std::result::Result<Channel, StoreError> {
        if let Some(existing) = self.channel_repo.find_direct(name).await? {
            return Ok(existing);
        }

        match self.channel_repo.create_direct_privileged(other_user_id, name).await {
            Ok(Some(channel)) => return Ok(channel),
            Ok(None) => {}
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => tracing::warn!("Direct channel function unavailable, inserting directly: {}", e),
        }

        let channel = match self
            .channel_repo
            .insert(name, ChannelKind::Direct, true, user_id)
            .await
        {
            Ok(channel) => channel,
            Err(StoreError::Conflict(message)) => {
                tracing::info!("Direct channel {} created concurrently, reusing it", name);
                self.channel_repo
                    .find_direct(name)
                    .await?
                    .ok_or(StoreError::Conflict(message))?
            }
            Err(e) => return Err(e),
        };

        self.ensure_member(&channel.id, user_id, true).await?;
        self.ensure_member(&channel.id, other_user_id, false).await?;
        Ok(channel)
    }

    async fn activate_new(&mut self, channel: Channel) {
        self.remember(channel.clone());
        if let Err(e) = self.select(channel).await {
            tracing::warn!("New channel created but not selected: {}", e);
        }
    }

    fn remember(&mut self, channel: Channel) {
        let list = if channel.is_direct() {
            &mut self.direct_messages
        } else {
            &mut self.channels
        };
        if !list.iter().any(|c| c.id == channel.id) {
            list.push(channel);
        }
    }

    fn forget(&mut self, channel_id: &str) {
        self.channels.retain(|c| c.id != channel_id);
        self.direct_messages.retain(|c| c.id != channel_id);
    }

    /// Watch the user's membership rows so joins and removals show up live
    pub async fn watch_memberships(&mut self) -> Result<()> {
        let user_id = self.user.as_ref().ok_or(SyncError::NotAuthenticated)?.id.clone();
        if let Some(feed) = self.membership_feed.take() {
            feed.close().await;
        }
        let spec = FeedSpec::new(CHANNEL_MEMBERS).filter_eq("user_id", &user_id);
        let feed = self.store.subscribe(spec).await.map_err(|e| self.record(e.into()))?;
        self.membership_feed = Some(feed);
        Ok(())
    }

    /// Wait for the next event on any open feed. Cancel safe.
    ///
    /// `None` once no feed is open.
    pub async fn recv_change(&mut self) -> Option<ChangeEvent> {
        loop {
            let (event, from_messages) = match (self.message_feed.as_mut(), self.membership_feed.as_mut()) {
                (None, None) => return None,
                (Some(messages), None) => (messages.recv().await, true),
                (None, Some(members)) => (members.recv().await, false),
                (Some(messages), Some(members)) => tokio::select! {
                    event = messages.recv() => (event, true),
                    event = members.recv() => (event, false),
                },
            };
            match event {
                Some(event) => return Some(event),
                None if from_messages => {
                    tracing::warn!("Message feed ended");
                    self.message_feed = None;
                }
                None => {
                    tracing::warn!("Membership feed ended");
                    self.membership_feed = None;
                }
            }
        }
    }

    /// Events already buffered on the open feeds
    pub fn drain_changes(&mut self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        for feed in [self.message_feed.as_mut(), self.membership_feed.as_mut()].into_iter().flatten() {
            while let Some(event) = feed.try_recv() {
                events.push(event);
            }
        }
        events
    }

    /// Apply buffered events; returns how many were applied
    pub async fn sync_pending(&mut self) -> usize {
        let mut applied = 0;
        for event in self.drain_changes() {
            match self.apply_change(event).await {
                Ok(()) => applied += 1,
                Err(e) => tracing::warn!("Skipping change event: {}", e),
            }
        }
        applied
    }

    /// Apply one change to the in-memory view without a full reload
    pub async fn apply_change(&mut self, event: ChangeEvent) -> Result<()> {
        match event.table.as_str() {
            MESSAGES => self.apply_message_change(event),
            CHANNEL_MEMBERS => self.apply_membership_change(event).await,
            other => {
                tracing::debug!("Ignoring change on {}", other);
                Ok(())
            }
        }
    }

    fn apply_message_change(&mut self, event: ChangeEvent) -> Result<()> {
        if event.kind != ChangeKind::Insert {
            return Ok(());
        }
        let message: Message = event
            .record_as()
            .ok_or_else(|| SyncError::Decode("message row".to_string()))?;
        let is_active = self.active.as_ref().is_some_and(|c| c.id == message.channel_id);
        if is_active && self.messages.insert(message) {
            tracing::debug!("Appended live message to active channel");
        }
        Ok(())
    }

    async fn apply_membership_change(&mut self, event: ChangeEvent) -> Result<()> {
        match event.kind {
            ChangeKind::Update => Ok(()),
            ChangeKind::Insert => {
                let channel_id = event_column(&event, "channel_id")
                    .ok_or_else(|| SyncError::Decode("membership row".to_string()))?;
                if self.knows(&channel_id) {
                    return Ok(());
                }
                match self.channel_repo.get(&channel_id).await {
                    Ok(Some(channel)) => self.remember(channel),
                    Ok(None) => tracing::debug!("Joined channel {} is not readable yet", channel_id),
                    Err(e) => return Err(self.record(e.into())),
                }
                Ok(())
            }
            ChangeKind::Delete => {
                match event_column(&event, "channel_id") {
                    Some(channel_id) => self.forget(&channel_id),
                    None => {
                        self.list_channels().await;
                    }
                }
                Ok(())
            }
        }
    }

    fn knows(&self, channel_id: &str) -> bool {
        self.channels
            .iter()
            .chain(self.direct_messages.iter())
            .any(|c| c.id == channel_id)
    }

    /// Refresh the user cache; names are normalized for display
    pub async fn fetch_users(&mut self) -> Result<()> {
        if self.user.is_none() {
            return Err(SyncError::NotAuthenticated);
        }
        let users = self.user_repo.list_all().await.map_err(|e| {
            tracing::error!("Error fetching users: {}", e);
            self.record(e.into())
        })?;
        self.users = users
            .into_iter()
            .map(|mut user| {
                user.name = Some(user.display_name());
                (user.id.clone(), user)
            })
            .collect();
        Ok(())
    }

    /// Direct channels show the other participant's name
    pub fn channel_display_name(&self, channel: &Channel) -> String {
        if !channel.is_direct() {
            return channel.name.clone();
        }
        let me = self.user.as_ref().map(|u| u.id.as_str()).unwrap_or_default();
        channel
            .other_participant(me)
            .and_then(|id| self.users.get(id))
            .map(User::display_name)
            .unwrap_or_else(|| "Direct Message".to_string())
    }

    pub fn user_initials(&self, user_id: &str) -> String {
        match self.users.get(user_id) {
            Some(user) => user.initials(),
            None => initials(""),
        }
    }

    /// Member listing for a channel, admins first
    pub async fn channel_members(&mut self, channel_id: &str) -> Result<Vec<MemberSummary>> {
        let user_id = self.user.as_ref().ok_or(SyncError::NotAuthenticated)?.id.clone();
        match self.member_repo.summaries_rpc(channel_id, &user_id).await {
            Ok(members) => return Ok(members),
            Err(e) if e.is_unavailable() => return Err(self.record(e.into())),
            Err(e) => tracing::warn!("Member listing function failed, joining directly: {}", e),
        }
        self.member_repo.summaries_joined(channel_id).await.map_err(|e| {
            tracing::error!("Error fetching members: {}", e);
            self.record(e.into())
        })
    }

    /// Close every feed owned by this hook
    pub async fn dispose(&mut self) {
        if let Some(feed) = self.message_feed.take() {
            feed.close().await;
        }
        if let Some(feed) = self.membership_feed.take() {
            feed.close().await;
        }
    }

    fn record(&mut self, error: SyncError) -> SyncError {
        self.last_error = Some(error.to_string());
        error
    }
}
