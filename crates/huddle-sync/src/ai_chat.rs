// AI chat list, active conversation and model reply orchestration

use std::sync::Arc;

use chrono::Utc;
use huddle_llm::{ChatSession, Generator};
use huddle_store::repositories::{
    AiChatRepository, AiMessageRepository, ParticipantRepository, AI_CHATS, AI_MESSAGES,
};
use huddle_store::{event_column, ChangeFeed, FeedSpec, RemoteStore};
use huddle_types::{AiChat, AiChatParticipant, AiMessage, AuthUser, ChangeEvent, ChangeKind, Privacy};

use crate::error::{Result, SyncError};
use crate::timeline::Timeline;

pub struct AiChatSync {
    user: Option<AuthUser>,
    generator: Generator,
    store: Arc<dyn RemoteStore>,
    chat_repo: AiChatRepository,
    message_repo: AiMessageRepository,
    participant_repo: ParticipantRepository,
    chats: Vec<AiChat>,
    active: Option<AiChat>,
    messages: Timeline<AiMessage>,
    participants: Vec<AiChatParticipant>,
    session: Option<ChatSession>,
    loading: bool,
    sending: bool,
    last_error: Option<String>,
    chats_feed: Option<ChangeFeed>,
    messages_feed: Option<ChangeFeed>,
}

impl AiChatSync {
    pub fn new(store: Arc<dyn RemoteStore>, generator: Generator, user: Option<AuthUser>) -> Self {
        Self {
            user,
            generator,
            chat_repo: AiChatRepository::new(store.clone()),
            message_repo: AiMessageRepository::new(store.clone()),
            participant_repo: ParticipantRepository::new(store.clone()),
            store,
            chats: Vec::new(),
            active: None,
            messages: Timeline::new(),
            participants: Vec::new(),
            session: None,
            loading: false,
            sending: false,
            last_error: None,
            chats_feed: None,
            messages_feed: None,
        }
    }

    pub fn chats(&self) -> &[AiChat] {
        &self.chats
    }

    pub fn active_chat(&self) -> Option<&AiChat> {
        self.active.as_ref()
    }

    pub fn messages(&self) -> &[AiMessage] {
        self.messages.entries()
    }

    pub fn participants(&self) -> &[AiChatParticipant] {
        &self.participants
    }

    /// Conversation context for the next contextual reply
    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True while a create or send is in flight; callers disable input meanwhile
    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn has_message_feed(&self) -> bool {
        self.messages_feed.is_some()
    }

    pub async fn load(&mut self) -> Result<()> {
        self.loading = true;
        let result = self.load_inner().await;
        self.loading = false;
        result
    }

    async fn load_inner(&mut self) -> Result<()> {
        self.list_chats().await?;
        if let Err(e) = self.watch_chats().await {
            tracing::debug!("Chat list feed not opened: {}", e);
        }
        if self.active.is_none() {
            if let Some(first) = self.chats.first().cloned() {
                self.select(first).await?;
            }
        }
        Ok(())
    }

    /// Refresh the chat list, most recently updated first
    pub async fn list_chats(&mut self) -> Result<&[AiChat]> {
        if self.user.is_none() {
            return Err(SyncError::NotAuthenticated);
        }
        match self.chat_repo.list().await {
            Ok(chats) => {
                self.chats = chats;
                self.last_error = None;
                Ok(&self.chats)
            }
            Err(e) => {
                tracing::error!("Error fetching AI chats: {}", e);
                Err(self.record(e.into()))
            }
        }
    }

    pub async fn watch_chats(&mut self) -> Result<()> {
        if let Some(feed) = self.chats_feed.take() {
            feed.close().await;
        }
        let feed = self
            .store
            .subscribe(FeedSpec::new(AI_CHATS))
            .await
            .map_err(|e| self.record(e.into()))?;
        self.chats_feed = Some(feed);
        Ok(())
    }

    /// Make `chat` active: swap the message feed, load history, rebuild the
    /// session from human-authored messages and load participants.
    pub async fn select(&mut self, chat: AiChat) -> Result<()> {
        if let Some(feed) = self.messages_feed.take() {
            feed.close().await;
        }
        self.messages.clear();
        self.participants.clear();
        self.session = None;
        self.active = Some(chat.clone());

        match self
            .store
            .subscribe(FeedSpec::new(AI_MESSAGES).filter_eq("chat_id", &chat.id))
            .await
        {
            Ok(feed) => self.messages_feed = Some(feed),
            Err(e) => tracing::error!("Error subscribing to AI chat {}: {}", chat.id, e),
        }

        let history = self.message_repo.list_for_chat(&chat.id).await.map_err(|e| {
            tracing::error!("Error fetching messages: {}", e);
            self.record(e.into())
        })?;
        self.messages.extend(history);
        self.session = Some(session_from_history(self.messages.entries()));

        match self.participant_repo.list_for_chat(&chat.id).await {
            Ok(participants) => self.participants = participants,
            Err(e) => tracing::error!("Error fetching participants: {}", e),
        }
        Ok(())
    }

    pub async fn select_by_id(&mut self, chat_id: &str) -> Result<()> {
        let known = self.chats.iter().find(|c| c.id == chat_id).cloned();
        let chat = match known {
            Some(chat) => chat,
            None => self
                .chat_repo
                .get(chat_id)
                .await
                .map_err(|e| self.record(e.into()))?
                .ok_or(SyncError::NoActiveSelection("chat"))?,
        };
        self.select(chat).await
    }

    /// Start a chat from a first prompt.
    ///
    /// Steps run in order (title, chat row, user message, model reply, AI
    /// message) and stop at the first failure; rows already written stay.
    pub async fn create_chat(&mut self, prompt: &str) -> Result<AiChat> {
        if prompt.trim().is_empty() {
            return Err(SyncError::EmptyContent);
        }
        let user_id = self.user.as_ref().ok_or(SyncError::NotAuthenticated)?.id.clone();

        self.sending = true;
        let result = self.create_chat_steps(prompt, &user_id).await;
        self.sending = false;

        let chat = result.map_err(|e| {
            tracing::error!("Error creating AI chat: {}", e);
            self.record(e)
        })?;

        self.upsert_chat(chat.clone());
        if let Err(e) = self.select(chat.clone()).await {
            tracing::warn!("AI chat created but not selected: {}", e);
        }
        Ok(chat)
    }

    async fn create_chat_steps(&self, prompt: &str, user_id: &str) -> Result<AiChat> {
        let title = self.generator.generate_chat_title(prompt).await;
        let chat = self.chat_repo.insert(&title, user_id, Privacy::Private).await?;
        self.message_repo.insert_human(&chat.id, user_id, prompt).await?;
        let reply = self.generator.generate_response(prompt).await?;
        self.message_repo.insert_ai(&chat.id, &reply).await?;
        Ok(chat)
    }

    /// Send a prompt to the active chat and store the model's reply.
    ///
    /// Returns the stored AI message.
    pub async fn send_message(&mut self, content: &str) -> Result<AiMessage> {
        if content.trim().is_empty() {
            return Err(SyncError::EmptyContent);
        }
        let user_id = self.user.as_ref().ok_or(SyncError::NotAuthenticated)?.id.clone();
        let chat_id = self
            .active
            .as_ref()
            .ok_or(SyncError::NoActiveSelection("chat"))?
            .id
            .clone();

        self.sending = true;
        let result = self.send_steps(&chat_id, &user_id, content).await;
        self.sending = false;

        let reply = result.map_err(|e| {
            tracing::error!("Error sending message: {}", e);
            self.record(e)
        })?;

        match self.chat_repo.touch(&chat_id, Utc::now()).await {
            Ok(updated) => {
                for chat in updated {
                    self.upsert_chat(chat);
                }
            }
            Err(e) => tracing::warn!("Could not bump chat timestamp: {}", e),
        }
        Ok(reply)
    }

    async fn send_steps(&mut self, chat_id: &str, user_id: &str, content: &str) -> Result<AiMessage> {
        let prompt = self.message_repo.insert_human(chat_id, user_id, content).await?;
        self.messages.insert(prompt);

        let reply = match self.session.as_mut() {
            Some(session) => self.generator.send_in_session(session, content).await?,
            None => self.generator.generate_response(content).await?,
        };

        let stored = self.message_repo.insert_ai(chat_id, &reply).await?;
        self.messages.insert(stored.clone());
        Ok(stored)
    }

    /// Change who can see a chat. Only the creator's update matches a row.
    pub async fn update_chat_privacy(&mut self, chat_id: &str, privacy: Privacy) -> Result<AiChat> {
        let user_id = self.user.as_ref().ok_or(SyncError::NotAuthenticated)?.id.clone();
        let updated = self
            .chat_repo
            .set_privacy(chat_id, &user_id, privacy)
            .await
            .map_err(|e| {
                tracing::error!("Error updating chat privacy: {}", e);
                self.record(e.into())
            })?;

        let chat = updated
            .into_iter()
            .next()
            .ok_or_else(|| self.record(SyncError::NotCreator("change privacy")))?;
        self.upsert_chat(chat.clone());
        Ok(chat)
    }

    /// Delete a chat. Messages and participants are removed by the store.
    pub async fn delete_chat(&mut self, chat_id: &str) -> Result<()> {
        let user_id = self.user.as_ref().ok_or(SyncError::NotAuthenticated)?.id.clone();
        let removed = self.chat_repo.delete(chat_id, &user_id).await.map_err(|e| {
            tracing::error!("Error deleting chat: {}", e);
            self.record(e.into())
        })?;
        if removed == 0 {
            return Err(self.record(SyncError::NotCreator("delete this chat")));
        }
        self.forget_chat(chat_id).await;
        Ok(())
    }

    pub async fn add_participant(&mut self, chat_id: &str, user_id: &str) -> Result<AiChatParticipant> {
        if user_id.trim().is_empty() {
            return Err(SyncError::MissingName("user id"));
        }
        if self.user.is_none() {
            return Err(SyncError::NotAuthenticated);
        }
        let participant = self
            .participant_repo
            .add(chat_id, user_id, false)
            .await
            .map_err(|e| {
                tracing::error!("Error adding participant: {}", e);
                self.record(e.into())
            })?;
        if self.is_active(chat_id) {
            self.participants.push(participant.clone());
        }
        Ok(participant)
    }

    /// Returns the number of participant rows removed
    pub async fn remove_participant(&mut self, chat_id: &str, user_id: &str) -> Result<usize> {
        if self.user.is_none() {
            return Err(SyncError::NotAuthenticated);
        }
        let removed = self
            .participant_repo
            .remove(chat_id, user_id)
            .await
            .map_err(|e| {
                tracing::error!("Error removing participant: {}", e);
                self.record(e.into())
            })?;
        if self.is_active(chat_id) {
            self.participants.retain(|p| p.user_id != user_id);
        }
        Ok(removed)
    }

    /// Wait for the next event on any open feed. Cancel safe.
    pub async fn recv_change(&mut self) -> Option<ChangeEvent> {
        loop {
            let (event, from_messages) = match (self.messages_feed.as_mut(), self.chats_feed.as_mut()) {
                (None, None) => return None,
                (Some(messages), None) => (messages.recv().await, true),
                (None, Some(chats)) => (chats.recv().await, false),
                (Some(messages), Some(chats)) => tokio::select! {
                    event = messages.recv() => (event, true),
                    event = chats.recv() => (event, false),
                },
            };
            match event {
                Some(event) => return Some(event),
                None if from_messages => self.messages_feed = None,
                None => self.chats_feed = None,
            }
        }
    }

    pub fn drain_changes(&mut self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        for feed in [self.messages_feed.as_mut(), self.chats_feed.as_mut()].into_iter().flatten() {
            while let Some(event) = feed.try_recv() {
                events.push(event);
            }
        }
        events
    }

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

    /// Apply one change to the chat list or the active conversation
    pub async fn apply_change(&mut self, event: ChangeEvent) -> Result<()> {
        match event.table.as_str() {
            AI_CHATS => self.apply_chat_change(event).await,
            AI_MESSAGES => self.apply_message_change(event),
            other => {
                tracing::debug!("Ignoring change on {}", other);
                Ok(())
            }
        }
    }

    async fn apply_chat_change(&mut self, event: ChangeEvent) -> Result<()> {
        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let chat: AiChat = event
                    .record_as()
                    .ok_or_else(|| SyncError::Decode("ai chat row".to_string()))?;
                self.upsert_chat(chat);
            }
            ChangeKind::Delete => {
                let chat_id = event_column(&event, "id")
                    .ok_or_else(|| SyncError::Decode("ai chat key".to_string()))?;
                self.forget_chat(&chat_id).await;
            }
        }
        Ok(())
    }

    fn apply_message_change(&mut self, event: ChangeEvent) -> Result<()> {
        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let message: AiMessage = event
                    .record_as()
                    .ok_or_else(|| SyncError::Decode("ai message row".to_string()))?;
                if !self.is_active(&message.chat_id) {
                    return Ok(());
                }
                if event.kind == ChangeKind::Update {
                    self.messages.upsert(message);
                    return Ok(());
                }
                let is_human = !message.is_ai;
                let content = message.content.clone();
                if self.messages.insert(message) && is_human {
                    // Prompts from other participants become context for the next reply
                    if let Some(session) = self.session.as_mut() {
                        session.push_user(content);
                    }
                }
            }
            ChangeKind::Delete => {
                if let Some(id) = event_column(&event, "id") {
                    self.messages.remove(&id);
                }
            }
        }
        Ok(())
    }

    fn upsert_chat(&mut self, chat: AiChat) {
        if self.is_active(&chat.id) {
            self.active = Some(chat.clone());
        }
        match self.chats.iter_mut().find(|c| c.id == chat.id) {
            Some(existing) => *existing = chat,
            None => self.chats.push(chat),
        }
        self.chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }

    async fn forget_chat(&mut self, chat_id: &str) {
        self.chats.retain(|c| c.id != chat_id);
        if self.is_active(chat_id) {
            if let Some(feed) = self.messages_feed.take() {
                feed.close().await;
            }
            self.active = None;
            self.messages.clear();
            self.participants.clear();
            self.session = None;
        }
    }

    fn is_active(&self, chat_id: &str) -> bool {
        self.active.as_ref().is_some_and(|c| c.id == chat_id)
    }

    pub async fn dispose(&mut self) {
        if let Some(feed) = self.messages_feed.take() {
            feed.close().await;
        }
        if let Some(feed) = self.chats_feed.take() {
            feed.close().await;
        }
    }

    fn record(&mut self, error: SyncError) -> SyncError {
        self.last_error = Some(error.to_string());
        error
    }
}

/// Seed a session from stored history. Only human prompts are replayed.
fn session_from_history(history: &[AiMessage]) -> ChatSession {
    ChatSession::from_user_prompts(
        history
            .iter()
            .filter(|m| !m.is_ai)
            .map(|m| m.content.clone()),
    )
}
