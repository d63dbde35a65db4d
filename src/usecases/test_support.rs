//! Recording mock gateway for use-case tests.
//!
//! Mirrors Telegram semantics just enough for orchestration scenarios:
//! history pages are served newest-first with bound filtering, forwards and
//! copies honor the source's content-protection flag, downloads write
//! deterministic bytes so fingerprints are stable across test runs.

use crate::domain::{
    ChannelId, ChatInfo, DomainError, MediaItem, Message, OutgoingMedia,
};
use crate::ports::{NewMessageStream, TgGateway};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Forward {
        dst: ChannelId,
        src: ChannelId,
        ids: Vec<i32>,
        silent: bool,
    },
    Copy {
        dst: ChannelId,
        src: ChannelId,
        ids: Vec<i32>,
        caption: Option<String>,
        silent: bool,
    },
    SendAlbum {
        dst: ChannelId,
        /// True when every item is a local file (re-upload path).
        local: bool,
        count: usize,
        caption: Option<String>,
        silent: bool,
    },
    SendMessage {
        dst: ChannelId,
        text: String,
        html: bool,
        disable_preview: bool,
    },
    Download {
        chat: ChannelId,
        message_id: i32,
    },
}

#[derive(Default)]
struct State {
    chats: HashMap<ChannelId, ChatInfo>,
    usernames: HashMap<String, ChannelId>,
    history: HashMap<ChannelId, Vec<Message>>,
    calls: Vec<GatewayCall>,
    /// Copy attempts into these targets fail with `ForwardsRestricted`.
    restricted_copy_targets: HashSet<ChannelId>,
    /// Forward/copy attempts from these sources fail with
    /// `ForwardsRestricted` even when `chat_info` still claims otherwise
    /// (stale-permission scenario).
    restricted_wire_sources: HashSet<ChannelId>,
    /// One-shot error queue per operation name.
    fail_once: HashMap<String, VecDeque<DomainError>>,
    live_tx: Option<(HashSet<ChannelId>, mpsc::Sender<Message>)>,
}

pub struct MockGateway {
    state: Mutex<State>,
    next_out_id: AtomicI32,
    resolve_calls: AtomicUsize,
    chat_info_calls: AtomicUsize,
    chat_info_delay: Mutex<Duration>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            next_out_id: AtomicI32::new(10_000),
            resolve_calls: AtomicUsize::new(0),
            chat_info_calls: AtomicUsize::new(0),
            chat_info_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn add_chat(&self, id: ChannelId, label: &str, can_forward: bool) {
        self.state.lock().unwrap().chats.insert(
            id,
            ChatInfo {
                id,
                label: label.into(),
                can_forward,
            },
        );
    }

    pub fn add_username(&self, name: &str, id: ChannelId) {
        self.state.lock().unwrap().usernames.insert(name.into(), id);
    }

    pub fn set_history(&self, chat: ChannelId, mut messages: Vec<Message>) {
        messages.sort_by_key(|m| m.id);
        self.state.lock().unwrap().history.insert(chat, messages);
    }

    pub fn restrict_copy_target(&self, target: ChannelId) {
        self.state
            .lock()
            .unwrap()
            .restricted_copy_targets
            .insert(target);
    }

    pub fn restrict_wire_source(&self, source: ChannelId) {
        self.state
            .lock()
            .unwrap()
            .restricted_wire_sources
            .insert(source);
    }

    pub fn fail_once(&self, operation: &str, error: DomainError) {
        self.state
            .lock()
            .unwrap()
            .fail_once
            .entry(operation.into())
            .or_default()
            .push_back(error);
    }

    pub fn set_chat_info_delay(&self, delay: Duration) {
        *self.chat_info_delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn chat_info_calls(&self) -> usize {
        self.chat_info_calls.load(Ordering::SeqCst)
    }

    /// Inject a live message; dropped unless a subscription covers its chat.
    pub async fn push_live(&self, msg: Message) {
        let tx = {
            let state = self.state.lock().unwrap();
            match &state.live_tx {
                Some((chats, tx)) if chats.contains(&msg.chat_id) => Some(tx.clone()),
                _ => None,
            }
        };
        if let Some(tx) = tx {
            let _ = tx.send(msg).await;
        }
    }

    pub fn subscribed_chats(&self) -> Option<HashSet<ChannelId>> {
        self.state
            .lock()
            .unwrap()
            .live_tx
            .as_ref()
            .map(|(chats, _)| chats.clone())
    }

    fn take_failure(&self, operation: &str) -> Option<DomainError> {
        self.state
            .lock()
            .unwrap()
            .fail_once
            .get_mut(operation)
            .and_then(|q| q.pop_front())
    }

    fn alloc_ids(&self, n: usize) -> Vec<i32> {
        (0..n)
            .map(|_| self.next_out_id.fetch_add(1, Ordering::SeqCst))
            .collect()
    }

    fn source_can_forward(&self, src: ChannelId) -> bool {
        let state = self.state.lock().unwrap();
        if state.restricted_wire_sources.contains(&src) {
            return false;
        }
        state
            .chats
            .get(&src)
            .map(|c| c.can_forward)
            .unwrap_or(true)
    }
}

#[async_trait::async_trait]
impl TgGateway for MockGateway {
    async fn resolve(&self, identifier: &str) -> Result<ChannelId, DomainError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .usernames
            .get(identifier)
            .copied()
            .ok_or_else(|| DomainError::InvalidIdentifier(identifier.into()))
    }

    async fn chat_info(&self, id: ChannelId) -> Result<ChatInfo, DomainError> {
        let delay = *self.chat_info_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.chat_info_calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .chats
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::NotAccessible(format!("chat {}", id)))
    }

    async fn newest_message_id(&self, chat: ChannelId) -> Result<i32, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .history
            .get(&chat)
            .and_then(|msgs| msgs.last())
            .map(|m| m.id)
            .unwrap_or(0))
    }

    async fn get_history(
        &self,
        chat: ChannelId,
        min_id: i32,
        max_id: i32,
        limit: i32,
    ) -> Result<Vec<Message>, DomainError> {
        if let Some(err) = self.take_failure("get_history") {
            return Err(err);
        }
        let state = self.state.lock().unwrap();
        let Some(msgs) = state.history.get(&chat) else {
            return Ok(vec![]);
        };
        // Newest-first page, like messages.getHistory.
        let mut page: Vec<Message> = msgs
            .iter()
            .filter(|m| m.id > min_id && (max_id == 0 || m.id < max_id))
            .cloned()
            .collect();
        page.sort_by_key(|m| std::cmp::Reverse(m.id));
        page.truncate(limit.max(0) as usize);
        Ok(page)
    }

    async fn get_messages_by_id(
        &self,
        chat: ChannelId,
        ids: &[i32],
    ) -> Result<Vec<Message>, DomainError> {
        let state = self.state.lock().unwrap();
        let Some(msgs) = state.history.get(&chat) else {
            return Ok(vec![]);
        };
        Ok(msgs.iter().filter(|m| ids.contains(&m.id)).cloned().collect())
    }

    async fn forward_messages(
        &self,
        dst: ChannelId,
        src: ChannelId,
        ids: &[i32],
        silent: bool,
    ) -> Result<Vec<i32>, DomainError> {
        if let Some(err) = self.take_failure("forward_messages") {
            return Err(err);
        }
        if !self.source_can_forward(src) {
            return Err(DomainError::ForwardsRestricted);
        }
        self.state.lock().unwrap().calls.push(GatewayCall::Forward {
            dst,
            src,
            ids: ids.to_vec(),
            silent,
        });
        Ok(self.alloc_ids(ids.len()))
    }

    async fn copy_messages(
        &self,
        dst: ChannelId,
        src: ChannelId,
        ids: &[i32],
        caption: Option<&str>,
        silent: bool,
    ) -> Result<Vec<i32>, DomainError> {
        if let Some(err) = self.take_failure("copy_messages") {
            return Err(err);
        }
        if !self.source_can_forward(src)
            || self
                .state
                .lock()
                .unwrap()
                .restricted_copy_targets
                .contains(&dst)
        {
            return Err(DomainError::ForwardsRestricted);
        }
        self.state.lock().unwrap().calls.push(GatewayCall::Copy {
            dst,
            src,
            ids: ids.to_vec(),
            caption: caption.map(String::from),
            silent,
        });
        Ok(self.alloc_ids(ids.len()))
    }

    async fn send_media_group(
        &self,
        dst: ChannelId,
        items: &[OutgoingMedia],
        silent: bool,
    ) -> Result<Vec<i32>, DomainError> {
        if let Some(err) = self.take_failure("send_media_group") {
            return Err(err);
        }
        let local = items
            .iter()
            .all(|i| matches!(i.item, MediaItem::Local { .. }));
        self.state.lock().unwrap().calls.push(GatewayCall::SendAlbum {
            dst,
            local,
            count: items.len(),
            caption: items.first().and_then(|i| i.caption.clone()),
            silent,
        });
        Ok(self.alloc_ids(items.len()))
    }

    async fn send_message(
        &self,
        dst: ChannelId,
        text: &str,
        html: bool,
        disable_preview: bool,
    ) -> Result<i32, DomainError> {
        if let Some(err) = self.take_failure("send_message") {
            return Err(err);
        }
        self.state.lock().unwrap().calls.push(GatewayCall::SendMessage {
            dst,
            text: text.into(),
            html,
            disable_preview,
        });
        Ok(self.alloc_ids(1)[0])
    }

    async fn download_media(
        &self,
        chat: ChannelId,
        message_id: i32,
        dest: &Path,
    ) -> Result<u64, DomainError> {
        if let Some(err) = self.take_failure("download_media") {
            return Err(err);
        }
        self.state.lock().unwrap().calls.push(GatewayCall::Download {
            chat,
            message_id,
        });
        // Deterministic content per source message: stable fingerprints.
        let bytes = format!("payload-{}-{}", chat, message_id).into_bytes();
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| DomainError::Media(e.to_string()))?;
        Ok(bytes.len() as u64)
    }

    async fn subscribe_new_messages(
        &self,
        chats: &[ChannelId],
    ) -> Result<NewMessageStream, DomainError> {
        let (tx, rx) = mpsc::channel(64);
        self.state.lock().unwrap().live_tx = Some((chats.iter().copied().collect(), tx));
        let handle = tokio::spawn(std::future::pending::<()>());
        Ok(NewMessageStream::new(rx, handle))
    }
}
