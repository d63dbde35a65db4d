//! Channel identity resolution with a metadata cache.
//!
//! Accepts every identifier form users paste (`t.me/name`, full URLs,
//! `@name`, `+invite` tokens, raw ids), normalizes, and resolves to the
//! canonical numeric id through the gateway. Chat metadata (label, forward
//! permission) is cached with a TTL and an LRU cap; concurrent lookups for
//! the same id are coalesced into one request.

use crate::domain::{ChannelId, ChatInfo, DomainError};
use crate::ports::TgGateway;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

const CACHE_TTL: Duration = Duration::from_secs(30 * 60);
const CACHE_CAP: usize = 500;

/// Normalized identifier forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Username(String),
    /// Private-invite token (the part after `+` or `joinchat/`).
    Invite(String),
    Id(ChannelId),
}

impl Identifier {
    /// The string handed to the SDK for resolution.
    pub fn as_sdk_form(&self) -> String {
        match self {
            Identifier::Username(name) => name.clone(),
            Identifier::Invite(token) => format!("+{}", token),
            Identifier::Id(id) => id.to_string(),
        }
    }
}

/// Parse a user-entered chat identifier. Pure; rejects garbage early so the
/// SDK is never called with something unresolvable.
pub fn normalize_identifier(raw: &str) -> Result<Identifier, DomainError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(DomainError::InvalidIdentifier(raw.to_string()));
    }

    let stripped = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    let stripped = stripped
        .strip_prefix("t.me/")
        .or_else(|| stripped.strip_prefix("telegram.me/"))
        .unwrap_or(stripped);
    let stripped = stripped.trim_end_matches('/');

    if let Some(token) = stripped
        .strip_prefix('+')
        .or_else(|| stripped.strip_prefix("joinchat/"))
    {
        if token.is_empty() || !token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(DomainError::InvalidIdentifier(raw.to_string()));
        }
        return Ok(Identifier::Invite(token.to_string()));
    }

    let name = stripped.strip_prefix('@').unwrap_or(stripped);
    if let Ok(id) = name.parse::<i64>() {
        return Ok(Identifier::Id(id));
    }
    if name.len() >= 4
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Ok(Identifier::Username(name.to_string()));
    }
    Err(DomainError::InvalidIdentifier(raw.to_string()))
}

struct CacheEntry {
    info: ChatInfo,
    fetched_at: Instant,
}

/// Process-wide resolver. Shared by batch and live paths via `Arc`.
pub struct ChannelResolver {
    tg: Arc<dyn TgGateway>,
    entries: Mutex<LruCache<ChannelId, CacheEntry>>,
    /// Normalized identifier → resolved id. Bounded in practice by the
    /// config size, so a plain map suffices.
    idents: Mutex<HashMap<String, ChannelId>>,
    /// Per-id gates so only one metadata fetch is in flight per chat.
    inflight: Mutex<HashMap<ChannelId, Arc<Mutex<()>>>>,
    ttl: Duration,
}

impl ChannelResolver {
    pub fn new(tg: Arc<dyn TgGateway>) -> Self {
        Self {
            tg,
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAP).expect("cache cap"),
            )),
            idents: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            ttl: CACHE_TTL,
        }
    }

    #[cfg(test)]
    fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Resolve any accepted identifier form to its canonical id.
    pub async fn resolve(&self, identifier: &str) -> Result<ChannelId, DomainError> {
        let norm = normalize_identifier(identifier)?;
        if let Identifier::Id(id) = norm {
            return Ok(id);
        }
        let key = norm.as_sdk_form();
        if let Some(&id) = self.idents.lock().await.get(&key) {
            return Ok(id);
        }
        let id = self.tg.resolve(&key).await?;
        self.idents.lock().await.insert(key, id);
        debug!(identifier, id, "identifier resolved");
        Ok(id)
    }

    /// Cached chat metadata; fetches on miss or TTL expiry.
    pub async fn info(&self, id: ChannelId) -> Result<ChatInfo, DomainError> {
        if let Some(info) = self.cached(id).await {
            return Ok(info);
        }

        // Coalesce: one fetch per id, later callers reuse the fresh entry.
        let gate = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(inflight.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))))
        };
        let _guard = gate.lock().await;

        if let Some(info) = self.cached(id).await {
            return Ok(info);
        }

        let fetched = self.tg.chat_info(id).await;
        self.inflight.lock().await.remove(&id);
        match fetched {
            Ok(info) => {
                self.entries.lock().await.put(
                    id,
                    CacheEntry {
                        info: info.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                Ok(info)
            }
            Err(e) => {
                if matches!(e, DomainError::NotAccessible(_) | DomainError::Auth(_)) {
                    self.invalidate(id).await;
                }
                Err(e)
            }
        }
    }

    pub async fn can_forward(&self, id: ChannelId) -> Result<bool, DomainError> {
        Ok(self.info(id).await?.can_forward)
    }

    /// Batch warm-up at the start of a run.
    pub async fn prime(&self, ids: &[ChannelId]) -> Result<(), DomainError> {
        for &id in ids {
            self.info(id).await?;
        }
        Ok(())
    }

    pub async fn invalidate(&self, id: ChannelId) {
        self.entries.lock().await.pop(&id);
    }

    /// Human label for events; falls back to the numeric id when the chat is
    /// not cached (never fails mid-forward just for a label).
    pub async fn label(&self, id: ChannelId) -> String {
        match self.info(id).await {
            Ok(info) => info.label,
            Err(_) => id.to_string(),
        }
    }

    async fn cached(&self, id: ChannelId) -> Option<ChatInfo> {
        let mut entries = self.entries.lock().await;
        match entries.get(&id) {
            Some(entry) if entry.fetched_at.elapsed() < self.ttl => Some(entry.info.clone()),
            Some(_) => {
                entries.pop(&id);
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::MockGateway;

    #[test]
    fn normalizes_all_accepted_forms() {
        assert_eq!(
            normalize_identifier("@channel_one").unwrap(),
            Identifier::Username("channel_one".into())
        );
        assert_eq!(
            normalize_identifier("t.me/channel_one").unwrap(),
            Identifier::Username("channel_one".into())
        );
        assert_eq!(
            normalize_identifier("https://t.me/channel_one/").unwrap(),
            Identifier::Username("channel_one".into())
        );
        assert_eq!(
            normalize_identifier("https://t.me/+AbCd-123").unwrap(),
            Identifier::Invite("AbCd-123".into())
        );
        assert_eq!(
            normalize_identifier("t.me/joinchat/AbCd123").unwrap(),
            Identifier::Invite("AbCd123".into())
        );
        assert_eq!(
            normalize_identifier("-1001234567890").unwrap(),
            Identifier::Id(-1001234567890)
        );
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "   ", "@ab", "t.me/", "https://t.me/+", "hello world", "név"] {
            assert!(
                matches!(
                    normalize_identifier(bad),
                    Err(DomainError::InvalidIdentifier(_))
                ),
                "should reject {:?}",
                bad
            );
        }
    }

    #[tokio::test]
    async fn caches_metadata_and_counts_one_fetch() {
        let tg = Arc::new(MockGateway::new());
        tg.add_chat(-100, "Source", true);
        let resolver = ChannelResolver::new(tg.clone());

        assert!(resolver.can_forward(-100).await.unwrap());
        assert!(resolver.can_forward(-100).await.unwrap());
        assert_eq!(resolver.label(-100).await, "Source");
        assert_eq!(tg.chat_info_calls(), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let tg = Arc::new(MockGateway::new());
        tg.add_chat(-100, "Source", true);
        let resolver = ChannelResolver::new(tg.clone()).with_ttl(Duration::ZERO);

        resolver.info(-100).await.unwrap();
        resolver.info(-100).await.unwrap();
        assert_eq!(tg.chat_info_calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_lookups_coalesce() {
        let tg = Arc::new(MockGateway::new());
        tg.add_chat(-100, "Source", true);
        tg.set_chat_info_delay(Duration::from_millis(50));
        let resolver = Arc::new(ChannelResolver::new(tg.clone()));

        let a = tokio::spawn({
            let r = Arc::clone(&resolver);
            async move { r.info(-100).await }
        });
        let b = tokio::spawn({
            let r = Arc::clone(&resolver);
            async move { r.info(-100).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        assert_eq!(tg.chat_info_calls(), 1);
    }

    #[tokio::test]
    async fn resolve_caches_identifier_mapping() {
        let tg = Arc::new(MockGateway::new());
        tg.add_username("chan_name", -100);
        let resolver = ChannelResolver::new(tg.clone());

        assert_eq!(resolver.resolve("@chan_name").await.unwrap(), -100);
        assert_eq!(resolver.resolve("t.me/chan_name").await.unwrap(), -100);
        assert_eq!(tg.resolve_calls(), 1);

        // Numeric ids never hit the SDK.
        assert_eq!(resolver.resolve("-42").await.unwrap(), -42);
        assert_eq!(tg.resolve_calls(), 1);
    }

    #[tokio::test]
    async fn inaccessible_chat_is_not_cached() {
        let tg = Arc::new(MockGateway::new());
        let resolver = ChannelResolver::new(tg.clone());
        assert!(matches!(
            resolver.info(-999).await,
            Err(DomainError::NotAccessible(_))
        ));
        tg.add_chat(-999, "NowVisible", true);
        assert_eq!(resolver.info(-999).await.unwrap().label, "NowVisible");
    }
}
