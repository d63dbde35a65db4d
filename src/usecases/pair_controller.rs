//! Configuration → live pair set.
//!
//! The controller is the only component that mutates the pair set; everyone
//! downstream holds immutable snapshots received over a watch channel.
//! Pair-local failures (unresolvable source, inaccessible chat) skip that
//! pair and keep the rest alive.

use crate::domain::{
    emit, ChannelPair, DomainError, EngineEvent, EventSender, MediaKind,
};
use crate::shared::config::PairConfig;
use crate::usecases::live_monitor::PairSnapshot;
use crate::usecases::resolver::ChannelResolver;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

pub struct PairController {
    resolver: Arc<ChannelResolver>,
    events: EventSender,
    tx: watch::Sender<PairSnapshot>,
}

impl PairController {
    pub fn new(
        resolver: Arc<ChannelResolver>,
        events: EventSender,
    ) -> (Self, watch::Receiver<PairSnapshot>) {
        let (tx, rx) = watch::channel(Arc::new(Vec::new()) as PairSnapshot);
        (
            Self {
                resolver,
                events,
                tx,
            },
            rx,
        )
    }

    /// Resolve declared pairs into runnable records. Broken pairs are
    /// reported and skipped; order is preserved.
    pub async fn build_pairs(&self, configs: &[PairConfig]) -> Vec<Arc<ChannelPair>> {
        let mut pairs = Vec::with_capacity(configs.len());
        for (i, cfg) in configs.iter().enumerate() {
            match self.build_pair(cfg).await {
                Ok(pair) => pairs.push(Arc::new(pair)),
                Err(e) => {
                    error!(
                        pair = i + 1,
                        source = %cfg.source_channel,
                        error = %e,
                        "pair skipped"
                    );
                }
            }
        }
        pairs
    }

    async fn build_pair(&self, cfg: &PairConfig) -> Result<ChannelPair, DomainError> {
        let source = self.resolver.resolve(&cfg.source_channel).await?;
        let source_label = self.resolver.label(source).await;

        let mut targets = Vec::with_capacity(cfg.target_channels.len());
        let mut target_labels = Vec::with_capacity(cfg.target_channels.len());
        for raw in &cfg.target_channels {
            let id = self.resolver.resolve(raw).await?;
            if id == source {
                // Differently-spelled identifiers can still collide once
                // resolved; this is the authoritative check.
                return Err(DomainError::Config(format!(
                    "target '{}' resolves to the source chat",
                    raw
                )));
            }
            if !targets.contains(&id) {
                targets.push(id);
                target_labels.push(self.resolver.label(id).await);
            }
        }
        if targets.is_empty() {
            return Err(DomainError::Config("no targets after deduplication".into()));
        }

        Ok(ChannelPair {
            source,
            source_label,
            targets,
            target_labels,
            start_id: cfg.start_id,
            end_id: cfg.end_id,
            media_types: match &cfg.media_types {
                Some(kinds) => kinds.iter().copied().collect(),
                None => MediaKind::ALL.into_iter().collect(),
            },
            keywords: cfg.keywords.clone(),
            text_replacements: cfg.text_replacements.clone(),
            exclude_links: cfg.exclude_links,
            remove_captions: cfg.remove_captions,
            hide_author: cfg.hide_author,
            enabled: cfg.enabled,
            send_final_message: cfg.send_final_message,
            final_message_html_path: cfg.final_message_html_path.clone(),
            enable_web_page_preview: cfg.enable_web_page_preview,
        })
    }

    /// Publish a new pair set, reporting the diff against the previous one.
    pub async fn apply(&self, pairs: Vec<Arc<ChannelPair>>) {
        let previous = self.tx.borrow().clone();
        let old: HashMap<_, _> = previous.iter().map(|p| (p.key(), Arc::clone(p))).collect();
        let new: HashMap<_, _> = pairs.iter().map(|p| (p.key(), Arc::clone(p))).collect();

        for (key, pair) in &new {
            match old.get(key) {
                None => {
                    info!(source = pair.source, "pair added");
                    emit(&self.events, EngineEvent::PairAdded { source: pair.source });
                }
                Some(prev) if **prev != **pair => {
                    info!(source = pair.source, "pair modified");
                    emit(
                        &self.events,
                        EngineEvent::PairModified { source: pair.source },
                    );
                }
                Some(_) => {}
            }
        }
        for (key, pair) in &old {
            if !new.contains_key(key) {
                info!(source = pair.source, "pair removed");
                emit(
                    &self.events,
                    EngineEvent::PairRemoved { source: pair.source },
                );
            }
        }

        let _ = self.tx.send(Arc::new(pairs));
    }

    pub fn snapshot(&self) -> PairSnapshot {
        self.tx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event_channel;
    use crate::ports::TgGateway;
    use crate::usecases::test_support::MockGateway;
    use std::collections::HashMap;

    fn cfg(source: &str, targets: &[&str]) -> PairConfig {
        PairConfig {
            source_channel: source.into(),
            target_channels: targets.iter().map(|s| s.to_string()).collect(),
            start_id: 0,
            end_id: 0,
            media_types: None,
            keywords: vec![],
            text_replacements: vec![],
            exclude_links: false,
            remove_captions: false,
            hide_author: false,
            enabled: true,
            send_final_message: false,
            final_message_html_path: None,
            enable_web_page_preview: false,
            unknown: HashMap::new(),
        }
    }

    fn controller(
        tg: Arc<MockGateway>,
    ) -> (
        PairController,
        watch::Receiver<PairSnapshot>,
        crate::domain::EventReceiver,
    ) {
        let (events, rx) = event_channel();
        let resolver = Arc::new(ChannelResolver::new(tg as Arc<dyn TgGateway>));
        let (controller, pairs_rx) = PairController::new(resolver, events);
        (controller, pairs_rx, rx)
    }

    #[tokio::test]
    async fn resolves_identifiers_and_labels() {
        let tg = Arc::new(MockGateway::new());
        tg.add_username("src_chan", -100);
        tg.add_username("dst_chan", -200);
        tg.add_chat(-100, "Source Channel", true);
        tg.add_chat(-200, "Target Channel", true);

        let (controller, _pairs_rx, _rx) = controller(tg);
        let pairs = controller
            .build_pairs(&[cfg("@src_chan", &["t.me/dst_chan"])])
            .await;
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].source, -100);
        assert_eq!(pairs[0].targets, vec![-200]);
        assert_eq!(pairs[0].source_label, "Source Channel");
        assert_eq!(pairs[0].target_labels, vec!["Target Channel"]);
    }

    #[tokio::test]
    async fn post_resolution_duplicates_collapse_and_source_collision_rejects() {
        let tg = Arc::new(MockGateway::new());
        tg.add_username("alias_a", -200);
        tg.add_username("alias_b", -200);
        tg.add_username("src", -100);
        tg.add_chat(-100, "s", true);
        tg.add_chat(-200, "t", true);

        let (controller, _pairs_rx, _rx) = controller(Arc::clone(&tg));
        let pairs = controller
            .build_pairs(&[cfg("@src", &["@alias_a", "@alias_b"])])
            .await;
        assert_eq!(pairs[0].targets, vec![-200], "same id deduplicated");

        // A target spelled differently but resolving to the source is refused.
        tg.add_username("sneaky", -100);
        let pairs = controller.build_pairs(&[cfg("@src", &["@sneaky"])]).await;
        assert!(pairs.is_empty());
    }

    #[tokio::test]
    async fn broken_pair_is_skipped_others_survive() {
        let tg = Arc::new(MockGateway::new());
        tg.add_username("good_src", -100);
        tg.add_username("good_dst", -200);
        tg.add_chat(-100, "s", true);
        tg.add_chat(-200, "t", true);

        let (controller, _pairs_rx, _rx) = controller(tg);
        let pairs = controller
            .build_pairs(&[
                cfg("@missing_chan", &["@good_dst"]),
                cfg("@good_src", &["@good_dst"]),
            ])
            .await;
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].source, -100);
    }

    #[tokio::test]
    async fn apply_reports_the_diff() {
        let tg = Arc::new(MockGateway::new());
        for (name, id) in [("a", -1i64), ("b", -2), ("c", -3), ("t", -9)] {
            tg.add_username(name, id);
            tg.add_chat(id, name, true);
        }

        let (controller, pairs_rx, mut rx) = controller(tg);
        let first = controller
            .build_pairs(&[cfg("@a", &["@t"]), cfg("@b", &["@t"])])
            .await;
        controller.apply(first).await;

        // b removed, c added, a modified (disabled).
        let mut second = controller
            .build_pairs(&[cfg("@a", &["@t"]), cfg("@c", &["@t"])])
            .await;
        let mut modified = (*second[0]).clone();
        modified.enabled = false;
        second[0] = Arc::new(modified);
        controller.apply(second).await;

        let mut added = vec![];
        let mut removed = vec![];
        let mut changed = vec![];
        while let Ok(ev) = rx.try_recv() {
            match ev {
                EngineEvent::PairAdded { source } => added.push(source),
                EngineEvent::PairRemoved { source } => removed.push(source),
                EngineEvent::PairModified { source } => changed.push(source),
                _ => {}
            }
        }
        added.sort();
        assert_eq!(added, vec![-3, -2, -1]);
        assert_eq!(removed, vec![-2]);
        assert_eq!(changed, vec![-1]);
        assert_eq!(pairs_rx.borrow().len(), 2);
    }
}
