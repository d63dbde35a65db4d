//! Batch replication: walk a bounded message-id range per pair, filter,
//! and republish.
//!
//! - Range fetch paginates backwards (newest -> oldest) with **strict
//!   client-side boundary enforcement**: we do not trust the API to honour
//!   min_id/max_id when offset_id is present. Loop termination and batch
//!   filtering are performed client-side.
//! - The complete range is fetched exactly once; media-group texts are
//!   pre-extracted from the complete set so history-based skips cannot
//!   starve the reassembler.
//! - Pair-level isolation: a failing pair is reported and the run continues.

use crate::domain::{
    emit, ChannelId, ChannelPair, DomainError, EngineEvent, EventSender, Message,
};
use crate::ports::{HistoryPort, TgGateway};
use crate::shared::RateLimiter;
use crate::usecases::direct_forwarder::{plan, WirePlan};
use crate::usecases::dispatcher::{report_filtering, GroupDispatcher};
use crate::usecases::filter::{self, FilterOutput, FilteredGroup};
use crate::usecases::media_pipeline::{GroupJob, MediaPipeline};
use crate::usecases::resolver::ChannelResolver;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// History page size, matching Telegram's getHistory maximum.
const PAGE_SIZE: i32 = 100;

/// Upper bound on ids coalesced into one native forward call.
const FORWARD_CHUNK: usize = 100;

pub struct BatchForwarder {
    tg: Arc<dyn TgGateway>,
    history: Arc<dyn HistoryPort>,
    resolver: Arc<ChannelResolver>,
    dispatcher: GroupDispatcher,
    pipeline: Arc<MediaPipeline>,
    events: EventSender,
    cancel: CancellationToken,
    limiter: RateLimiter,
    /// Pause between replicated groups.
    delay: Duration,
}

impl BatchForwarder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tg: Arc<dyn TgGateway>,
        history: Arc<dyn HistoryPort>,
        resolver: Arc<ChannelResolver>,
        dispatcher: GroupDispatcher,
        pipeline: Arc<MediaPipeline>,
        events: EventSender,
        cancel: CancellationToken,
        delay: Duration,
    ) -> Self {
        let limiter = RateLimiter::new(events.clone(), cancel.clone());
        Self {
            tg,
            history,
            resolver,
            dispatcher,
            pipeline,
            events,
            cancel,
            limiter,
            delay,
        }
    }

    /// Run every enabled pair, in declaration order.
    pub async fn run(&self, pairs: &[Arc<ChannelPair>]) -> Result<(), DomainError> {
        for pair in pairs {
            if self.cancel.is_cancelled() {
                return Err(DomainError::Cancelled);
            }
            if !pair.enabled {
                info!(source = pair.source, "pair disabled, skipping");
                continue;
            }
            if let Err(e) = self.run_pair(pair).await {
                if e.is_fatal() {
                    return Err(e);
                }
                error!(source = pair.source, error = %e, "pair failed, continuing with the next");
            }
        }
        Ok(())
    }

    async fn run_pair(&self, pair: &Arc<ChannelPair>) -> Result<(), DomainError> {
        let mut prime = vec![pair.source];
        prime.extend_from_slice(&pair.targets);
        self.resolver.prime(&prime).await?;

        let (start, end) = self.resolve_range(pair).await?;
        if end == 0 || start > end {
            info!(source = pair.source, "empty range, nothing to do");
            return Ok(());
        }
        let total = (end - start + 1) as u64;
        emit(&self.events, EngineEvent::CollectionStarted { total });

        let unforwarded: HashSet<i32> = self
            .history
            .unforwarded_in_range(pair.source, start, end, &pair.targets)
            .await?
            .into_iter()
            .collect();
        if unforwarded.is_empty() {
            info!(
                source = pair.source,
                start, end, "every message already forwarded to every target"
            );
            emit(&self.events, EngineEvent::CollectionCompleted { fetched: 0 });
            return Ok(());
        }

        // Single fetch of the complete range: the filter pre-extracts group
        // texts from it before the history prefilter trims anything.
        let all = self.fetch_range(pair.source, start, end, total).await?;
        emit(
            &self.events,
            EngineEvent::CollectionCompleted {
                fetched: all.len() as u64,
            },
        );

        let output = filter::apply(&all, pair);
        report_filtering(&self.events, &output);

        let forwarded_any = self.dispatch_groups(pair, output, &unforwarded).await?;

        if pair.send_final_message && forwarded_any {
            self.send_final_message(pair).await?;
        }
        Ok(())
    }

    /// Bounds of the id walk. `end_id = 0` is resolved once, here, at the
    /// start of the pair.
    async fn resolve_range(&self, pair: &ChannelPair) -> Result<(i32, i32), DomainError> {
        let end = if pair.end_id > 0 {
            pair.end_id
        } else {
            self.tg.newest_message_id(pair.source).await?
        };
        let start = if pair.start_id > 0 { pair.start_id } else { 1 };
        Ok((start, end))
    }

    /// Backward pagination over `[start, end]`, returned ascending.
    async fn fetch_range(
        &self,
        chat: ChannelId,
        start: i32,
        end: i32,
        total: u64,
    ) -> Result<Vec<Message>, DomainError> {
        let min_id = start - 1;
        let mut max_id = end.saturating_add(1);
        let mut collected: Vec<Message> = Vec::new();

        loop {
            if self.cancel.is_cancelled() {
                return Err(DomainError::Cancelled);
            }
            let raw = self.tg.get_history(chat, min_id, max_id, PAGE_SIZE).await?;
            if raw.is_empty() {
                break;
            }

            // Stop as soon as any id at or below the lower bound shows up,
            // even mid-page; the server may ignore the bounds we sent.
            let reached_min = raw.iter().any(|m| m.id <= min_id);
            let raw_min_id = raw.iter().map(|m| m.id).min();

            let page: Vec<Message> = raw
                .into_iter()
                .filter(|m| m.id > min_id && m.id < max_id)
                .collect();

            if !page.is_empty() {
                let batch_min = page.iter().map(|m| m.id).min().unwrap_or(0);
                collected.extend(page);
                emit(
                    &self.events,
                    EngineEvent::CollectionProgress {
                        fetched: collected.len() as u64,
                        total,
                    },
                );
                if reached_min {
                    break;
                }
                max_id = batch_min;
            } else {
                if reached_min {
                    break;
                }
                // Advance the cursor past this page so the next request differs.
                match raw_min_id {
                    Some(id) => max_id = id,
                    None => break,
                }
            }
        }

        collected.sort_by_key(|m| m.id);
        Ok(collected)
    }

    /// Route filtered groups: restricted sources stream through the bounded
    /// download/upload queue; forwardable sources dispatch inline per group
    /// in ascending order, with a per-group restriction fallback.
    async fn dispatch_groups(
        &self,
        pair: &Arc<ChannelPair>,
        output: FilterOutput,
        unforwarded: &HashSet<i32>,
    ) -> Result<bool, DomainError> {
        let groups: Vec<_> = output
            .groups
            .into_iter()
            .filter(|g| g.messages.iter().any(|m| unforwarded.contains(&m.id)))
            .collect();
        if groups.is_empty() {
            return Ok(false);
        }

        if !self.resolver.can_forward(pair.source).await? {
            info!(
                source = pair.source,
                groups = groups.len(),
                "source forbids forwarding, streaming through re-upload pipeline"
            );
            let jobs: Vec<GroupJob> = groups
                .into_iter()
                .map(|group| GroupJob {
                    pair: Arc::clone(pair),
                    group,
                    silent: false,
                })
                .collect();
            self.pipeline.run(jobs).await;
            return Ok(true);
        }

        let mut forwarded_any = false;
        for unit in coalesce_native_runs(groups, pair) {
            if self.cancel.is_cancelled() {
                return Err(DomainError::Cancelled);
            }
            let result = match &unit {
                DispatchUnit::NativeRun(batch) => self.dispatch_native_run(pair, batch).await,
                DispatchUnit::Single(group) => self
                    .dispatcher
                    .dispatch(pair, group, false)
                    .await
                    .map(|outcomes| outcomes.iter().any(|(_, o)| o.is_delivery())),
            };
            match result {
                Ok(delivered) => forwarded_any |= delivered,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    // Group-level isolation: report and move on.
                    error!(source = pair.source, error = %e, "group dispatch failed");
                }
            }
            tokio::time::sleep(self.delay).await;
        }
        Ok(forwarded_any)
    }

    /// Forward a run of untouched groups with one call per target; spares
    /// one API round-trip per message on clean mirrors.
    async fn dispatch_native_run(
        &self,
        pair: &Arc<ChannelPair>,
        batch: &[FilteredGroup],
    ) -> Result<bool, DomainError> {
        let mut delivered = false;
        for (i, &target) in pair.targets.iter().enumerate() {
            // Per-group pending check keeps group atomicity per target.
            let mut pending: Vec<&FilteredGroup> = Vec::new();
            for group in batch {
                let mut missing = false;
                for m in &group.messages {
                    if !self.history.is_forwarded(pair.source, m.id, target).await? {
                        missing = true;
                        break;
                    }
                }
                if missing {
                    pending.push(group);
                }
            }
            if pending.is_empty() {
                continue;
            }
            let ids: Vec<i32> = pending
                .iter()
                .flat_map(|g| g.messages.iter().map(|m| m.id))
                .collect();

            let send = self
                .limiter
                .run("forward_messages", || {
                    self.tg.forward_messages(target, pair.source, &ids, false)
                })
                .await;
            match send {
                Ok(_) => {}
                Err(DomainError::ForwardsRestricted) => {
                    // Fall back group by group; the dispatcher reroutes each
                    // through the re-upload pipeline.
                    for group in batch {
                        let outcomes = self.dispatcher.dispatch(pair, group, false).await?;
                        delivered |= outcomes.iter().any(|(_, o)| o.is_delivery());
                    }
                    return Ok(delivered);
                }
                Err(e) => return Err(e),
            }

            self.history
                .mark_forwarded_many(pair.source, &ids, target)
                .await?;
            delivered = true;
            let label = pair
                .target_labels
                .get(i)
                .cloned()
                .unwrap_or_else(|| target.to_string());
            for group in &pending {
                let gids: Vec<i32> = group.messages.iter().map(|m| m.id).collect();
                let event = if gids.len() == 1 {
                    EngineEvent::MessageForwarded {
                        message_id: gids[0],
                        target_label: label.clone(),
                    }
                } else {
                    EngineEvent::MediaGroupForwarded {
                        message_ids: gids.clone(),
                        target_label: label.clone(),
                        count: gids.len(),
                        target_id: target.to_string(),
                    }
                };
                emit(&self.events, event);
            }
        }
        Ok(delivered)
    }

    /// Closing message after a pair that forwarded at least one message.
    async fn send_final_message(&self, pair: &ChannelPair) -> Result<(), DomainError> {
        let Some(path) = &pair.final_message_html_path else {
            return Ok(());
        };
        let body = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DomainError::Config(format!("final message {}: {}", path.display(), e)))?;
        for (i, &target) in pair.targets.iter().enumerate() {
            if let Err(e) = self
                .tg
                .send_message(target, &body, true, !pair.enable_web_page_preview)
                .await
            {
                warn!(target, error = %e, "final message failed");
            } else {
                info!(
                    target = %pair.target_labels.get(i).map(String::as_str).unwrap_or("?"),
                    "final message sent"
                );
            }
        }
        Ok(())
    }
}

enum DispatchUnit {
    /// Consecutive untouched groups, forwardable in one call per target.
    NativeRun(Vec<FilteredGroup>),
    Single(FilteredGroup),
}

/// Merge consecutive groups whose wire plan is a native forward, capped at
/// `FORWARD_CHUNK` ids per run. Order is preserved.
fn coalesce_native_runs(groups: Vec<FilteredGroup>, pair: &ChannelPair) -> Vec<DispatchUnit> {
    let mut units: Vec<DispatchUnit> = Vec::new();
    let mut run: Vec<FilteredGroup> = Vec::new();
    let mut run_ids = 0usize;

    for group in groups {
        if plan(&group, pair) == WirePlan::Native {
            if run_ids + group.messages.len() > FORWARD_CHUNK && !run.is_empty() {
                units.push(DispatchUnit::NativeRun(std::mem::take(&mut run)));
                run_ids = 0;
            }
            run_ids += group.messages.len();
            run.push(group);
        } else {
            if !run.is_empty() {
                units.push(DispatchUnit::NativeRun(std::mem::take(&mut run)));
                run_ids = 0;
            }
            units.push(DispatchUnit::Single(group));
        }
    }
    if !run.is_empty() {
        units.push(DispatchUnit::NativeRun(run));
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::history_sqlite::SqliteHistory;
    use crate::domain::{event_channel, EventReceiver, FilterReason, MediaKind, TextReplacement};
    use crate::usecases::direct_forwarder::DirectForwarder;
    use crate::usecases::test_support::{GatewayCall, MockGateway};
    use std::collections::BTreeSet;

    struct Rig {
        tg: Arc<MockGateway>,
        history: Arc<SqliteHistory>,
        forwarder: BatchForwarder,
        rx: EventReceiver,
        _tmp: tempfile::TempDir,
    }

    async fn rig() -> Rig {
        let tmp = tempfile::tempdir().unwrap();
        let tg = Arc::new(MockGateway::new());
        let history = Arc::new(SqliteHistory::connect(tmp.path()).await.unwrap());
        let (events, rx) = event_channel();
        let cancel = CancellationToken::new();
        let resolver = Arc::new(ChannelResolver::new(tg.clone() as Arc<dyn TgGateway>));
        let limiter = RateLimiter::new(events.clone(), cancel.clone());
        let pipeline = Arc::new(MediaPipeline::new(
            tg.clone() as Arc<dyn TgGateway>,
            Arc::clone(&history) as Arc<dyn HistoryPort>,
            events.clone(),
            cancel.clone(),
            tmp.path().join("tmp"),
        ));
        let dispatcher = GroupDispatcher::new(
            Arc::clone(&history) as Arc<dyn HistoryPort>,
            Arc::clone(&resolver),
            DirectForwarder::new(tg.clone() as Arc<dyn TgGateway>, limiter),
            Arc::clone(&pipeline),
            events.clone(),
        );
        let forwarder = BatchForwarder::new(
            tg.clone() as Arc<dyn TgGateway>,
            Arc::clone(&history) as Arc<dyn HistoryPort>,
            resolver,
            dispatcher,
            pipeline,
            events,
            cancel,
            Duration::ZERO,
        );
        Rig {
            tg,
            history,
            forwarder,
            rx,
            _tmp: tmp,
        }
    }

    fn pair(source: i64, targets: &[i64]) -> Arc<ChannelPair> {
        Arc::new(ChannelPair {
            source,
            source_label: "src".into(),
            targets: targets.to_vec(),
            target_labels: targets.iter().map(|t| format!("t{}", t)).collect(),
            start_id: 0,
            end_id: 0,
            media_types: MediaKind::ALL.into_iter().collect(),
            keywords: vec![],
            text_replacements: vec![],
            exclude_links: false,
            remove_captions: false,
            hide_author: false,
            enabled: true,
            send_final_message: false,
            final_message_html_path: None,
            enable_web_page_preview: false,
        })
    }

    fn text(id: i32, chat: i64, body: &str) -> Message {
        Message {
            id,
            chat_id: chat,
            date: id as i64,
            text: body.into(),
            media: None,
            media_group_id: None,
            is_forward: false,
            reply_to_msg_id: None,
            entities: vec![],
        }
    }

    fn photo(id: i32, chat: i64, gid: i64, caption: &str) -> Message {
        Message {
            media: Some(MediaKind::Photo),
            media_group_id: Some(gid),
            ..text(id, chat, caption)
        }
    }

    fn video(id: i32, chat: i64, gid: i64, caption: &str) -> Message {
        Message {
            media: Some(MediaKind::Video),
            media_group_id: Some(gid),
            ..text(id, chat, caption)
        }
    }

    #[tokio::test]
    async fn native_forward_without_filters() {
        let r = rig().await;
        r.tg.add_chat(-100, "src", true);
        r.tg.add_chat(-200, "dst", true);
        r.tg.set_history(
            -100,
            vec![
                text(101, -100, "a"),
                text(102, -100, "b"),
                text(103, -100, "c"),
            ],
        );

        r.forwarder.run(&[pair(-100, &[-200])]).await.unwrap();

        // One coalesced native forward for the whole untouched run.
        assert_eq!(
            r.tg.calls(),
            vec![GatewayCall::Forward {
                dst: -200,
                src: -100,
                ids: vec![101, 102, 103],
                silent: false
            }]
        );
        for &id in &[101, 102, 103] {
            assert!(r.history.is_forwarded(-100, id, -200).await.unwrap());
        }
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let r = rig().await;
        r.tg.add_chat(-100, "src", true);
        r.tg.add_chat(-200, "dst", true);
        r.tg.set_history(-100, vec![text(101, -100, "a"), text(102, -100, "b")]);

        let p = pair(-100, &[-200]);
        r.forwarder.run(std::slice::from_ref(&p)).await.unwrap();
        let calls_after_first = r.tg.calls().len();
        r.forwarder.run(std::slice::from_ref(&p)).await.unwrap();
        assert_eq!(r.tg.calls().len(), calls_after_first, "no new outbound calls");
    }

    #[tokio::test]
    async fn forwarded_events_ascend_per_target() {
        let mut r = rig().await;
        r.tg.add_chat(-100, "src", true);
        r.tg.add_chat(-200, "dst", true);
        r.tg.set_history(
            -100,
            (1..=7).map(|id| text(id, -100, "x")).collect::<Vec<_>>(),
        );

        r.forwarder.run(&[pair(-100, &[-200])]).await.unwrap();

        let mut last = 0;
        while let Ok(ev) = r.rx.try_recv() {
            if let EngineEvent::MessageForwarded { message_id, .. } = ev {
                assert!(message_id > last, "events must ascend");
                last = message_id;
            }
        }
        assert_eq!(last, 7);
    }

    #[tokio::test]
    async fn partial_group_is_reassembled_with_preextracted_caption() {
        let r = rig().await;
        r.tg.add_chat(-100, "src", true);
        r.tg.add_chat(-200, "dst", true);
        r.tg.set_history(
            -100,
            vec![
                photo(10, -100, 5, ""),
                video(11, -100, 5, "the caption"),
                photo(12, -100, 5, ""),
            ],
        );

        let mut p = (*pair(-100, &[-200])).clone();
        p.media_types = BTreeSet::from([MediaKind::Photo]);
        p.text_replacements = vec![TextReplacement {
            find: "the".into(),
            replace: "a".into(),
        }];
        r.forwarder.run(&[Arc::new(p)]).await.unwrap();

        let albums: Vec<_> = r
            .tg
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::SendAlbum {
                    dst,
                    local,
                    count,
                    caption,
                    ..
                } => Some((dst, local, count, caption)),
                _ => None,
            })
            .collect();
        assert_eq!(
            albums,
            vec![(-200, false, 2, Some("a caption".to_string()))]
        );
        assert!(r.history.is_forwarded(-100, 10, -200).await.unwrap());
        assert!(!r.history.is_forwarded(-100, 11, -200).await.unwrap());
        assert!(r.history.is_forwarded(-100, 12, -200).await.unwrap());
    }

    #[tokio::test]
    async fn per_target_restriction_falls_back_to_reupload() {
        let r = rig().await;
        r.tg.add_chat(-100, "src", true);
        r.tg.add_chat(-200, "dst", true);
        r.tg.set_history(-100, vec![photo(20, -100, 3, "cap")]);
        // chat_info still claims forwardable; the wire call refuses.
        r.tg.restrict_wire_source(-100);

        r.forwarder.run(&[pair(-100, &[-200])]).await.unwrap();

        let uploaded = r
            .tg
            .calls()
            .iter()
            .any(|c| matches!(c, GatewayCall::SendAlbum { local: true, .. }));
        assert!(uploaded, "restricted group must be re-uploaded");
        assert!(r.history.is_forwarded(-100, 20, -200).await.unwrap());
    }

    #[tokio::test]
    async fn restricted_source_streams_through_pipeline() {
        let r = rig().await;
        r.tg.add_chat(-100, "src", false);
        r.tg.add_chat(-200, "dst", true);
        r.tg.set_history(
            -100,
            vec![photo(20, -100, 3, "cap"), photo(21, -100, 3, "")],
        );

        r.forwarder.run(&[pair(-100, &[-200])]).await.unwrap();

        assert!(r
            .tg
            .calls()
            .iter()
            .all(|c| !matches!(c, GatewayCall::Forward { .. })));
        assert!(r.history.is_forwarded(-100, 20, -200).await.unwrap());
        assert!(r.history.is_forwarded(-100, 21, -200).await.unwrap());
    }

    #[tokio::test]
    async fn bounded_ranges_respect_start_and_end() {
        let r = rig().await;
        r.tg.add_chat(-100, "src", true);
        r.tg.add_chat(-200, "dst", true);
        r.tg.set_history(
            -100,
            (1..=30).map(|id| text(id, -100, "x")).collect::<Vec<_>>(),
        );

        let mut p = (*pair(-100, &[-200])).clone();
        p.start_id = 10;
        p.end_id = 12;
        r.forwarder.run(&[Arc::new(p)]).await.unwrap();

        let forwards: Vec<Vec<i32>> = r
            .tg
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::Forward { ids, .. } => Some(ids),
                _ => None,
            })
            .collect();
        assert_eq!(forwards, vec![vec![10, 11, 12]]);
    }

    #[tokio::test]
    async fn final_message_sent_only_after_a_real_forward() {
        let r = rig().await;
        r.tg.add_chat(-100, "src", true);
        r.tg.add_chat(-200, "dst", true);
        r.tg.set_history(-100, vec![text(1, -100, "a")]);

        let html = r._tmp.path().join("done.html");
        tokio::fs::write(&html, "<b>done</b>").await.unwrap();

        let mut p = (*pair(-100, &[-200])).clone();
        p.send_final_message = true;
        p.final_message_html_path = Some(html.clone());
        p.enable_web_page_preview = true;
        let p = Arc::new(p);

        r.forwarder.run(std::slice::from_ref(&p)).await.unwrap();
        let finals: Vec<_> = r
            .tg
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::SendMessage {
                    dst,
                    text,
                    html,
                    disable_preview,
                } => Some((dst, text, html, disable_preview)),
                _ => None,
            })
            .collect();
        assert_eq!(finals, vec![(-200, "<b>done</b>".to_string(), true, false)]);

        // Second run forwards nothing, so no second final message.
        r.forwarder.run(std::slice::from_ref(&p)).await.unwrap();
        let final_count = r
            .tg
            .calls()
            .iter()
            .filter(|c| matches!(c, GatewayCall::SendMessage { .. }))
            .count();
        assert_eq!(final_count, 1);
    }

    #[tokio::test]
    async fn broken_pair_does_not_stop_the_run() {
        let r = rig().await;
        // First pair's source is unknown -> NotAccessible at prime time.
        r.tg.add_chat(-300, "src2", true);
        r.tg.add_chat(-400, "dst2", true);
        r.tg.set_history(-300, vec![text(5, -300, "ok")]);

        r.forwarder
            .run(&[pair(-999, &[-200]), pair(-300, &[-400])])
            .await
            .unwrap();

        assert!(r.history.is_forwarded(-300, 5, -400).await.unwrap());
    }

    #[tokio::test]
    async fn keyword_dropped_group_reports_once() {
        let mut r = rig().await;
        r.tg.add_chat(-100, "src", true);
        r.tg.add_chat(-200, "dst", true);
        r.tg.set_history(
            -100,
            vec![photo(10, -100, 5, "nope"), photo(11, -100, 5, "")],
        );

        let mut p = (*pair(-100, &[-200])).clone();
        p.keywords = vec!["urgent".into()];
        r.forwarder.run(&[Arc::new(p)]).await.unwrap();

        let filtered: Vec<_> = std::iter::from_fn(|| r.rx.try_recv().ok())
            .filter(|e| matches!(e, EngineEvent::MessageFiltered { .. }))
            .collect();
        assert_eq!(filtered.len(), 1);
        assert!(matches!(
            &filtered[0],
            EngineEvent::MessageFiltered {
                filter_type: FilterReason::Keyword,
                ..
            }
        ));
    }
}
