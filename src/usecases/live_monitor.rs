//! Live replication: subscribe to new messages on every configured source
//! and run them through the same filter/dispatch path as the batch walker.
//!
//! One subscription covers the union of sources. Album members pass through
//! the assembler; its timeout sweep runs every second alongside the
//! processed-id GC (5 min) and a memory probe (1 min). Hot reconfiguration
//! tears the subscription down, re-primes caches, and resubscribes.

use crate::domain::{
    emit, ChannelId, ChannelPair, DomainError, EngineEvent, EventSender, FilterReason, Message,
};
use crate::ports::TgGateway;
use crate::usecases::assembler::{Deposit, MediaGroupAssembler};
use crate::usecases::dispatcher::{report_filtering, GroupDispatcher};
use crate::usecases::filter;
use crate::usecases::resolver::ChannelResolver;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Already-handled (chat, message) pairs the monitor refuses to touch again.
const PROCESSED_CAPACITY: usize = 50_000;

const SWEEP_EVERY: Duration = Duration::from_secs(1);
const GC_EVERY: Duration = Duration::from_secs(5 * 60);
const PROBE_EVERY: Duration = Duration::from_secs(60);

/// Fixed-capacity dedup ring: O(1) membership, oldest evicted on overflow.
pub struct ProcessedIdBuffer {
    set: HashSet<(ChannelId, i32)>,
    order: VecDeque<(ChannelId, i32)>,
    capacity: usize,
}

impl ProcessedIdBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            set: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn contains(&self, chat: ChannelId, id: i32) -> bool {
        self.set.contains(&(chat, id))
    }

    pub fn insert(&mut self, chat: ChannelId, id: i32) {
        if !self.set.insert((chat, id)) {
            return;
        }
        self.order.push_back((chat, id));
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

pub type PairSnapshot = Arc<Vec<Arc<ChannelPair>>>;

pub struct LiveMonitor {
    tg: Arc<dyn TgGateway>,
    resolver: Arc<ChannelResolver>,
    dispatcher: GroupDispatcher,
    events: EventSender,
    cancel: CancellationToken,
    assembler: Mutex<MediaGroupAssembler>,
    processed: Mutex<ProcessedIdBuffer>,
    /// Stop at midnight after this date, when configured.
    stop_date: Option<chrono::NaiveDate>,
}

impl LiveMonitor {
    pub fn new(
        tg: Arc<dyn TgGateway>,
        resolver: Arc<ChannelResolver>,
        dispatcher: GroupDispatcher,
        events: EventSender,
        cancel: CancellationToken,
        stop_date: Option<chrono::NaiveDate>,
    ) -> Self {
        Self {
            tg,
            resolver,
            dispatcher,
            events,
            cancel,
            assembler: Mutex::new(MediaGroupAssembler::new()),
            processed: Mutex::new(ProcessedIdBuffer::new(PROCESSED_CAPACITY)),
            stop_date,
        }
    }

    /// Run until cancelled, the stop date passes, or the pair source closes.
    /// `pairs_rx` delivers immutable snapshots; every change triggers a
    /// resubscribe with freshly primed caches.
    pub async fn run(&self, mut pairs_rx: watch::Receiver<PairSnapshot>) -> Result<(), DomainError> {
        let deadline = self.deadline();

        'session: loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            let snapshot: PairSnapshot = pairs_rx.borrow_and_update().clone();
            if snapshot.is_empty() {
                info!("no monitor pairs configured, waiting for configuration");
                tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(()),
                    changed = pairs_rx.changed() => {
                        if changed.is_err() {
                            return Ok(());
                        }
                        continue 'session;
                    }
                }
            }

            let sources = self.prime_session(&snapshot).await;
            let mut stream = self.tg.subscribe_new_messages(&sources).await?;
            info!(sources = sources.len(), pairs = snapshot.len(), "monitor subscribed");

            let mut sweep = tokio::time::interval(SWEEP_EVERY);
            let mut gc = tokio::time::interval(GC_EVERY);
            let mut probe = tokio::time::interval(PROBE_EVERY);

            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(()),
                    _ = deadline_sleep(deadline) => {
                        info!("monitor duration reached, stopping");
                        return Ok(());
                    }
                    changed = pairs_rx.changed() => {
                        if changed.is_err() {
                            return Ok(());
                        }
                        info!("pair set changed, resubscribing");
                        continue 'session;
                    }
                    received = stream.rx.recv() => match received {
                        Some(msg) => {
                            if let Err(e) = self.handle_message(msg, &snapshot).await {
                                if e.is_fatal() {
                                    return Err(e);
                                }
                                error!(error = %e, "message handling failed");
                            }
                        }
                        None => {
                            warn!("update stream closed, resubscribing");
                            continue 'session;
                        }
                    },
                    _ = sweep.tick() => {
                        let due = self.assembler.lock().await.sweep(Instant::now());
                        for group in due {
                            if let Err(e) = self.process_batch(&group, &snapshot).await {
                                if e.is_fatal() {
                                    return Err(e);
                                }
                                error!(error = %e, "timed-out group dispatch failed");
                            }
                        }
                    }
                    _ = gc.tick() => {
                        let len = self.processed.lock().await.len();
                        debug!(processed = len, capacity = PROCESSED_CAPACITY, "processed-id ring");
                    }
                    _ = probe.tick() => {
                        let asm = self.assembler.lock().await;
                        debug!(
                            pending_groups = asm.pending_groups(),
                            pending_messages = asm.pending_messages(),
                            "assembler buffers"
                        );
                    }
                }
            }
        }
    }

    /// Warm the resolver for the union of sources (disabled pairs included,
    /// so their traffic can be reported as dropped) and enabled targets.
    async fn prime_session(&self, snapshot: &PairSnapshot) -> Vec<ChannelId> {
        let mut sources: Vec<ChannelId> = Vec::new();
        let mut warm: Vec<ChannelId> = Vec::new();
        for pair in snapshot.iter() {
            if !sources.contains(&pair.source) {
                sources.push(pair.source);
                warm.push(pair.source);
            }
            if pair.enabled {
                for &t in &pair.targets {
                    if !warm.contains(&t) {
                        warm.push(t);
                    }
                }
            }
        }
        for id in warm {
            if let Err(e) = self.resolver.info(id).await {
                warn!(chat = id, error = %e, "cache warm-up failed");
            }
        }
        sources
    }

    async fn handle_message(
        &self,
        msg: Message,
        snapshot: &PairSnapshot,
    ) -> Result<(), DomainError> {
        {
            let processed = self.processed.lock().await;
            if processed.contains(msg.chat_id, msg.id) {
                debug!(chat = msg.chat_id, id = msg.id, "already processed, dropping");
                return Ok(());
            }
        }

        let mut any_for_source = false;
        let mut any_enabled = false;
        for pair in snapshot.iter().filter(|p| p.source == msg.chat_id) {
            any_for_source = true;
            any_enabled |= pair.enabled;
        }
        if !any_for_source {
            return Ok(());
        }
        if !any_enabled {
            emit(
                &self.events,
                EngineEvent::MessageFiltered {
                    message_id: msg.id,
                    filter_type: FilterReason::Disabled,
                    reason: FilterReason::Disabled.as_str().to_string(),
                },
            );
            self.processed.lock().await.insert(msg.chat_id, msg.id);
            return Ok(());
        }

        self.processed.lock().await.insert(msg.chat_id, msg.id);

        if msg.media_group_id.is_some() {
            let outcome = self
                .assembler
                .lock()
                .await
                .deposit(msg, None, Instant::now());
            match outcome {
                Deposit::Buffered => Ok(()),
                Deposit::Complete(group) => self.process_batch(&group, snapshot).await,
                Deposit::Late(late) => self.process_batch(&[late], snapshot).await,
            }
        } else {
            self.process_batch(&[msg], snapshot).await
        }
    }

    /// Filter and dispatch one singleton or complete group, for every
    /// enabled pair on this source. Live sends are silent.
    async fn process_batch(
        &self,
        msgs: &[Message],
        snapshot: &PairSnapshot,
    ) -> Result<(), DomainError> {
        let Some(first) = msgs.first() else {
            return Ok(());
        };
        for pair in snapshot
            .iter()
            .filter(|p| p.enabled && p.source == first.chat_id)
        {
            let output = filter::apply(msgs, pair);
            report_filtering(&self.events, &output);
            for group in &output.groups {
                let outcomes = self.dispatcher.dispatch(pair, group, true).await?;
                debug!(source = pair.source, ?outcomes, "live group dispatched");
            }
        }
        Ok(())
    }

    fn deadline(&self) -> Option<tokio::time::Instant> {
        let date = self.stop_date?;
        let midnight = date.succ_opt()?.and_hms_opt(0, 0, 0)?;
        let now = chrono::Local::now().naive_local();
        let until = (midnight - now).to_std().unwrap_or(Duration::ZERO);
        Some(tokio::time::Instant::now() + until)
    }
}

async fn deadline_sleep(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::history_sqlite::SqliteHistory;
    use crate::domain::{event_channel, EventReceiver, MediaKind};
    use crate::ports::HistoryPort;
    use crate::shared::RateLimiter;
    use crate::usecases::direct_forwarder::DirectForwarder;
    use crate::usecases::media_pipeline::MediaPipeline;
    use crate::usecases::test_support::{GatewayCall, MockGateway};

    #[test]
    fn ring_buffer_evicts_oldest_first() {
        let mut ring = ProcessedIdBuffer::new(3);
        ring.insert(-1, 1);
        ring.insert(-1, 2);
        ring.insert(-1, 3);
        ring.insert(-1, 4);
        assert!(!ring.contains(-1, 1));
        assert!(ring.contains(-1, 2));
        assert!(ring.contains(-1, 4));
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn ring_buffer_ignores_duplicates() {
        let mut ring = ProcessedIdBuffer::new(2);
        ring.insert(-1, 1);
        ring.insert(-1, 1);
        ring.insert(-1, 2);
        assert_eq!(ring.len(), 2);
        assert!(ring.contains(-1, 1));
    }

    struct Rig {
        tg: Arc<MockGateway>,
        history: Arc<SqliteHistory>,
        monitor: Arc<LiveMonitor>,
        cancel: CancellationToken,
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
            DirectForwarder::new(
                tg.clone() as Arc<dyn TgGateway>,
                RateLimiter::new(events.clone(), cancel.clone()),
            ),
            Arc::clone(&pipeline),
            events.clone(),
        );
        let monitor = Arc::new(LiveMonitor::new(
            tg.clone() as Arc<dyn TgGateway>,
            resolver,
            dispatcher,
            events,
            cancel.clone(),
            None,
        ));
        Rig {
            tg,
            history,
            monitor,
            cancel,
            rx,
            _tmp: tmp,
        }
    }

    fn pair(source: i64, targets: &[i64], enabled: bool) -> Arc<ChannelPair> {
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
            enabled,
            send_final_message: false,
            final_message_html_path: None,
            enable_web_page_preview: false,
        })
    }

    fn live_text(id: i32, chat: i64) -> Message {
        Message {
            id,
            chat_id: chat,
            date: id as i64,
            text: format!("live {}", id),
            media: None,
            media_group_id: None,
            is_forward: false,
            reply_to_msg_id: None,
            entities: vec![],
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn forwards_live_messages_silently_and_dedups() {
        let r = rig().await;
        r.tg.add_chat(-100, "src", true);
        r.tg.add_chat(-200, "dst", true);

        let (tx, pairs_rx) = watch::channel(Arc::new(vec![pair(-100, &[-200], true)]));
        let monitor = Arc::clone(&r.monitor);
        let task = tokio::spawn(async move { monitor.run(pairs_rx).await });
        settle().await;

        r.tg.push_live(live_text(11, -100)).await;
        settle().await;
        // Duplicate delivery of the same id is dropped.
        r.tg.push_live(live_text(11, -100)).await;
        settle().await;

        r.cancel.cancel();
        task.await.unwrap().unwrap();
        drop(tx);

        let forwards: Vec<_> = r
            .tg
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::Forward { ids, silent, .. } => Some((ids, silent)),
                _ => None,
            })
            .collect();
        assert_eq!(forwards, vec![(vec![11], true)]);
        assert!(r.history.is_forwarded(-100, 11, -200).await.unwrap());
    }

    #[tokio::test]
    async fn disabled_pair_traffic_is_reported_dropped() {
        let mut r = rig().await;
        r.tg.add_chat(-100, "src", true);

        let (tx, pairs_rx) = watch::channel(Arc::new(vec![pair(-100, &[-200], false)]));
        let monitor = Arc::clone(&r.monitor);
        let task = tokio::spawn(async move { monitor.run(pairs_rx).await });
        settle().await;

        r.tg.push_live(live_text(21, -100)).await;
        settle().await;
        r.cancel.cancel();
        task.await.unwrap().unwrap();
        drop(tx);

        let mut saw_disabled = false;
        while let Ok(ev) = r.rx.try_recv() {
            if matches!(
                ev,
                EngineEvent::MessageFiltered {
                    message_id: 21,
                    filter_type: FilterReason::Disabled,
                    ..
                }
            ) {
                saw_disabled = true;
            }
        }
        assert!(saw_disabled);
        assert!(r.tg.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn album_members_are_assembled_before_dispatch() {
        let r = rig().await;
        r.tg.add_chat(-100, "src", true);
        r.tg.add_chat(-200, "dst", true);

        let (tx, pairs_rx) = watch::channel(Arc::new(vec![pair(-100, &[-200], true)]));
        let monitor = Arc::clone(&r.monitor);
        let task = tokio::spawn(async move { monitor.run(pairs_rx).await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        for id in [31, 32] {
            r.tg.push_live(Message {
                media: Some(MediaKind::Photo),
                media_group_id: Some(9),
                ..live_text(id, -100)
            })
            .await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // Nothing yet: the group is quiescing.
        assert!(r.tg.calls().is_empty());

        // Quiescence (8s) passes; the 1s sweep dispatches the album whole.
        // Polled so disk I/O in the dispatch path can finish under paused time.
        for _ in 0..60 {
            if !r.tg.calls().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        r.cancel.cancel();
        task.await.unwrap().unwrap();
        drop(tx);

        let forwards: Vec<_> = r
            .tg
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::Forward { ids, .. } => Some(ids),
                _ => None,
            })
            .collect();
        assert_eq!(forwards, vec![vec![31, 32]]);
        assert!(r.history.is_forwarded(-100, 31, -200).await.unwrap());
        assert!(r.history.is_forwarded(-100, 32, -200).await.unwrap());
    }

    #[tokio::test]
    async fn reconfiguration_resubscribes_with_the_new_pair_set() {
        let r = rig().await;
        r.tg.add_chat(-100, "src", true);
        r.tg.add_chat(-300, "src2", true);
        r.tg.add_chat(-200, "dst", true);

        let (tx, pairs_rx) = watch::channel(Arc::new(vec![pair(-100, &[-200], true)]));
        let monitor = Arc::clone(&r.monitor);
        let task = tokio::spawn(async move { monitor.run(pairs_rx).await });
        settle().await;
        assert_eq!(
            r.tg.subscribed_chats(),
            Some([-100i64].into_iter().collect())
        );

        tx.send(Arc::new(vec![
            pair(-100, &[-200], true),
            pair(-300, &[-200], true),
        ]))
        .unwrap();
        settle().await;
        assert_eq!(
            r.tg.subscribed_chats(),
            Some([-100i64, -300].into_iter().collect())
        );

        r.tg.push_live(live_text(41, -300)).await;
        settle().await;
        r.cancel.cancel();
        task.await.unwrap().unwrap();
        drop(tx);

        assert!(r.history.is_forwarded(-300, 41, -200).await.unwrap());
    }
}
