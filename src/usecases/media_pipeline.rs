//! Restricted-source replication: download media to scratch, re-upload to
//! the first target, copy from there to the rest.
//!
//! Producer/consumer over a bounded queue: the producer downloads group
//! media to per-group scratch directories and enqueues ready groups (the
//! `send` suspends when the queue is full, so downloads are paced by
//! uploads); the consumer hashes, uploads, copies, records history, and
//! cleans the scratch directory whatever the outcome. Group-level failures
//! are isolated: one bad group never stops the pair.

use crate::domain::{
    emit, ChannelId, ChannelPair, DomainError, EngineEvent, EventSender, ForwardOutcome,
    MediaItem, OutgoingMedia,
};
use crate::ports::{HistoryPort, TgGateway};
use crate::shared::config::DEFAULT_MEDIA_QUEUE_SIZE;
use crate::shared::RateLimiter;
use crate::usecases::filter::FilteredGroup;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Telegram albums cap out at ten items per batch.
const ALBUM_CHUNK: usize = 10;

/// Workers for CPU-bound fingerprint hashing.
const HASH_WORKERS: usize = 3;

/// One filtered group bound for the re-upload path.
pub struct GroupJob {
    pub pair: Arc<ChannelPair>,
    pub group: FilteredGroup,
    pub silent: bool,
}

struct LocalFile {
    message_id: i32,
    path: PathBuf,
    kind: crate::domain::MediaKind,
}

struct ReadyGroup {
    job: GroupJob,
    files: Vec<LocalFile>,
    dir: PathBuf,
}

pub struct MediaPipeline {
    tg: Arc<dyn TgGateway>,
    history: Arc<dyn HistoryPort>,
    events: EventSender,
    limiter: RateLimiter,
    cancel: CancellationToken,
    scratch_root: PathBuf,
    queue_cap: usize,
    hash_permits: Arc<Semaphore>,
    /// Pause between uploaded groups in batch mode.
    send_delay: std::time::Duration,
}

impl MediaPipeline {
    pub fn new(
        tg: Arc<dyn TgGateway>,
        history: Arc<dyn HistoryPort>,
        events: EventSender,
        cancel: CancellationToken,
        scratch_root: PathBuf,
    ) -> Self {
        let limiter = RateLimiter::new(events.clone(), cancel.clone());
        Self {
            tg,
            history,
            events,
            limiter,
            cancel,
            scratch_root,
            queue_cap: DEFAULT_MEDIA_QUEUE_SIZE,
            hash_permits: Arc::new(Semaphore::new(HASH_WORKERS)),
            send_delay: std::time::Duration::ZERO,
        }
    }

    pub fn with_send_delay(mut self, delay: std::time::Duration) -> Self {
        self.send_delay = delay;
        self
    }

    /// Remove stale scratch from interrupted runs. Called once at startup,
    /// before any pair runs.
    pub async fn sweep_scratch(root: &Path) {
        let Ok(mut entries) = tokio::fs::read_dir(root).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Err(e) = tokio::fs::remove_dir_all(entry.path()).await {
                warn!(path = %entry.path().display(), error = %e, "stale scratch not removed");
            }
        }
    }

    /// Batch path: run every job through download → upload concurrently,
    /// with queue back-pressure between the stages.
    pub async fn run(&self, jobs: Vec<GroupJob>) {
        let (tx, mut rx) = mpsc::channel::<ReadyGroup>(self.queue_cap);

        let producer = async move {
            for job in jobs {
                if self.cancel.is_cancelled() {
                    break;
                }
                match self.download_group(&job).await {
                    Ok(ready) => {
                        // Suspends when the queue is full: back-pressure.
                        if tx.send(ready).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!(source = job.pair.source, error = %e, "group download failed");
                    }
                }
            }
            // tx drops here; the consumer drains and stops.
        };

        let consumer = async {
            while let Some(ready) = rx.recv().await {
                if self.cancel.is_cancelled() {
                    Self::cleanup(&ready.dir).await;
                    continue;
                }
                let dir = ready.dir.clone();
                match self.upload_group(ready).await {
                    Ok(outcomes) => {
                        let delivered =
                            outcomes.iter().filter(|(_, o)| o.is_delivery()).count();
                        debug!(delivered, targets = outcomes.len(), "group replicated");
                    }
                    Err(e) => error!(error = %e, "group upload failed"),
                }
                Self::cleanup(&dir).await;
                if !self.send_delay.is_zero() {
                    tokio::time::sleep(self.send_delay).await;
                }
            }
        };

        tokio::join!(producer, consumer);
    }

    /// Live path: one group, download and upload inline. Returns the
    /// per-target outcomes.
    pub async fn replicate_group(
        &self,
        job: GroupJob,
    ) -> Result<Vec<(ChannelId, ForwardOutcome)>, DomainError> {
        let ready = self.download_group(&job).await?;
        let dir = ready.dir.clone();
        let result = self.upload_group(ready).await;
        Self::cleanup(&dir).await;
        result
    }

    async fn download_group(&self, job: &GroupJob) -> Result<ReadyGroup, DomainError> {
        let group_key = job
            .group
            .group_id
            .map(|g| g.to_string())
            .unwrap_or_else(|| format!("m{}", job.group.messages[0].id));
        let dir = self
            .scratch_root
            .join(job.pair.source.to_string())
            .join(group_key);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DomainError::Media(format!("create scratch dir: {}", e)))?;

        let media_members: Vec<_> = job
            .group
            .messages
            .iter()
            .filter_map(|m| m.media.map(|kind| (m.id, kind)))
            .collect();
        let total = media_members.len() as u64;

        let mut files = Vec::with_capacity(media_members.len());
        for (i, (message_id, kind)) in media_members.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(DomainError::Cancelled);
            }
            let dest = dir.join(format!("{}.{}", message_id, kind.extension()));

            let already = tokio::fs::try_exists(&dest).await.unwrap_or(false)
                && self
                    .history
                    .is_downloaded(job.pair.source, message_id)
                    .await?;
            if !already {
                let source = job.pair.source;
                let bytes = self
                    .limiter
                    .run("download_media", || {
                        self.tg.download_media(source, message_id, &dest)
                    })
                    .await?;
                self.history.mark_downloaded(source, message_id).await?;
                debug!(message_id, bytes, path = %dest.display(), "media downloaded");
            }

            emit(
                &self.events,
                EngineEvent::Progress {
                    op: "download".into(),
                    current: (i + 1) as u64,
                    total,
                    description: format!("downloading group media {}/{}", i + 1, total),
                },
            );
            files.push(LocalFile {
                message_id,
                path: dest,
                kind,
            });
        }

        Ok(ReadyGroup {
            job: GroupJob {
                pair: Arc::clone(&job.pair),
                group: job.group.clone(),
                silent: job.silent,
            },
            files,
            dir,
        })
    }

    async fn upload_group(
        &self,
        ready: ReadyGroup,
    ) -> Result<Vec<(ChannelId, ForwardOutcome)>, DomainError> {
        let pair = &ready.job.pair;
        let ids: Vec<i32> = ready.job.group.messages.iter().map(|m| m.id).collect();

        // Fingerprints, hashed off the loop on a small worker pool.
        let mut hashes = Vec::with_capacity(ready.files.len());
        for f in &ready.files {
            hashes.push(self.hash_file(f.path.clone()).await?);
        }

        // Targets that still miss at least one message of this group.
        let mut outcomes: Vec<(ChannelId, ForwardOutcome)> =
            Vec::with_capacity(pair.targets.len());
        let mut pending = Vec::new();
        for &target in &pair.targets {
            let mut missing = false;
            for &id in &ids {
                if !self.history.is_forwarded(pair.source, id, target).await? {
                    missing = true;
                    break;
                }
            }
            if missing {
                pending.push(target);
            } else {
                outcomes.push((target, ForwardOutcome::SkippedAlreadyForwarded));
            }
        }
        let Some((&anchor, rest)) = pending.split_first() else {
            debug!(source = pair.source, ?ids, "group already on every target");
            return Ok(outcomes);
        };

        // Upload once, to the first pending target.
        let new_ids = self
            .push_local(anchor, &ready.files, ready.job.group.caption.as_deref(), ready.job.silent)
            .await?;
        for hash in &hashes {
            if !self.history.is_uploaded(hash, anchor).await? {
                self.history.mark_uploaded(hash, anchor).await?;
            }
        }
        self.record_and_report(pair, &ids, anchor).await?;
        outcomes.push((anchor, ForwardOutcome::ForwardedReuploaded));

        // Remaining targets copy from the first target; a restricted target
        // falls back to its own upload, any other failure is target-local.
        for &target in rest {
            let copy = self
                .limiter
                .run("copy_messages", || {
                    self.tg.copy_messages(target, anchor, &new_ids, None, ready.job.silent)
                })
                .await;
            let outcome = match copy {
                Ok(_) => ForwardOutcome::ForwardedCopied,
                Err(DomainError::ForwardsRestricted) => {
                    info!(target, "copy refused, re-uploading for this target");
                    self.push_local(
                        target,
                        &ready.files,
                        ready.job.group.caption.as_deref(),
                        ready.job.silent,
                    )
                    .await?;
                    for hash in &hashes {
                        if !self.history.is_uploaded(hash, target).await? {
                            self.history.mark_uploaded(hash, target).await?;
                        }
                    }
                    ForwardOutcome::ForwardedReuploaded
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(target, error = %e, "target delivery failed");
                    outcomes.push((target, ForwardOutcome::Failed(e.to_string())));
                    continue;
                }
            };
            self.record_and_report(pair, &ids, target).await?;
            outcomes.push((target, outcome));
        }

        Ok(outcomes)
    }

    /// Send local files as fresh albums of at most ten items; the caption
    /// rides on the very first item.
    async fn push_local(
        &self,
        target: ChannelId,
        files: &[LocalFile],
        caption: Option<&str>,
        silent: bool,
    ) -> Result<Vec<i32>, DomainError> {
        let mut out = Vec::with_capacity(files.len());
        for (chunk_no, chunk) in files.chunks(ALBUM_CHUNK).enumerate() {
            let items: Vec<OutgoingMedia> = chunk
                .iter()
                .enumerate()
                .map(|(i, f)| OutgoingMedia {
                    item: MediaItem::Local {
                        path: f.path.clone(),
                        kind: f.kind,
                    },
                    caption: (chunk_no == 0 && i == 0)
                        .then(|| caption.unwrap_or_default().to_string())
                        .filter(|c| !c.is_empty()),
                })
                .collect();
            let ids = self
                .limiter
                .run("send_media_group", || {
                    self.tg.send_media_group(target, &items, silent)
                })
                .await?;
            out.extend(ids);
        }
        Ok(out)
    }

    /// History first, event second: the host only hears about durable rows.
    async fn record_and_report(
        &self,
        pair: &ChannelPair,
        ids: &[i32],
        target: ChannelId,
    ) -> Result<(), DomainError> {
        self.history
            .mark_forwarded_many(pair.source, ids, target)
            .await?;
        let label = pair
            .targets
            .iter()
            .position(|&t| t == target)
            .and_then(|i| pair.target_labels.get(i))
            .cloned()
            .unwrap_or_else(|| target.to_string());
        let event = if ids.len() == 1 {
            EngineEvent::MessageForwarded {
                message_id: ids[0],
                target_label: label,
            }
        } else {
            EngineEvent::MediaGroupForwarded {
                message_ids: ids.to_vec(),
                target_label: label,
                count: ids.len(),
                target_id: target.to_string(),
            }
        };
        emit(&self.events, event);
        Ok(())
    }

    async fn hash_file(&self, path: PathBuf) -> Result<String, DomainError> {
        let _permit = self
            .hash_permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DomainError::Cancelled)?;
        tokio::task::spawn_blocking(move || {
            let mut file = std::fs::File::open(&path)
                .map_err(|e| DomainError::Media(format!("open {}: {}", path.display(), e)))?;
            let mut hasher = Sha256::new();
            std::io::copy(&mut file, &mut hasher)
                .map_err(|e| DomainError::Media(format!("hash {}: {}", path.display(), e)))?;
            Ok(hex::encode(hasher.finalize()))
        })
        .await
        .map_err(|e| DomainError::Media(format!("hash task: {}", e)))?
    }

    async fn cleanup(dir: &Path) {
        if let Err(e) = tokio::fs::remove_dir_all(dir).await {
            warn!(path = %dir.display(), error = %e, "scratch cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::history_sqlite::SqliteHistory;
    use crate::domain::{event_channel, MediaKind, Message};
    use crate::usecases::test_support::{GatewayCall, MockGateway};

    fn pair(targets: &[ChannelId]) -> Arc<ChannelPair> {
        Arc::new(ChannelPair {
            source: -100,
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

    fn photo(id: i32, gid: i64, caption: &str) -> Message {
        Message {
            id,
            chat_id: -100,
            date: id as i64,
            text: caption.into(),
            media: Some(MediaKind::Photo),
            media_group_id: Some(gid),
            is_forward: false,
            reply_to_msg_id: None,
            entities: vec![],
        }
    }

    fn job(pair: Arc<ChannelPair>, ids: &[i32], caption: &str) -> GroupJob {
        GroupJob {
            group: FilteredGroup {
                group_id: Some(9),
                messages: ids.iter().map(|&id| photo(id, 9, "")).collect(),
                caption: Some(caption.to_string()).filter(|c| !c.is_empty()),
                trimmed: false,
                text_modified: false,
            },
            pair,
            silent: false,
        }
    }

    async fn pipeline(
        tg: Arc<MockGateway>,
        scratch: PathBuf,
    ) -> (MediaPipeline, Arc<SqliteHistory>, crate::domain::EventReceiver) {
        let history = Arc::new(SqliteHistory::connect(&scratch.join("hist")).await.unwrap());
        let (events, rx) = event_channel();
        let p = MediaPipeline::new(
            tg,
            Arc::clone(&history) as Arc<dyn HistoryPort>,
            events,
            CancellationToken::new(),
            scratch.join("tmp"),
        );
        (p, history, rx)
    }

    #[tokio::test]
    async fn restricted_multi_target_uploads_once_and_copies_to_the_rest() {
        let tmp = tempfile::tempdir().unwrap();
        let tg = Arc::new(MockGateway::new());
        tg.add_chat(-100, "src", false);
        tg.set_history(-100, vec![photo(20, 9, "cap"), photo(21, 9, "")]);

        let (pipeline, history, _rx) = pipeline(Arc::clone(&tg), tmp.path().to_path_buf()).await;
        let p = pair(&[-201, -202, -203]);
        let outcomes = pipeline
            .replicate_group(job(Arc::clone(&p), &[20, 21], "cap"))
            .await
            .unwrap();
        assert_eq!(
            outcomes,
            vec![
                (-201, ForwardOutcome::ForwardedReuploaded),
                (-202, ForwardOutcome::ForwardedCopied),
                (-203, ForwardOutcome::ForwardedCopied),
            ]
        );

        let calls = tg.calls();
        let uploads: Vec<_> = calls
            .iter()
            .filter(|c| matches!(c, GatewayCall::SendAlbum { local: true, .. }))
            .collect();
        let copies: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                GatewayCall::Copy { dst, src, .. } => Some((*dst, *src)),
                _ => None,
            })
            .collect();
        assert_eq!(uploads.len(), 1, "exactly one upload, to the first target");
        assert!(
            matches!(uploads[0], GatewayCall::SendAlbum { dst: -201, count: 2, caption: Some(c), .. } if c.as_str() == "cap")
        );
        // Copies come from the first target, not the source.
        assert_eq!(copies, vec![(-202, -201), (-203, -201)]);

        // Six history rows: two messages × three targets.
        for &target in &[-201, -202, -203] {
            for &id in &[20, 21] {
                assert!(history.is_forwarded(-100, id, target).await.unwrap());
            }
        }

        // Fingerprints recorded against the first target only.
        let hash20 = hex::encode(Sha256::digest(b"payload--100-20"));
        assert!(history.is_uploaded(&hash20, -201).await.unwrap());
        assert!(!history.is_uploaded(&hash20, -202).await.unwrap());
        assert!(!history.is_uploaded(&hash20, -203).await.unwrap());
    }

    #[tokio::test]
    async fn restricted_copy_target_falls_back_to_direct_upload() {
        let tmp = tempfile::tempdir().unwrap();
        let tg = Arc::new(MockGateway::new());
        tg.add_chat(-100, "src", false);
        tg.set_history(-100, vec![photo(30, 9, "")]);
        tg.restrict_copy_target(-203);

        let (pipeline, history, _rx) = pipeline(Arc::clone(&tg), tmp.path().to_path_buf()).await;
        let p = pair(&[-201, -203]);
        let outcomes = pipeline
            .replicate_group(job(Arc::clone(&p), &[30], ""))
            .await
            .unwrap();
        assert_eq!(
            outcomes,
            vec![
                (-201, ForwardOutcome::ForwardedReuploaded),
                (-203, ForwardOutcome::ForwardedReuploaded),
            ]
        );

        let uploads = tg
            .calls()
            .iter()
            .filter(|c| matches!(c, GatewayCall::SendAlbum { local: true, .. }))
            .count();
        assert_eq!(uploads, 2, "anchor upload plus fallback upload");
        assert!(history.is_forwarded(-100, 30, -203).await.unwrap());

        let hash = hex::encode(Sha256::digest(b"payload--100-30"));
        assert!(history.is_uploaded(&hash, -201).await.unwrap());
        assert!(history.is_uploaded(&hash, -203).await.unwrap());
    }

    #[tokio::test]
    async fn scratch_directory_is_removed_after_the_group() {
        let tmp = tempfile::tempdir().unwrap();
        let tg = Arc::new(MockGateway::new());
        tg.add_chat(-100, "src", false);
        tg.set_history(-100, vec![photo(40, 9, "")]);

        let (pipeline, _history, _rx) = pipeline(Arc::clone(&tg), tmp.path().to_path_buf()).await;
        let p = pair(&[-201]);
        pipeline
            .replicate_group(job(Arc::clone(&p), &[40], ""))
            .await
            .unwrap();

        let group_dir = tmp.path().join("tmp").join("-100").join("9");
        assert!(!group_dir.exists());
    }

    #[tokio::test]
    async fn fully_forwarded_group_makes_no_outbound_send() {
        let tmp = tempfile::tempdir().unwrap();
        let tg = Arc::new(MockGateway::new());
        tg.add_chat(-100, "src", false);
        tg.set_history(-100, vec![photo(50, 9, "")]);

        let (pipeline, history, _rx) = pipeline(Arc::clone(&tg), tmp.path().to_path_buf()).await;
        history.mark_forwarded(-100, 50, -201).await.unwrap();

        let p = pair(&[-201]);
        let outcomes = pipeline
            .replicate_group(job(Arc::clone(&p), &[50], ""))
            .await
            .unwrap();

        assert_eq!(outcomes, vec![(-201, ForwardOutcome::SkippedAlreadyForwarded)]);
        assert!(tg
            .calls()
            .iter()
            .all(|c| matches!(c, GatewayCall::Download { .. })));
    }

    #[tokio::test]
    async fn flood_wait_mid_upload_retries_without_duplicate_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let tg = Arc::new(MockGateway::new());
        tg.add_chat(-100, "src", false);
        tg.set_history(-100, vec![photo(60, 9, "")]);
        tg.fail_once("send_media_group", DomainError::FloodWait { seconds: 0 });

        let (pipeline, history, mut rx) = pipeline(Arc::clone(&tg), tmp.path().to_path_buf()).await;
        let p = pair(&[-201]);
        pipeline
            .replicate_group(job(Arc::clone(&p), &[60], ""))
            .await
            .unwrap();

        assert!(history.is_forwarded(-100, 60, -201).await.unwrap());
        let mut flood_events = 0;
        let mut group_events = 0;
        while let Ok(ev) = rx.try_recv() {
            match ev {
                EngineEvent::FloodWaitDetected { .. } => flood_events += 1,
                EngineEvent::MessageForwarded { .. } | EngineEvent::MediaGroupForwarded { .. } => {
                    group_events += 1
                }
                _ => {}
            }
        }
        assert_eq!(flood_events, 1);
        assert_eq!(group_events, 1);
    }

    #[tokio::test]
    async fn run_processes_every_job_and_isolates_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let tg = Arc::new(MockGateway::new());
        tg.add_chat(-100, "src", false);
        tg.set_history(
            -100,
            vec![photo(70, 1, ""), photo(80, 2, ""), photo(90, 3, "")],
        );
        // Second group's download fails; the others still replicate.
        tg.fail_once("download_media", DomainError::Media("boom".into()));

        let (pipeline, history, _rx) = pipeline(Arc::clone(&tg), tmp.path().to_path_buf()).await;
        let p = pair(&[-201]);
        let jobs = vec![
            GroupJob {
                group: FilteredGroup {
                    group_id: Some(1),
                    messages: vec![photo(70, 1, "")],
                    caption: None,
                    trimmed: false,
                    text_modified: false,
                },
                pair: Arc::clone(&p),
                silent: false,
            },
            GroupJob {
                group: FilteredGroup {
                    group_id: Some(2),
                    messages: vec![photo(80, 2, "")],
                    caption: None,
                    trimmed: false,
                    text_modified: false,
                },
                pair: Arc::clone(&p),
                silent: false,
            },
            GroupJob {
                group: FilteredGroup {
                    group_id: Some(3),
                    messages: vec![photo(90, 3, "")],
                    caption: None,
                    trimmed: false,
                    text_modified: false,
                },
                pair: Arc::clone(&p),
                silent: false,
            },
        ];
        pipeline.run(jobs).await;

        // First fail_once consumes the first download attempt (group 1).
        assert!(!history.is_forwarded(-100, 70, -201).await.unwrap());
        assert!(history.is_forwarded(-100, 80, -201).await.unwrap());
        assert!(history.is_forwarded(-100, 90, -201).await.unwrap());
    }
}
