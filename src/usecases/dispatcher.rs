//! Shared group dispatch: the routing step both the batch forwarder and the
//! live monitor perform per filtered group.
//!
//! Per target: skip when history already covers every message, otherwise
//! try the server-side path; a forwarding restriction reroutes the whole
//! group through the media pipeline (which itself handles the remaining
//! targets). History rows are written before the host hears a success.

use crate::domain::{
    emit, ChannelId, ChannelPair, DomainError, EngineEvent, EventSender, ForwardOutcome,
};
use crate::ports::HistoryPort;
use crate::usecases::direct_forwarder::DirectForwarder;
use crate::usecases::filter::{Dropped, FilterOutput, FilteredGroup};
use crate::usecases::media_pipeline::{GroupJob, MediaPipeline};
use crate::usecases::resolver::ChannelResolver;
use std::sync::Arc;
use tracing::{error, info};

/// Surface filter decisions to the host: drops once per message or group,
/// plus every replacement that changed text.
pub fn report_filtering(events: &EventSender, output: &FilterOutput) {
    for dropped in &output.dropped {
        let event = match dropped {
            Dropped::Message { id, reason } => EngineEvent::MessageFiltered {
                message_id: *id,
                filter_type: *reason,
                reason: reason.as_str().to_string(),
            },
            Dropped::Group {
                group_id,
                ids,
                reason,
            } => EngineEvent::MessageFiltered {
                message_id: ids[0],
                filter_type: *reason,
                reason: format!("media group {} ({} messages)", group_id, ids.len()),
            },
        };
        emit(events, event);
    }
    for applied in &output.replacements {
        emit(
            events,
            EngineEvent::TextReplacementApplied {
                scope: applied.scope.clone(),
                original: applied.original.clone(),
                replaced: applied.replaced.clone(),
            },
        );
    }
}

pub struct GroupDispatcher {
    history: Arc<dyn HistoryPort>,
    resolver: Arc<ChannelResolver>,
    direct: DirectForwarder,
    pipeline: Arc<MediaPipeline>,
    events: EventSender,
}

impl GroupDispatcher {
    pub fn new(
        history: Arc<dyn HistoryPort>,
        resolver: Arc<ChannelResolver>,
        direct: DirectForwarder,
        pipeline: Arc<MediaPipeline>,
        events: EventSender,
    ) -> Self {
        Self {
            history,
            resolver,
            direct,
            pipeline,
            events,
        }
    }

    /// Route one filtered group to every target of the pair. Returns the
    /// per-target outcomes; callers derive delivery/skip accounting from
    /// them.
    pub async fn dispatch(
        &self,
        pair: &Arc<ChannelPair>,
        group: &FilteredGroup,
        silent: bool,
    ) -> Result<Vec<(ChannelId, ForwardOutcome)>, DomainError> {
        if !self.resolver.can_forward(pair.source).await? {
            return self.reupload(pair, group, silent).await;
        }

        let ids: Vec<i32> = group.messages.iter().map(|m| m.id).collect();
        let mut outcomes: Vec<(ChannelId, ForwardOutcome)> =
            Vec::with_capacity(pair.targets.len());
        for (i, &target) in pair.targets.iter().enumerate() {
            if self.fully_forwarded(pair, &ids, target).await? {
                outcomes.push((target, ForwardOutcome::SkippedAlreadyForwarded));
                continue;
            }
            match self.direct.forward_group(pair, group, target, silent).await {
                Ok(outcome) => {
                    self.history
                        .mark_forwarded_many(pair.source, &ids, target)
                        .await?;
                    self.report(pair, &ids, i, target);
                    outcomes.push((target, outcome));
                }
                Err(DomainError::ForwardsRestricted) => {
                    // Target-local restriction: the re-upload path takes over
                    // for this group, covering this and the remaining targets.
                    info!(source = pair.source, target, "forward refused, switching to re-upload");
                    for (t, o) in self.reupload(pair, group, silent).await? {
                        if !outcomes.iter().any(|(seen, _)| *seen == t) {
                            outcomes.push((t, o));
                        }
                    }
                    return Ok(outcomes);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    // Target-local failure: the other targets keep going.
                    error!(source = pair.source, target, error = %e, "target delivery failed");
                    outcomes.push((target, ForwardOutcome::Failed(e.to_string())));
                }
            }
        }
        Ok(outcomes)
    }

    async fn reupload(
        &self,
        pair: &Arc<ChannelPair>,
        group: &FilteredGroup,
        silent: bool,
    ) -> Result<Vec<(ChannelId, ForwardOutcome)>, DomainError> {
        self.pipeline
            .replicate_group(GroupJob {
                pair: Arc::clone(pair),
                group: group.clone(),
                silent,
            })
            .await
    }

    async fn fully_forwarded(
        &self,
        pair: &ChannelPair,
        ids: &[i32],
        target: i64,
    ) -> Result<bool, DomainError> {
        for &id in ids {
            if !self.history.is_forwarded(pair.source, id, target).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn report(&self, pair: &ChannelPair, ids: &[i32], target_index: usize, target: i64) {
        let label = pair
            .target_labels
            .get(target_index)
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
    }
}
