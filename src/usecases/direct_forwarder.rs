//! Server-side replication: native forward, copy, or by-reference
//! reassembly, chosen per filtered group.
//!
//! The caller is responsible for routing restricted sources to the media
//! pipeline; a `ForwardsRestricted` error from here means "this target (or
//! source) needs the re-upload path".

use crate::domain::{
    ChannelId, ChannelPair, DomainError, ForwardOutcome, MediaItem, OutgoingMedia,
};
use crate::ports::TgGateway;
use crate::shared::RateLimiter;
use crate::usecases::filter::FilteredGroup;
use std::sync::Arc;
use tracing::debug;

/// Wire behavior for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WirePlan {
    /// Untouched group, attribution allowed: cheapest, preserves "forwarded
    /// from".
    Native,
    /// Untouched group but attribution hidden or text changed: server-side
    /// copy keeps the album intact without re-transferring media.
    CopyBatch,
    /// Filtering removed members: the album must be rebuilt from the
    /// surviving messages' media references.
    Reassemble,
}

pub fn plan(group: &FilteredGroup, pair: &ChannelPair) -> WirePlan {
    if group.trimmed {
        WirePlan::Reassemble
    } else if pair.hide_author || group.text_modified {
        WirePlan::CopyBatch
    } else {
        WirePlan::Native
    }
}

pub struct DirectForwarder {
    tg: Arc<dyn TgGateway>,
    limiter: RateLimiter,
}

impl DirectForwarder {
    pub fn new(tg: Arc<dyn TgGateway>, limiter: RateLimiter) -> Self {
        Self { tg, limiter }
    }

    /// Replicate one filtered group to one target. Returns how it went over
    /// the wire; `ForwardsRestricted` propagates for the caller's fallback.
    pub async fn forward_group(
        &self,
        pair: &ChannelPair,
        group: &FilteredGroup,
        target: ChannelId,
        silent: bool,
    ) -> Result<ForwardOutcome, DomainError> {
        let ids: Vec<i32> = group.messages.iter().map(|m| m.id).collect();
        let plan = plan(group, pair);
        debug!(source = pair.source, target, ?plan, ?ids, "dispatching group");

        match plan {
            WirePlan::Native => {
                self.limiter
                    .run("forward_messages", || {
                        self.tg.forward_messages(target, pair.source, &ids, silent)
                    })
                    .await?;
                Ok(ForwardOutcome::ForwardedNative)
            }
            WirePlan::CopyBatch => {
                // Only override the caption when the filter actually changed
                // the text; otherwise the server-side copy keeps it.
                let caption = group
                    .text_modified
                    .then(|| group.caption.clone().unwrap_or_default());
                self.limiter
                    .run("copy_messages", || {
                        self.tg.copy_messages(
                            target,
                            pair.source,
                            &ids,
                            caption.as_deref(),
                            silent,
                        )
                    })
                    .await?;
                Ok(ForwardOutcome::ForwardedCopied)
            }
            WirePlan::Reassemble => {
                let items = reassembly_items(pair.source, group);
                self.limiter
                    .run("send_media_group", || {
                        self.tg.send_media_group(target, &items, silent)
                    })
                    .await?;
                Ok(ForwardOutcome::ForwardedCopied)
            }
        }
    }
}

/// Build the fresh media batch for a trimmed group: by-reference items for
/// every surviving member, computed caption on the first.
fn reassembly_items(source: ChannelId, group: &FilteredGroup) -> Vec<OutgoingMedia> {
    group
        .messages
        .iter()
        .filter_map(|m| m.media.map(|kind| (m.id, kind)))
        .enumerate()
        .map(|(i, (message_id, kind))| OutgoingMedia {
            item: MediaItem::Existing {
                src_chat: source,
                message_id,
                kind,
            },
            caption: if i == 0 { group.caption.clone() } else { None },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{event_channel, MediaKind, Message};
    use crate::usecases::test_support::{GatewayCall, MockGateway};
    use tokio_util::sync::CancellationToken;

    fn pair() -> ChannelPair {
        ChannelPair {
            source: -100,
            source_label: "src".into(),
            targets: vec![-200],
            target_labels: vec!["dst".into()],
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
        }
    }

    fn group(ids: &[i32], trimmed: bool, modified: bool) -> FilteredGroup {
        FilteredGroup {
            group_id: Some(5),
            messages: ids
                .iter()
                .map(|&id| Message {
                    id,
                    chat_id: -100,
                    date: id as i64,
                    text: String::new(),
                    media: Some(MediaKind::Photo),
                    media_group_id: Some(5),
                    is_forward: false,
                    reply_to_msg_id: None,
                    entities: vec![],
                })
                .collect(),
            caption: Some("caption".into()),
            trimmed,
            text_modified: modified,
        }
    }

    fn forwarder(tg: Arc<MockGateway>) -> DirectForwarder {
        let (events, _rx) = event_channel();
        DirectForwarder::new(tg, RateLimiter::new(events, CancellationToken::new()))
    }

    #[test]
    fn plan_selection_table() {
        let p = pair();
        assert_eq!(plan(&group(&[1, 2], false, false), &p), WirePlan::Native);
        assert_eq!(plan(&group(&[1, 2], false, true), &p), WirePlan::CopyBatch);
        assert_eq!(plan(&group(&[1], true, false), &p), WirePlan::Reassemble);

        let mut hidden = pair();
        hidden.hide_author = true;
        assert_eq!(plan(&group(&[1, 2], false, false), &hidden), WirePlan::CopyBatch);
        // Trimming wins over hide_author.
        assert_eq!(plan(&group(&[1], true, false), &hidden), WirePlan::Reassemble);
    }

    #[tokio::test]
    async fn native_forward_sends_the_id_list() {
        let tg = Arc::new(MockGateway::new());
        tg.add_chat(-100, "src", true);
        let out = forwarder(Arc::clone(&tg))
            .forward_group(&pair(), &group(&[101, 102, 103], false, false), -200, false)
            .await
            .unwrap();
        assert_eq!(out, ForwardOutcome::ForwardedNative);
        assert_eq!(
            tg.calls(),
            vec![GatewayCall::Forward {
                dst: -200,
                src: -100,
                ids: vec![101, 102, 103],
                silent: false,
            }]
        );
    }

    #[tokio::test]
    async fn copy_overrides_caption_only_when_text_changed() {
        let tg = Arc::new(MockGateway::new());
        tg.add_chat(-100, "src", true);
        let fwd = forwarder(Arc::clone(&tg));

        let mut hidden = pair();
        hidden.hide_author = true;
        fwd.forward_group(&hidden, &group(&[1, 2], false, false), -200, true)
            .await
            .unwrap();

        fwd.forward_group(&pair(), &group(&[3, 4], false, true), -200, true)
            .await
            .unwrap();

        let calls = tg.calls();
        assert_eq!(
            calls[0],
            GatewayCall::Copy {
                dst: -200,
                src: -100,
                ids: vec![1, 2],
                caption: None,
                silent: true,
            }
        );
        assert_eq!(
            calls[1],
            GatewayCall::Copy {
                dst: -200,
                src: -100,
                ids: vec![3, 4],
                caption: Some("caption".into()),
                silent: true,
            }
        );
    }

    #[tokio::test]
    async fn trimmed_group_is_reassembled_as_fresh_album() {
        let tg = Arc::new(MockGateway::new());
        tg.add_chat(-100, "src", true);
        let out = forwarder(Arc::clone(&tg))
            .forward_group(&pair(), &group(&[10, 12], true, false), -200, false)
            .await
            .unwrap();
        assert_eq!(out, ForwardOutcome::ForwardedCopied);
        assert_eq!(
            tg.calls(),
            vec![GatewayCall::SendAlbum {
                dst: -200,
                local: false,
                count: 2,
                caption: Some("caption".into()),
                silent: false,
            }]
        );
    }

    #[tokio::test]
    async fn restriction_propagates_for_fallback() {
        let tg = Arc::new(MockGateway::new());
        tg.add_chat(-100, "src", false);
        let err = forwarder(Arc::clone(&tg))
            .forward_group(&pair(), &group(&[1], false, false), -200, false)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ForwardsRestricted));
        assert!(tg.calls().is_empty());
    }
}
