//! Message filter pipeline: the single authoritative filtering stage.
//!
//! Both the batch and live paths feed messages through `apply` unchanged.
//! Stage order is contractual:
//!
//! 1. pre-extract media-group texts (before anything is dropped)
//! 2. universal exclusions (links)
//! 3. keyword filter, group-aware
//! 4. media-type filter, message-level
//! 5. compute the text to attach per surviving group
//! 6. ordered literal text replacements
//!
//! Pure: no I/O, no clocks. Applying it twice with the same config yields
//! identical output.

use crate::domain::{ChannelPair, FilterReason, Message, TextReplacement};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(https?://|www\.|t\.me/|telegram\.me/)").expect("link regex")
});

/// A group that survived filtering. Singletons are groups of one with
/// `group_id == None`. `messages` is ascending by id and never empty; the
/// first message is the caption carrier of the outgoing batch.
#[derive(Debug, Clone)]
pub struct FilteredGroup {
    pub group_id: Option<i64>,
    pub messages: Vec<Message>,
    /// Text to attach to the outgoing group (already replaced). `None` when
    /// captions were removed or the group never carried text.
    pub caption: Option<String>,
    /// True when filtering removed members from the original group; the
    /// forwarder must reassemble instead of forwarding/copying as-is.
    pub trimmed: bool,
    /// True when the outgoing text differs from the original (replacement
    /// fired, or a non-empty caption was removed).
    pub text_modified: bool,
}

/// A drop decision, reported once per message or once per whole group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dropped {
    Message { id: i32, reason: FilterReason },
    Group {
        group_id: i64,
        ids: Vec<i32>,
        reason: FilterReason,
    },
}

/// A text replacement that actually changed something, for host events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedReplacement {
    pub scope: String,
    pub original: String,
    pub replaced: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub input: usize,
    pub kept: usize,
    pub dropped_link: usize,
    pub dropped_keyword: usize,
    pub dropped_media_type: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutput {
    pub groups: Vec<FilteredGroup>,
    pub dropped: Vec<Dropped>,
    /// First non-empty text seen per media group, captured before any stage
    /// could drop the carrier. Restricted reassembly reads this.
    pub group_texts: HashMap<i64, String>,
    pub replacements: Vec<AppliedReplacement>,
    pub stats: FilterStats,
}

/// Run the full pipeline over messages belonging to one pair. The input may
/// span multiple media groups and singletons, in any order.
pub fn apply(messages: &[Message], pair: &ChannelPair) -> FilterOutput {
    let mut msgs: Vec<Message> = messages.to_vec();
    msgs.sort_by_key(|m| m.id);

    let mut out = FilterOutput {
        stats: FilterStats {
            input: msgs.len(),
            ..FilterStats::default()
        },
        ..FilterOutput::default()
    };

    // Stage 1: group texts, from the complete input.
    for m in &msgs {
        if let Some(gid) = m.media_group_id {
            if !m.text.is_empty() {
                out.group_texts.entry(gid).or_insert_with(|| m.text.clone());
            }
        }
    }

    // Original group sizes, for the trimmed flag.
    let mut original_sizes: HashMap<i64, usize> = HashMap::new();
    for m in &msgs {
        if let Some(gid) = m.media_group_id {
            *original_sizes.entry(gid).or_insert(0) += 1;
        }
    }

    // Stage 2: universal exclusions.
    let mut kept = Vec::with_capacity(msgs.len());
    for m in msgs {
        if pair.exclude_links && contains_link(&m) {
            out.stats.dropped_link += 1;
            out.dropped.push(Dropped::Message {
                id: m.id,
                reason: FilterReason::Link,
            });
        } else {
            kept.push(m);
        }
    }

    // Stage 3: keyword filter, group-aware.
    let groups = split_groups(kept);
    let mut survivors = Vec::with_capacity(groups.len());
    for (gid, group) in groups {
        if keyword_pass(&group, &pair.keywords) {
            survivors.push((gid, group));
            continue;
        }
        out.stats.dropped_keyword += group.len();
        match (gid, group.len()) {
            // A singleton is reported as a plain message drop, never as a
            // group event.
            (None, _) | (_, 1) => out.dropped.push(Dropped::Message {
                id: group[0].id,
                reason: FilterReason::Keyword,
            }),
            (Some(gid), _) => out.dropped.push(Dropped::Group {
                group_id: gid,
                ids: group.iter().map(|m| m.id).collect(),
                reason: FilterReason::Keyword,
            }),
        }
    }

    // Stage 4: media-type filter, message-level. May partially empty groups.
    for (gid, group) in survivors {
        let original_size = gid
            .and_then(|g| original_sizes.get(&g).copied())
            .unwrap_or(group.len());
        let mut remaining = Vec::with_capacity(group.len());
        for m in group {
            if pair.media_type_allowed(m.kind()) {
                remaining.push(m);
            } else {
                out.stats.dropped_media_type += 1;
                out.dropped.push(Dropped::Message {
                    id: m.id,
                    reason: FilterReason::MediaType,
                });
            }
        }
        if remaining.is_empty() {
            continue;
        }

        // Stages 5 + 6: attach text.
        let (caption, text_modified) =
            attach_text(gid, &remaining, pair, &out.group_texts, &mut out.replacements);

        out.stats.kept += remaining.len();
        out.groups.push(FilteredGroup {
            group_id: gid,
            trimmed: remaining.len() != original_size,
            messages: remaining,
            caption,
            text_modified,
        });
    }

    out
}

/// Entity-level detection takes precedence: it also catches hidden
/// hyperlinks whose text shows no URL at all.
pub fn contains_link(m: &Message) -> bool {
    if m.entities.iter().any(|e| e.kind.is_link()) {
        return true;
    }
    LINK_RE.is_match(&m.text)
}

/// Split ascending messages into (group id, members) units, preserving the
/// order of first appearance. Singletons become groups of one.
fn split_groups(msgs: Vec<Message>) -> Vec<(Option<i64>, Vec<Message>)> {
    let mut order: Vec<(Option<i64>, Vec<Message>)> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();
    for m in msgs {
        match m.media_group_id {
            Some(gid) => {
                if let Some(&i) = index.get(&gid) {
                    order[i].1.push(m);
                } else {
                    index.insert(gid, order.len());
                    order.push((Some(gid), vec![m]));
                }
            }
            None => order.push((None, vec![m])),
        }
    }
    order
}

/// A group passes when no keywords are configured, or the concatenation of
/// its members' texts contains any keyword, case-insensitive.
fn keyword_pass(group: &[Message], keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let haystack = group
        .iter()
        .map(|m| m.text.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n");
    keywords.iter().any(|k| haystack.contains(&k.to_lowercase()))
}

/// Choose the outgoing text for a surviving group and apply replacements.
fn attach_text(
    gid: Option<i64>,
    remaining: &[Message],
    pair: &ChannelPair,
    group_texts: &HashMap<i64, String>,
    applied: &mut Vec<AppliedReplacement>,
) -> (Option<String>, bool) {
    let carrier = remaining.iter().find(|m| !m.text.is_empty());
    let fallback = gid.and_then(|g| group_texts.get(&g));
    let original = carrier.map(|m| m.text.as_str()).or(fallback.map(String::as_str));

    if pair.remove_captions {
        let had_text = original.is_some_and(|t| !t.is_empty());
        return (None, had_text);
    }

    let Some(original) = original else {
        return (None, false);
    };

    let replaced = apply_replacements(original, &pair.text_replacements);
    let modified = replaced != original;
    if modified {
        applied.push(AppliedReplacement {
            scope: scope_label(gid, remaining),
            original: original.to_string(),
            replaced: replaced.clone(),
        });
    }
    (Some(replaced), modified)
}

fn scope_label(gid: Option<i64>, remaining: &[Message]) -> String {
    match gid {
        Some(g) => format!("group {}", g),
        None => format!("message {}", remaining[0].id),
    }
}

/// Ordered literal substitutions; left-to-right order is authoritative when
/// find-strings overlap.
pub fn apply_replacements(text: &str, replacements: &[TextReplacement]) -> String {
    let mut current = text.to_string();
    for r in replacements {
        if r.find.is_empty() {
            continue;
        }
        current = current.replace(&r.find, &r.replace);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityKind, MediaKind, TextEntity};
    use std::collections::BTreeSet;

    fn pair() -> ChannelPair {
        ChannelPair {
            source: -100111,
            source_label: "src".into(),
            targets: vec![-100222],
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

    fn text_msg(id: i32, text: &str) -> Message {
        Message {
            id,
            chat_id: -100111,
            date: 1_700_000_000 + id as i64,
            text: text.into(),
            media: None,
            media_group_id: None,
            is_forward: false,
            reply_to_msg_id: None,
            entities: vec![],
        }
    }

    fn media_msg(id: i32, kind: MediaKind, gid: i64, caption: &str) -> Message {
        Message {
            media: Some(kind),
            media_group_id: Some(gid),
            ..text_msg(id, caption)
        }
    }

    #[test]
    fn passes_everything_with_default_config() {
        let msgs = vec![text_msg(101, "a"), text_msg(102, "b"), text_msg(103, "c")];
        let out = apply(&msgs, &pair());
        assert_eq!(out.groups.len(), 3);
        assert!(out.dropped.is_empty());
        assert_eq!(out.stats.kept, 3);
        assert!(out.groups.iter().all(|g| !g.trimmed && !g.text_modified));
    }

    #[test]
    fn link_regex_and_entities() {
        let mut p = pair();
        p.exclude_links = true;

        let plain = text_msg(1, "no links here");
        let url = text_msg(2, "see https://example.com");
        let www = text_msg(3, "WWW.example.com in caps");
        let tme = text_msg(4, "join t.me/channel");
        let mut hidden = text_msg(5, "click here");
        hidden.entities.push(TextEntity {
            kind: EntityKind::TextLink,
            offset: 0,
            length: 10,
        });

        let out = apply(&[plain, url, www, tme, hidden], &p);
        assert_eq!(out.groups.len(), 1);
        assert_eq!(out.groups[0].messages[0].id, 1);
        assert_eq!(out.stats.dropped_link, 4);
        assert!(out
            .dropped
            .iter()
            .all(|d| matches!(d, Dropped::Message { reason: FilterReason::Link, .. })));
    }

    #[test]
    fn keyword_passes_whole_group_when_any_member_matches() {
        let mut p = pair();
        p.keywords = vec!["urgent".into()];

        let msgs = vec![
            media_msg(10, MediaKind::Photo, 7, ""),
            media_msg(11, MediaKind::Photo, 7, "please URGENT"),
        ];
        let out = apply(&msgs, &p);
        assert_eq!(out.groups.len(), 1);
        assert_eq!(out.groups[0].messages.len(), 2);
        assert_eq!(out.groups[0].caption.as_deref(), Some("please URGENT"));
    }

    #[test]
    fn keyword_drops_group_with_single_event() {
        let mut p = pair();
        p.keywords = vec!["urgent".into()];

        let msgs = vec![
            media_msg(10, MediaKind::Photo, 7, "nothing"),
            media_msg(11, MediaKind::Photo, 7, "relevant"),
        ];
        let out = apply(&msgs, &p);
        assert!(out.groups.is_empty());
        assert_eq!(
            out.dropped,
            vec![Dropped::Group {
                group_id: 7,
                ids: vec![10, 11],
                reason: FilterReason::Keyword,
            }]
        );
    }

    #[test]
    fn keyword_dropped_singleton_is_a_message_event() {
        let mut p = pair();
        p.keywords = vec!["urgent".into()];
        let out = apply(&[text_msg(42, "hello")], &p);
        assert_eq!(
            out.dropped,
            vec![Dropped::Message {
                id: 42,
                reason: FilterReason::Keyword
            }]
        );
    }

    #[test]
    fn media_type_gate_trims_groups_and_keeps_dropped_carrier_text() {
        let mut p = pair();
        p.media_types = BTreeSet::from([MediaKind::Photo]);

        // Caption rides on the video, which the gate drops.
        let msgs = vec![
            media_msg(10, MediaKind::Photo, 5, ""),
            media_msg(11, MediaKind::Video, 5, "album caption"),
            media_msg(12, MediaKind::Photo, 5, ""),
        ];
        let out = apply(&msgs, &p);
        assert_eq!(out.groups.len(), 1);
        let g = &out.groups[0];
        assert_eq!(g.messages.iter().map(|m| m.id).collect::<Vec<_>>(), vec![10, 12]);
        assert!(g.trimmed);
        // Pre-extracted text survives the carrier drop.
        assert_eq!(g.caption.as_deref(), Some("album caption"));
        assert_eq!(out.group_texts.get(&5).map(String::as_str), Some("album caption"));
    }

    #[test]
    fn pure_text_passes_only_when_text_kind_allowed() {
        let mut p = pair();
        p.media_types = BTreeSet::from([MediaKind::Photo]);
        let out = apply(&[text_msg(1, "hello")], &p);
        assert!(out.groups.is_empty());
        assert_eq!(
            out.dropped,
            vec![Dropped::Message {
                id: 1,
                reason: FilterReason::MediaType
            }]
        );
    }

    #[test]
    fn replacements_are_ordered_and_left_to_right() {
        let reps = vec![
            TextReplacement {
                find: "ab".into(),
                replace: "x".into(),
            },
            TextReplacement {
                find: "xc".into(),
                replace: "y".into(),
            },
        ];
        assert_eq!(apply_replacements("abc", &reps), "y");

        // Disjoint finds commute.
        let disjoint = vec![
            TextReplacement {
                find: "a".into(),
                replace: "1".into(),
            },
            TextReplacement {
                find: "b".into(),
                replace: "2".into(),
            },
        ];
        assert_eq!(apply_replacements("ab", &disjoint), "12");
    }

    #[test]
    fn replacement_sets_modified_and_reports_scope() {
        let mut p = pair();
        p.text_replacements = vec![TextReplacement {
            find: "old".into(),
            replace: "new".into(),
        }];
        let out = apply(&[text_msg(9, "old text")], &p);
        assert_eq!(out.groups[0].caption.as_deref(), Some("new text"));
        assert!(out.groups[0].text_modified);
        assert_eq!(
            out.replacements,
            vec![AppliedReplacement {
                scope: "message 9".into(),
                original: "old text".into(),
                replaced: "new text".into(),
            }]
        );
    }

    #[test]
    fn remove_captions_empties_text_and_marks_modified() {
        let mut p = pair();
        p.remove_captions = true;
        let out = apply(&[media_msg(3, MediaKind::Photo, 2, "caption")], &p);
        assert_eq!(out.groups[0].caption, None);
        assert!(out.groups[0].text_modified);

        // Removing an already-empty caption is not a modification.
        let out = apply(&[media_msg(4, MediaKind::Photo, 3, "")], &p);
        assert_eq!(out.groups[0].caption, None);
        assert!(!out.groups[0].text_modified);
    }

    #[test]
    fn filter_is_idempotent() {
        let mut p = pair();
        p.keywords = vec!["keep".into()];
        p.media_types = BTreeSet::from([MediaKind::Photo, MediaKind::Text]);
        p.text_replacements = vec![TextReplacement {
            find: "keep".into(),
            replace: "kept".into(),
        }];

        let msgs = vec![
            media_msg(10, MediaKind::Photo, 5, "keep this"),
            media_msg(11, MediaKind::Video, 5, ""),
            text_msg(12, "keep me too"),
            text_msg(13, "drop me"),
        ];
        let a = apply(&msgs, &p);
        let b = apply(&msgs, &p);
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.dropped, b.dropped);
        assert_eq!(
            a.groups.iter().map(|g| (&g.caption, g.trimmed)).collect::<Vec<_>>(),
            b.groups.iter().map(|g| (&g.caption, g.trimmed)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn unsorted_input_comes_out_ascending() {
        let msgs = vec![text_msg(103, "c"), text_msg(101, "a"), text_msg(102, "b")];
        let out = apply(&msgs, &pair());
        let ids: Vec<i32> = out.groups.iter().map(|g| g.messages[0].id).collect();
        assert_eq!(ids, vec![101, 102, 103]);
    }
}
