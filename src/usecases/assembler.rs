//! Live media-group reassembly.
//!
//! Telegram delivers album members as separate messages with a shared
//! `grouped_id` and no end marker. Incoming members are buffered per group
//! until the group is declared complete:
//!
//! - the expected total (when the SDK exposes one) has been reached, or
//! - nothing new arrived for `quiescence` (8 s), or
//! - `hard_timeout` (20 s) passed since the first member, or
//! - at least `soft_min` members sat quietly for `soft_quiescence` (5 s).
//!
//! A dispatched group is immutable: members arriving later go to a side
//! cache of recently dispatched ids and are evaluated individually.

use crate::domain::Message;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::debug;

const QUIESCENCE: Duration = Duration::from_secs(8);
const HARD_TIMEOUT: Duration = Duration::from_secs(20);
const SOFT_MIN: usize = 8;
const SOFT_QUIESCENCE: Duration = Duration::from_secs(5);

/// Remembered dispatched group ids, for late-arrival routing.
const DISPATCHED_CACHE: usize = 128;

/// Outcome of depositing one message.
#[derive(Debug)]
pub enum Deposit {
    /// Buffered; the group is still collecting.
    Buffered,
    /// This message completed the group.
    Complete(Vec<Message>),
    /// The group was already dispatched; evaluate this message on its own.
    Late(Message),
}

struct PendingGroup {
    messages: Vec<Message>,
    first_seen: Instant,
    last_seen: Instant,
    expected: Option<usize>,
}

pub struct MediaGroupAssembler {
    pending: HashMap<i64, PendingGroup>,
    dispatched: LruCache<i64, ()>,
    quiescence: Duration,
    hard_timeout: Duration,
    soft_min: usize,
    soft_quiescence: Duration,
}

impl Default for MediaGroupAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaGroupAssembler {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            dispatched: LruCache::new(NonZeroUsize::new(DISPATCHED_CACHE).expect("cache cap")),
            quiescence: QUIESCENCE,
            hard_timeout: HARD_TIMEOUT,
            soft_min: SOFT_MIN,
            soft_quiescence: SOFT_QUIESCENCE,
        }
    }

    #[cfg(test)]
    fn with_timeouts(
        mut self,
        quiescence: Duration,
        hard_timeout: Duration,
        soft_min: usize,
        soft_quiescence: Duration,
    ) -> Self {
        self.quiescence = quiescence;
        self.hard_timeout = hard_timeout;
        self.soft_min = soft_min;
        self.soft_quiescence = soft_quiescence;
        self
    }

    /// Deposit a message carrying a `media_group_id`. `expected_total` is
    /// the SDK's album size when it exposes one.
    pub fn deposit(&mut self, msg: Message, expected_total: Option<usize>, now: Instant) -> Deposit {
        let Some(gid) = msg.media_group_id else {
            // Not an album member; nothing to assemble.
            return Deposit::Complete(vec![msg]);
        };

        if self.dispatched.contains(&gid) {
            debug!(gid, id = msg.id, "late album member, routing individually");
            return Deposit::Late(msg);
        }

        let entry = self.pending.entry(gid).or_insert_with(|| PendingGroup {
            messages: Vec::new(),
            first_seen: now,
            last_seen: now,
            expected: None,
        });
        entry.messages.push(msg);
        entry.last_seen = now;
        if let Some(total) = expected_total {
            entry.expected = Some(total);
        }

        if entry
            .expected
            .is_some_and(|total| entry.messages.len() >= total)
        {
            return Deposit::Complete(self.take(gid));
        }
        Deposit::Buffered
    }

    /// Complete every group whose timeout elapsed. Call roughly once per
    /// second from the monitor loop.
    pub fn sweep(&mut self, now: Instant) -> Vec<Vec<Message>> {
        let due: Vec<i64> = self
            .pending
            .iter()
            .filter(|(_, g)| {
                now.duration_since(g.last_seen) >= self.quiescence
                    || now.duration_since(g.first_seen) >= self.hard_timeout
                    || (g.messages.len() >= self.soft_min
                        && now.duration_since(g.last_seen) >= self.soft_quiescence)
            })
            .map(|(&gid, _)| gid)
            .collect();

        due.into_iter().map(|gid| self.take(gid)).collect()
    }

    pub fn pending_groups(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_messages(&self) -> usize {
        self.pending.values().map(|g| g.messages.len()).sum()
    }

    fn take(&mut self, gid: i64) -> Vec<Message> {
        let mut group = self
            .pending
            .remove(&gid)
            .map(|g| g.messages)
            .unwrap_or_default();
        group.sort_by_key(|m| m.id);
        self.dispatched.put(gid, ());
        group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaKind;

    fn member(id: i32, gid: i64) -> Message {
        Message {
            id,
            chat_id: -100,
            date: id as i64,
            text: String::new(),
            media: Some(MediaKind::Photo),
            media_group_id: Some(gid),
            is_forward: false,
            reply_to_msg_id: None,
            entities: vec![],
        }
    }

    fn fast() -> MediaGroupAssembler {
        MediaGroupAssembler::new().with_timeouts(
            Duration::from_secs(8),
            Duration::from_secs(20),
            8,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn completes_on_expected_total() {
        let mut asm = fast();
        let t0 = Instant::now();
        assert!(matches!(asm.deposit(member(1, 7), Some(3), t0), Deposit::Buffered));
        assert!(matches!(asm.deposit(member(3, 7), None, t0), Deposit::Buffered));
        match asm.deposit(member(2, 7), None, t0) {
            Deposit::Complete(group) => {
                assert_eq!(group.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2, 3]);
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(asm.pending_groups(), 0);
    }

    #[test]
    fn completes_on_quiescence() {
        let mut asm = fast();
        let t0 = Instant::now();
        asm.deposit(member(1, 7), None, t0);
        asm.deposit(member(2, 7), None, t0 + Duration::from_secs(1));

        assert!(asm.sweep(t0 + Duration::from_secs(8)).is_empty());
        let done = asm.sweep(t0 + Duration::from_secs(9));
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].len(), 2);
    }

    #[test]
    fn completes_on_hard_timeout_despite_steady_arrivals() {
        let mut asm = fast();
        let t0 = Instant::now();
        // A drip-feed keeps resetting quiescence; the hard timeout fires anyway.
        for i in 0..5 {
            asm.deposit(member(i, 7), None, t0 + Duration::from_secs(4 * i as u64));
        }
        let done = asm.sweep(t0 + Duration::from_secs(20));
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].len(), 5);
    }

    #[test]
    fn soft_threshold_completes_large_groups_sooner() {
        let mut asm = fast();
        let t0 = Instant::now();
        for i in 0..8 {
            asm.deposit(member(i, 7), None, t0);
        }
        // 5s of quiet is enough once 8 members are in; plain quiescence is 8s.
        let done = asm.sweep(t0 + Duration::from_secs(5));
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].len(), 8);
    }

    #[test]
    fn late_members_are_never_merged_into_a_dispatched_group() {
        let mut asm = fast();
        let t0 = Instant::now();
        asm.deposit(member(1, 7), Some(1), t0);
        match asm.deposit(member(2, 7), None, t0 + Duration::from_secs(1)) {
            Deposit::Late(m) => assert_eq!(m.id, 2),
            other => panic!("expected late routing, got {:?}", other),
        }
    }

    #[test]
    fn independent_groups_do_not_interfere() {
        let mut asm = fast();
        let t0 = Instant::now();
        asm.deposit(member(1, 7), None, t0);
        asm.deposit(member(10, 8), None, t0 + Duration::from_secs(6));

        let done = asm.sweep(t0 + Duration::from_secs(9));
        assert_eq!(done.len(), 1);
        assert_eq!(done[0][0].media_group_id, Some(7));
        assert_eq!(asm.pending_groups(), 1);
    }

    #[test]
    fn non_album_message_passes_straight_through() {
        let mut asm = fast();
        let mut m = member(1, 7);
        m.media_group_id = None;
        match asm.deposit(m, None, Instant::now()) {
            Deposit::Complete(group) => assert_eq!(group.len(), 1),
            other => panic!("expected pass-through, got {:?}", other),
        }
    }
}
