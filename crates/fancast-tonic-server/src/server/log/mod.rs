//! Append-only, in-process message log.
//!
//! This module defines [`MessageLog`], the single shared store that every
//! submission handler appends to and every subscription dispatcher reads
//! from. The log is strictly append-only: entries are never mutated or
//! removed, and the length is the next sequence number to be assigned.
//!
//! ## Wakeup semantics
//!
//! Dispatchers that have caught up with the log must block until it grows
//! rather than busy-poll. The log publishes its length through a
//! [`tokio::sync::watch`] channel for this purpose: a receiver that last
//! observed version `v` resolves immediately on any later send, so a
//! dispatcher that checks the length and then awaits
//! [`watch::Receiver::changed`] can never miss an append that raced the
//! check.

use fancast_tonic_core::{Error, Result, proto::Note, types::SeqNo};
use parking_lot::RwLock;
use tokio::sync::watch;

/// Shared append-only log of every note the service has accepted.
///
/// Owned by the gRPC service and handed to handlers behind an `Arc`; there
/// is no process-global instance. Growth is unbounded for the lifetime of
/// the process.
pub struct MessageLog {
    entries: RwLock<Vec<Note>>,
    len_tx: watch::Sender<SeqNo>,
}

impl MessageLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            entries: RwLock::new(Vec::new()),
            len_tx,
        }
    }

    /// Appends a note and returns the sequence number it was assigned.
    ///
    /// The new length is published while the write lock is still held, so
    /// watchers observe lengths in a strictly increasing order even under
    /// concurrent appends.
    pub fn append(&self, note: Note) -> SeqNo {
        let mut entries = self.entries.write();
        let seq = entries.len() as SeqNo;
        entries.push(note);
        self.len_tx.send_replace(seq + 1);
        seq
    }

    /// Current number of stored notes. Strictly non-decreasing.
    pub fn len(&self) -> SeqNo {
        self.entries.read().len() as SeqNo
    }

    /// True if nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the note at `seq`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `seq >= len()`. Dispatchers only
    /// read positions they have already observed, so hitting this is a
    /// logic bug rather than an expected runtime condition.
    pub fn at(&self, seq: SeqNo) -> Result<Note> {
        let entries = self.entries.read();
        entries
            .get(seq as usize)
            .cloned()
            .ok_or(Error::OutOfRange {
                seq,
                len: entries.len() as SeqNo,
            })
    }

    /// Subscribes to log growth.
    ///
    /// The receiver yields the log length at each change. Callers should
    /// treat it purely as a wakeup signal and re-read [`MessageLog::len`]
    /// for the authoritative value.
    pub fn watch_len(&self) -> watch::Receiver<SeqNo> {
        self.len_tx.subscribe()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(sender: &str, content: &str) -> Note {
        Note {
            sender: sender.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn append_assigns_sequential_numbers() {
        let log = MessageLog::new();
        assert!(log.is_empty());

        assert_eq!(log.append(note("a", "hi")), 0);
        assert_eq!(log.append(note("b", "yo")), 1);
        assert_eq!(log.append(note("a", "bye")), 2);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn at_returns_entries_unchanged_and_repeatable() {
        let log = MessageLog::new();
        let submitted = [note("a", "hi"), note("b", "yo"), note("c", "ok")];
        for n in &submitted {
            log.append(n.clone());
        }

        for (i, n) in submitted.iter().enumerate() {
            let first = log.at(i as SeqNo).unwrap();
            let second = log.at(i as SeqNo).unwrap();
            assert_eq!(&first, n);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn at_past_the_end_is_out_of_range() {
        let log = MessageLog::new();
        log.append(note("a", "hi"));

        match log.at(1) {
            Err(Error::OutOfRange { seq, len }) => {
                assert_eq!(seq, 1);
                assert_eq!(len, 1);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn concurrent_appends_are_gapless() {
        use std::collections::HashSet;
        use std::sync::Mutex;
        use std::thread::scope;

        const THREADS: usize = 8;
        const APPENDS_PER_THREAD: usize = 256;

        let log = MessageLog::new();
        let seen = Mutex::new(HashSet::with_capacity(THREADS * APPENDS_PER_THREAD));

        scope(|s| {
            for t in 0..THREADS {
                let log = &log;
                let seen = &seen;
                s.spawn(move || {
                    for i in 0..APPENDS_PER_THREAD {
                        let seq = log.append(note(&format!("t{t}"), &format!("m{i}")));
                        assert!(seen.lock().unwrap().insert(seq), "duplicate seq {seq}");
                    }
                });
            }
        });

        let total = (THREADS * APPENDS_PER_THREAD) as SeqNo;
        assert_eq!(log.len(), total);
        // Unique and dense: every position below the final length was
        // assigned exactly once.
        for seq in 0..total {
            assert!(seen.lock().unwrap().contains(&seq));
        }
    }

    #[tokio::test]
    async fn watch_wakes_on_append() {
        let log = MessageLog::new();
        let mut growth = log.watch_len();

        log.append(note("a", "hi"));
        growth.changed().await.unwrap();
        assert_eq!(*growth.borrow_and_update(), 1);
    }
}
