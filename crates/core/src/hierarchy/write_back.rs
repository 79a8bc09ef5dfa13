//! Pending durable writes for the write-back policy

use std::collections::HashMap;

use parking_lot::Mutex;

/// Durable mutation waiting for a flush
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingWrite {
    Put(Vec<u8>),
    Remove,
}

/// One staged write, tagged with its staging sequence number
#[derive(Debug)]
pub(crate) struct StagedWrite {
    pub(crate) key: Vec<u8>,
    pub(crate) seq: u64,
    pub(crate) write: PendingWrite,
}

#[derive(Debug, Default)]
struct BufferState {
    writes: HashMap<Vec<u8>, (u64, PendingWrite)>,
    next_seq: u64,
}

/// Latest pending write per encoded key
#[derive(Debug, Default)]
pub(crate) struct WriteBackBuffer {
    state: Mutex<BufferState>,
}

impl WriteBackBuffer {
    /// Stage `write` for `key`, replacing any older pending write for it.
    /// Returns the number of pending keys afterwards.
    pub(crate) fn stage(&self, key: Vec<u8>, write: PendingWrite) -> usize {
        let mut state = self.state.lock();
        state.next_seq += 1;
        let seq = state.next_seq;
        state.writes.insert(key, (seq, write));
        state.writes.len()
    }

    pub(crate) fn lookup(&self, key: &[u8]) -> Option<PendingWrite> {
        self.state.lock().writes.get(key).map(|(_, write)| write.clone())
    }

    /// Copy every pending write, oldest first. The writes stay staged, and
    /// visible to `lookup`, until [`complete`](Self::complete) retires them.
    pub(crate) fn snapshot(&self) -> Vec<StagedWrite> {
        let state = self.state.lock();
        let mut staged: Vec<StagedWrite> = state
            .writes
            .iter()
            .map(|(key, (seq, write))| StagedWrite {
                key: key.clone(),
                seq: *seq,
                write: write.clone(),
            })
            .collect();
        staged.sort_by_key(|w| w.seq);
        staged
    }

    /// Retire a write that reached the store. A key staged again since the
    /// snapshot keeps its newer write.
    pub(crate) fn complete(&self, key: &[u8], seq: u64) -> bool {
        let mut state = self.state.lock();
        match state.writes.get(key) {
            Some((staged, _)) if *staged == seq => {
                state.writes.remove(key);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().writes.len()
    }
}
