use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::model::{LogRecord, SourceId};

/// Per-source counters since the last clear. A source is dropped from the
/// tallies once none of its records remain in the buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceTally {
    pub total: u64,
    pub errors: u64,
}

/// Position in the buffer's append history.
///
/// `seq` is the sequence number the next append will receive; `epoch`
/// changes on every clear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Watermark {
    pub epoch: u64,
    pub seq: u64,
}

/// Records appended after a watermark
#[derive(Clone, Debug)]
pub struct BufferDelta {
    /// True when `records` is the whole buffer rather than an increment
    pub full: bool,
    /// Sequence number of the oldest record still held
    pub first_seq: u64,
    /// Sequence number of `records[0]`
    pub start_seq: u64,
    pub records: Vec<Arc<LogRecord>>,
    pub watermark: Watermark,
}

#[derive(Debug, Default)]
struct TallyEntry {
    tally: SourceTally,
    /// Records of this source currently held
    held: usize,
}

#[derive(Debug)]
struct Inner {
    records: VecDeque<Arc<LogRecord>>,
    next_seq: u64,
    epoch: u64,
    tallies: BTreeMap<SourceId, TallyEntry>,
}

impl Inner {
    fn first_seq(&self) -> u64 {
        self.next_seq - self.records.len() as u64
    }

    fn watermark(&self) -> Watermark {
        Watermark {
            epoch: self.epoch,
            seq: self.next_seq,
        }
    }

    /// Forget an evicted record; keeps the tally map no larger than the buffer
    fn release(&mut self, component: &str) {
        if let Some(entry) = self.tallies.get_mut(component) {
            entry.held = entry.held.saturating_sub(1);
            if entry.held == 0 {
                self.tallies.remove(component);
            }
        }
    }
}

/// Fixed-capacity FIFO of log records shared by the subscriber and the UI.
///
/// Appends evict the oldest record once `capacity` is reached. Every
/// operation holds the lock only long enough to move `Arc` pointers.
#[derive(Debug)]
pub struct BoundedBuffer {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl BoundedBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Inner {
                records: VecDeque::with_capacity(capacity.min(4096)),
                next_seq: 0,
                epoch: 0,
                tallies: BTreeMap::new(),
            }),
        }
    }

    // Every critical section leaves `Inner` consistent; poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn append(&self, record: LogRecord) {
        let record = Arc::new(record);
        let mut inner = self.lock();

        if inner.records.len() >= self.capacity {
            let evicted = inner.records.pop_front();
            if let Some(evicted) = evicted {
                inner.release(&evicted.component);
            }
        }

        let entry = inner.tallies.entry(record.component.clone()).or_default();
        entry.held += 1;
        entry.tally.total += 1;
        if record.level.is_error() {
            entry.tally.errors += 1;
        }

        inner.records.push_back(record);
        inner.next_seq += 1;
    }

    /// Point-in-time copy of every held record, oldest first
    pub fn snapshot(&self) -> Vec<Arc<LogRecord>> {
        self.lock().records.iter().cloned().collect()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.records.clear();
        inner.tallies.clear();
        inner.epoch += 1;
    }

    pub fn watermark(&self) -> Watermark {
        self.lock().watermark()
    }

    /// Records appended since `since`, or the whole buffer when `since` is
    /// `None` or belongs to an earlier epoch.
    pub fn read_since(&self, since: Option<Watermark>) -> BufferDelta {
        let inner = self.lock();
        let first_seq = inner.first_seq();

        match since {
            Some(mark) if mark.epoch == inner.epoch => {
                let start_seq = mark.seq.max(first_seq).min(inner.next_seq);
                let skip = (start_seq - first_seq) as usize;
                BufferDelta {
                    full: false,
                    first_seq,
                    start_seq,
                    records: inner.records.iter().skip(skip).cloned().collect(),
                    watermark: inner.watermark(),
                }
            }
            _ => BufferDelta {
                full: true,
                first_seq,
                start_seq: first_seq,
                records: inner.records.iter().cloned().collect(),
                watermark: inner.watermark(),
            },
        }
    }

    /// Per-source totals, ordered by source id
    pub fn tallies(&self) -> Vec<(SourceId, SourceTally)> {
        self.lock()
            .tallies
            .iter()
            .map(|(id, entry)| (id.clone(), entry.tally))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogLevel;

    fn rec(i: usize) -> LogRecord {
        LogRecord::new("backend", LogLevel::Info, format!("line {}", i))
    }

    fn messages(records: &[Arc<LogRecord>]) -> Vec<String> {
        records.iter().map(|r| r.message.clone()).collect()
    }

    #[test]
    fn test_eviction_keeps_last_n_in_order() {
        let buffer = BoundedBuffer::new(5);
        for i in 0..12 {
            buffer.append(rec(i));
            assert!(buffer.len() <= 5);
        }
        let expected: Vec<String> = (7..12).map(|i| format!("line {}", i)).collect();
        assert_eq!(messages(&buffer.snapshot()), expected);
    }

    #[test]
    fn test_under_capacity_keeps_everything() {
        let buffer = BoundedBuffer::new(10);
        for i in 0..3 {
            buffer.append(rec(i));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(messages(&buffer.snapshot()), vec!["line 0", "line 1", "line 2"]);
    }

    #[test]
    fn test_clear_empties_until_next_append() {
        let buffer = BoundedBuffer::new(4);
        for i in 0..6 {
            buffer.append(rec(i));
        }
        buffer.clear();
        assert!(buffer.snapshot().is_empty());
        assert!(buffer.snapshot().is_empty());
        assert!(buffer.tallies().is_empty());

        buffer.append(rec(99));
        assert_eq!(messages(&buffer.snapshot()), vec!["line 99"]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let buffer = BoundedBuffer::new(0);
        buffer.append(rec(1));
        buffer.append(rec(2));
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(messages(&buffer.snapshot()), vec!["line 2"]);
    }

    #[test]
    fn test_read_since_returns_increment() {
        let buffer = BoundedBuffer::new(10);
        buffer.append(rec(0));
        buffer.append(rec(1));
        let first = buffer.read_since(None);
        assert!(first.full);
        assert_eq!(first.records.len(), 2);

        buffer.append(rec(2));
        let delta = buffer.read_since(Some(first.watermark));
        assert!(!delta.full);
        assert_eq!(delta.start_seq, 2);
        assert_eq!(messages(&delta.records), vec!["line 2"]);

        let empty = buffer.read_since(Some(delta.watermark));
        assert!(empty.records.is_empty());
    }

    #[test]
    fn test_read_since_skips_evicted_records() {
        let buffer = BoundedBuffer::new(3);
        buffer.append(rec(0));
        let mark = buffer.watermark();
        for i in 1..8 {
            buffer.append(rec(i));
        }
        let delta = buffer.read_since(Some(mark));
        assert!(!delta.full);
        assert_eq!(delta.first_seq, 5);
        assert_eq!(delta.start_seq, 5);
        assert_eq!(messages(&delta.records), vec!["line 5", "line 6", "line 7"]);
    }

    #[test]
    fn test_read_since_after_clear_is_full() {
        let buffer = BoundedBuffer::new(3);
        buffer.append(rec(0));
        let mark = buffer.watermark();
        buffer.clear();
        buffer.append(rec(1));
        let delta = buffer.read_since(Some(mark));
        assert!(delta.full);
        assert_eq!(messages(&delta.records), vec!["line 1"]);
    }

    #[test]
    fn test_tallies_count_errors() {
        let buffer = BoundedBuffer::new(10);
        buffer.append(LogRecord::new("backend", LogLevel::Info, "a"));
        buffer.append(LogRecord::new("backend", LogLevel::Error, "b"));
        buffer.append(LogRecord::new("batch", LogLevel::Critical, "c"));

        let tallies = buffer.tallies();
        assert_eq!(
            tallies,
            vec![
                ("backend".to_string(), SourceTally { total: 2, errors: 1 }),
                ("batch".to_string(), SourceTally { total: 1, errors: 1 }),
            ]
        );
    }

    #[test]
    fn test_tallies_drop_fully_evicted_sources() {
        let buffer = BoundedBuffer::new(2);
        for component in ["a", "b", "c", "d", "e"] {
            buffer.append(LogRecord::new(component, LogLevel::Info, "x"));
        }
        let ids: Vec<String> = buffer.tallies().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["d", "e"]);
    }

    #[test]
    fn test_tallies_keep_counting_past_capacity() {
        let buffer = BoundedBuffer::new(2);
        for _ in 0..3 {
            buffer.append(LogRecord::new("backend", LogLevel::Error, "x"));
        }
        buffer.append(LogRecord::new("batch", LogLevel::Info, "y"));

        assert_eq!(
            buffer.tallies(),
            vec![
                ("backend".to_string(), SourceTally { total: 3, errors: 3 }),
                ("batch".to_string(), SourceTally { total: 1, errors: 0 }),
            ]
        );
    }

    #[test]
    fn test_concurrent_append_and_snapshot() {
        let buffer = Arc::new(BoundedBuffer::new(64));
        let writer = {
            let buffer = buffer.clone();
            std::thread::spawn(move || {
                for i in 0..5_000 {
                    buffer.append(rec(i));
                }
            })
        };

        for _ in 0..500 {
            let snap = buffer.snapshot();
            assert!(snap.len() <= 64);
            // Records inside one snapshot are always contiguous and ordered
            let numbers: Vec<usize> = snap
                .iter()
                .map(|r| r.message.trim_start_matches("line ").parse().unwrap())
                .collect();
            assert!(numbers.windows(2).all(|w| w[1] == w[0] + 1));
        }

        writer.join().unwrap();
        assert_eq!(buffer.len(), 64);
    }
}
