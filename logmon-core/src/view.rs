//! Filtered, scrollable window over the bounded buffer.
//!
//! The engine keeps the records that pass the active filter together with
//! their buffer sequence numbers and the buffer watermark they reflect. Each
//! `sync` pulls only what was appended since that watermark, trims what the
//! buffer evicted, and filters the new records. A full rebuild happens only
//! after a clear or a filter change, which keeps per-frame work proportional
//! to the arrival rate instead of the buffer size.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::buffer::{BoundedBuffer, BufferDelta, Watermark};
use crate::log_filter::Filter;
use crate::model::LogRecord;

const DEFAULT_VIEWPORT: usize = 20;

/// Scroll position, counted in lines back from the newest matching record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewCursor {
    pub offset: usize,
    pub follow: bool,
}

impl Default for ViewCursor {
    fn default() -> Self {
        Self {
            offset: 0,
            follow: true,
        }
    }
}

#[derive(Debug, Default)]
struct FilterCache {
    mark: Option<Watermark>,
    entries: VecDeque<(u64, Arc<LogRecord>)>,
}

#[derive(Debug)]
pub struct ViewEngine {
    filter: Filter,
    cursor: ViewCursor,
    viewport: usize,
    cache: FilterCache,
    /// Full read of the buffer taken when pausing
    frozen: Option<BufferDelta>,
    rebuilds: u64,
}

impl Default for ViewEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewEngine {
    pub fn new() -> Self {
        Self {
            filter: Filter::All,
            cursor: ViewCursor::default(),
            viewport: DEFAULT_VIEWPORT,
            cache: FilterCache::default(),
            frozen: None,
            rebuilds: 0,
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn cursor(&self) -> ViewCursor {
        self.cursor
    }

    pub fn is_following(&self) -> bool {
        self.cursor.follow
    }

    pub fn is_paused(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn viewport(&self) -> usize {
        self.viewport
    }

    /// Number of full re-filters performed so far
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Number of records passing the filter
    pub fn matching_len(&self) -> usize {
        self.cache.entries.len()
    }

    /// Selecting a filter always returns to follow-tail
    pub fn set_filter(&mut self, filter: Filter) {
        if filter != self.filter {
            self.filter = filter;
            self.cache.mark = None;
        }
        self.jump_to_end();
    }

    pub fn set_viewport(&mut self, height: usize) {
        self.viewport = height.max(1);
        self.clamp();
    }

    /// Bring the cache up to date with the buffer. Returns true when the
    /// filtered result changed.
    pub fn sync(&mut self, buffer: &BoundedBuffer) -> bool {
        if let Some(frozen) = &self.frozen {
            if self.cache.mark.is_none() {
                let full = frozen.clone();
                self.rebuild(&full);
                return true;
            }
            return false;
        }

        let delta = buffer.read_since(self.cache.mark);
        self.apply(&delta)
    }

    /// Records currently inside the viewport, oldest first
    pub fn visible(&self) -> Vec<Arc<LogRecord>> {
        let (start, end) = self.window();
        self.cache
            .entries
            .range(start..end)
            .map(|(_, rec)| rec.clone())
            .collect()
    }

    fn window(&self) -> (usize, usize) {
        let len = self.cache.entries.len();
        let end = len - self.cursor.offset.min(len);
        let start = end.saturating_sub(self.viewport);
        (start, end)
    }

    fn max_offset(&self) -> usize {
        self.cache.entries.len().saturating_sub(self.viewport)
    }

    fn clamp(&mut self) {
        if self.cursor.follow {
            self.cursor.offset = 0;
        } else {
            self.cursor.offset = self.cursor.offset.min(self.max_offset());
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.cursor.follow = false;
        self.cursor.offset = self.cursor.offset.saturating_add(lines).min(self.max_offset());
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.cursor.follow = false;
        self.cursor.offset = self.cursor.offset.saturating_sub(lines);
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.viewport.saturating_sub(1).max(1));
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.viewport.saturating_sub(1).max(1));
    }

    pub fn jump_to_end(&mut self) {
        self.cursor = ViewCursor::default();
    }

    pub fn jump_to_start(&mut self) {
        self.cursor.follow = false;
        self.cursor.offset = self.max_offset();
    }

    /// Freeze the visible content. The buffer keeps ingesting underneath.
    pub fn pause(&mut self, buffer: &BoundedBuffer) {
        if self.frozen.is_some() {
            return;
        }
        let full = buffer.read_since(None);
        let catch_up = slice_since(&full, self.cache.mark);
        self.apply(&catch_up);
        self.frozen = Some(full);
    }

    /// Continue from where the frozen read left off
    pub fn resume(&mut self, buffer: &BoundedBuffer) {
        if self.frozen.take().is_some() {
            self.sync(buffer);
        }
    }

    pub fn toggle_pause(&mut self, buffer: &BoundedBuffer) {
        if self.is_paused() {
            self.resume(buffer);
        } else {
            self.pause(buffer);
        }
    }

    /// Drop cached content after the buffer was cleared
    pub fn reset(&mut self, buffer: &BoundedBuffer) {
        self.cache = FilterCache::default();
        self.jump_to_end();
        if self.frozen.is_some() {
            self.frozen = Some(buffer.read_since(None));
        }
        self.sync(buffer);
    }

    fn apply(&mut self, delta: &BufferDelta) -> bool {
        if delta.full {
            self.rebuild(delta);
            return true;
        }

        let mut changed = false;
        while let Some((seq, _)) = self.cache.entries.front() {
            if *seq >= delta.first_seq {
                break;
            }
            self.cache.entries.pop_front();
            changed = true;
        }

        let mut added = 0;
        for (i, rec) in delta.records.iter().enumerate() {
            if self.filter.matches(rec) {
                self.cache
                    .entries
                    .push_back((delta.start_seq + i as u64, rec.clone()));
                added += 1;
            }
        }
        self.cache.mark = Some(delta.watermark);

        if !self.cursor.follow {
            self.cursor.offset += added;
        }
        self.clamp();

        changed || added > 0
    }

    fn rebuild(&mut self, delta: &BufferDelta) {
        self.cache.entries = delta
            .records
            .iter()
            .enumerate()
            .filter(|(_, rec)| self.filter.matches(rec))
            .map(|(i, rec)| (delta.start_seq + i as u64, rec.clone()))
            .collect();
        self.cache.mark = Some(delta.watermark);
        self.rebuilds += 1;
        self.clamp();
    }
}

/// The part of a full read that lies after `mark`, as an increment when the
/// epochs agree and as the full read otherwise.
fn slice_since(full: &BufferDelta, mark: Option<Watermark>) -> BufferDelta {
    match mark {
        Some(mark) if mark.epoch == full.watermark.epoch => {
            let start_seq = mark.seq.max(full.start_seq).min(full.watermark.seq);
            let skip = (start_seq - full.start_seq) as usize;
            BufferDelta {
                full: false,
                first_seq: full.first_seq,
                start_seq,
                records: full.records[skip..].to_vec(),
                watermark: full.watermark,
            }
        }
        _ => full.clone(),
    }
}
