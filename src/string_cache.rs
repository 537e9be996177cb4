//! Per-font LRU cache of composited strings.
//!
//! Entries live in a slot arena addressed by index. A hash map goes from
//! `(text, max_width)` to slot, and an index-linked list orders slots by
//! recency: head is least recently used, tail most recently used. When the
//! cache is full, the oldest `truncate_count` entries are dropped in one batch.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::FontError;
use crate::surface::Surface;

/// Live entry count at which a batch eviction runs.
pub const MAX_ENTRIES: usize = 400;

/// Number of least-recently-used entries dropped per eviction batch.
pub const TRUNCATE_COUNT: usize = 150;

/// Cache key. `max_width == None` is the unconstrained sentinel and never
/// equals any finite width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringKey {
    pub text: String,
    pub max_width: Option<i32>,
}

impl StringKey {
    pub fn new(text: &str, max_width: Option<i32>) -> Self {
        Self {
            text: text.to_owned(),
            max_width,
        }
    }
}

/// A composited string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedString {
    /// Coverage bitmap: width is the total advance, height the font's max height.
    ///
    /// Shared so a caller can draw it after the font's lock is released.
    pub surface: Arc<Surface>,
    /// Leading glyphs consumed, fewer than the text's length when clipped by width.
    pub glyph_count: usize,
}

#[derive(Debug)]
struct Node {
    key: StringKey,
    value: RenderedString,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Bounded LRU map from [`StringKey`] to [`RenderedString`].
#[derive(Debug)]
pub struct StringCache {
    index: HashMap<StringKey, usize>,
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    max_entries: usize,
    truncate_count: usize,
    /// Eviction batches run so far.
    evictions: u64,
}

impl Default for StringCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StringCache {
    /// Cache with the default limits ([`MAX_ENTRIES`], [`TRUNCATE_COUNT`]).
    pub fn new() -> Self {
        Self::with_limits(MAX_ENTRIES, TRUNCATE_COUNT)
    }

    /// Cache that evicts `truncate_count` entries once `max_entries` are live.
    pub fn with_limits(max_entries: usize, truncate_count: usize) -> Self {
        Self {
            index: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            max_entries: max_entries.max(1),
            truncate_count: truncate_count.max(1),
            evictions: 0,
        }
    }

    /// Cached rendering for `(text, max_width)`, produced by `render` on a miss.
    ///
    /// A hit becomes most recently used; if the cache is full at that point a
    /// batch eviction runs. A miss evicts before inserting when the cache is
    /// already full. A failing `render` leaves the cache untouched.
    pub fn get_or_render<F>(
        &mut self,
        text: &str,
        max_width: Option<i32>,
        render: F,
    ) -> Result<&RenderedString, FontError>
    where
        F: FnOnce() -> Result<RenderedString, FontError>,
    {
        let key = StringKey::new(text, max_width);

        if let Some(&slot) = self.index.get(&key) {
            if self.tail != Some(slot) {
                self.unlink(slot);
                self.push_back(slot);
                if self.index.len() >= self.max_entries {
                    self.evict_batch(Some(slot));
                }
            }
            return Ok(&self.node(slot).value);
        }

        let value = render()?;
        if self.index.len() >= self.max_entries {
            self.evict_batch(None);
        }
        let slot = self.alloc(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.push_back(slot);
        self.index.insert(key, slot);
        Ok(&self.node(slot).value)
    }

    /// Cached rendering without rendering, promotion, or eviction.
    pub fn peek(&self, text: &str, max_width: Option<i32>) -> Option<&RenderedString> {
        let slot = *self.index.get(&StringKey::new(text, max_width))?;
        Some(&self.node(slot).value)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Eviction batches run since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Keys from least to most recently used.
    pub fn keys_by_recency(&self) -> impl Iterator<Item = &StringKey> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.node(cursor?);
            cursor = node.next;
            Some(&node.key)
        })
    }

    /// Approximate memory held: surface bytes plus per-entry bookkeeping.
    pub fn footprint(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .map(|n| n.value.surface.byte_len() + n.key.text.len() + size_of::<Node>())
            .sum()
    }

    /// Drop up to `truncate_count` entries from the head, stopping at `keep`.
    fn evict_batch(&mut self, keep: Option<usize>) {
        let mut evicted = 0;
        while evicted < self.truncate_count {
            let Some(slot) = self.head else { break };
            if Some(slot) == keep {
                break;
            }
            self.unlink(slot);
            if let Some(node) = self.slots[slot].take() {
                self.index.remove(&node.key);
            }
            self.free.push(slot);
            evicted += 1;
        }
        self.evictions += 1;
        log::debug!(
            "string cache: evicted {evicted} entries, {} remain",
            self.index.len()
        );
    }

    fn alloc(&mut self, node: Node) -> usize {
        if let Some(slot) = self.free.pop() {
            self.slots[slot] = Some(node);
            slot
        } else {
            self.slots.push(Some(node));
            self.slots.len() - 1
        }
    }

    fn node(&self, slot: usize) -> &Node {
        self.slots[slot].as_ref().expect("linked slot is live")
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node {
        self.slots[slot].as_mut().expect("linked slot is live")
    }

    /// Detach `slot` from the recency list, fixing head/tail.
    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let node = self.node_mut(slot);
            (node.prev.take(), node.next.take())
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    /// Append a detached `slot` at the tail.
    fn push_back(&mut self, slot: usize) {
        let old_tail = self.tail;
        self.node_mut(slot).prev = old_tail;
        match old_tail {
            Some(t) => self.node_mut(t).next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }
}

#[cfg(test)]
mod tests;
