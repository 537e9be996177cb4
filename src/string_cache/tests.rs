use std::cell::Cell;
use std::sync::Arc;

use crate::error::FontError;
use crate::surface::Surface;

use super::{MAX_ENTRIES, RenderedString, StringCache, StringKey, TRUNCATE_COUNT};

fn rendered(width: usize) -> RenderedString {
    RenderedString {
        surface: Arc::new(Surface::new(width, 4)),
        glyph_count: width,
    }
}

fn insert(cache: &mut StringCache, text: &str) {
    cache
        .get_or_render(text, None, || Ok(rendered(text.len())))
        .unwrap();
}

fn recency(cache: &StringCache) -> Vec<String> {
    cache.keys_by_recency().map(|k| k.text.clone()).collect()
}

// ---------------------------------------------------------------------------
// Hit / miss behavior
// ---------------------------------------------------------------------------

#[test]
fn second_request_is_served_without_rendering() {
    let mut cache = StringCache::new();
    let calls = Cell::new(0);
    let render = || {
        calls.set(calls.get() + 1);
        Ok(rendered(3))
    };

    let first = cache.get_or_render("abc", None, render).unwrap().clone();
    let second = cache.get_or_render("abc", None, render).unwrap().clone();

    assert_eq!(calls.get(), 1, "renderer runs only on the miss");
    assert_eq!(first, second);
    assert_eq!(cache.len(), 1);
}

#[test]
fn unconstrained_and_finite_widths_are_distinct_keys() {
    let mut cache = StringCache::new();
    cache.get_or_render("abc", None, || Ok(rendered(30))).unwrap();
    cache.get_or_render("abc", Some(30), || Ok(rendered(20))).unwrap();
    cache.get_or_render("abc", Some(-1), || Ok(rendered(10))).unwrap();

    assert_eq!(cache.len(), 3);
    assert_eq!(cache.peek("abc", None).unwrap().glyph_count, 30);
    assert_eq!(cache.peek("abc", Some(30)).unwrap().glyph_count, 20);
    assert_eq!(cache.peek("abc", Some(-1)).unwrap().glyph_count, 10);
}

#[test]
fn failed_render_is_not_cached() {
    let mut cache = StringCache::new();
    let err = cache
        .get_or_render("abc", None, || Err(FontError::MetricsUnavailable))
        .unwrap_err();
    assert_eq!(err, FontError::MetricsUnavailable);
    assert!(cache.is_empty());
    assert!(cache.peek("abc", None).is_none());

    // The next request renders again.
    assert!(cache.get_or_render("abc", None, || Ok(rendered(3))).is_ok());
    assert_eq!(cache.len(), 1);
}

// ---------------------------------------------------------------------------
// Recency list
// ---------------------------------------------------------------------------

#[test]
fn inserts_append_at_tail() {
    let mut cache = StringCache::new();
    for text in ["a", "b", "c"] {
        insert(&mut cache, text);
    }
    assert_eq!(recency(&cache), ["a", "b", "c"]);
}

#[test]
fn hit_moves_entry_to_tail() {
    let mut cache = StringCache::new();
    for text in ["a", "b", "c"] {
        insert(&mut cache, text);
    }

    // Hit on the head.
    insert(&mut cache, "a");
    assert_eq!(recency(&cache), ["b", "c", "a"]);

    // Hit in the middle.
    insert(&mut cache, "c");
    assert_eq!(recency(&cache), ["b", "a", "c"]);

    // Hit on the tail is a no-op.
    insert(&mut cache, "c");
    assert_eq!(recency(&cache), ["b", "a", "c"]);
}

#[test]
fn peek_does_not_promote() {
    let mut cache = StringCache::new();
    for text in ["a", "b"] {
        insert(&mut cache, text);
    }
    assert!(cache.peek("a", None).is_some());
    assert_eq!(recency(&cache), ["a", "b"]);
}

// ---------------------------------------------------------------------------
// Eviction
// ---------------------------------------------------------------------------

#[test]
fn overflow_insert_evicts_one_batch_of_oldest() {
    let mut cache = StringCache::new();
    for i in 0..MAX_ENTRIES {
        insert(&mut cache, &format!("s{i}"));
    }
    assert_eq!(cache.len(), MAX_ENTRIES);
    assert_eq!(cache.evictions(), 0);

    insert(&mut cache, "overflow");

    assert_eq!(cache.evictions(), 1, "exactly one batch");
    assert_eq!(cache.len(), MAX_ENTRIES - TRUNCATE_COUNT + 1);
    for i in 0..TRUNCATE_COUNT {
        assert!(cache.peek(&format!("s{i}"), None).is_none(), "s{i} should be evicted");
    }
    for i in TRUNCATE_COUNT..MAX_ENTRIES {
        assert!(cache.peek(&format!("s{i}"), None).is_some(), "s{i} should survive");
    }
    assert!(cache.peek("overflow", None).is_some());
}

#[test]
fn promoted_entry_survives_next_batch() {
    let mut cache = StringCache::with_limits(10, 4);
    for i in 0..10 {
        insert(&mut cache, &format!("s{i}"));
    }

    // s0 would be first out; touching it protects it. The hit itself sees a
    // full cache and evicts s1..s4.
    insert(&mut cache, "s0");

    assert_eq!(cache.evictions(), 1);
    assert!(cache.peek("s0", None).is_some());
    for i in 1..5 {
        assert!(cache.peek(&format!("s{i}"), None).is_none());
    }
    assert_eq!(recency(&cache), ["s5", "s6", "s7", "s8", "s9", "s0"]);
}

#[test]
fn promotion_below_threshold_protects_from_insert_eviction() {
    let mut cache = StringCache::with_limits(6, 3);
    for text in ["a", "b", "c", "d", "e"] {
        insert(&mut cache, text);
    }
    insert(&mut cache, "a");
    assert_eq!(cache.evictions(), 0);
    insert(&mut cache, "f");
    assert_eq!(cache.evictions(), 0);

    // Full: this insert drops b, c, d.
    insert(&mut cache, "g");
    assert_eq!(cache.evictions(), 1);
    assert_eq!(recency(&cache), ["e", "a", "f", "g"]);
}

#[test]
fn evicted_slots_are_reused() {
    let mut cache = StringCache::with_limits(4, 2);
    for text in ["a", "b", "c", "d", "e", "f"] {
        insert(&mut cache, text);
    }
    assert_eq!(recency(&cache), ["c", "d", "e", "f"]);
    assert_eq!(cache.slots.len(), 4, "freed slots are recycled");
}

#[test]
fn batch_never_evicts_the_entry_being_returned() {
    let mut cache = StringCache::with_limits(3, 3);
    for text in ["a", "b", "c"] {
        insert(&mut cache, text);
    }
    let hit = cache.get_or_render("a", None, || Ok(rendered(99))).unwrap();
    assert_eq!(hit.glyph_count, 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(
        cache.keys_by_recency().next(),
        Some(&StringKey::new("a", None))
    );
}

#[test]
fn footprint_counts_surfaces() {
    let mut cache = StringCache::new();
    assert_eq!(cache.footprint(), 0);
    cache.get_or_render("ab", None, || Ok(rendered(10))).unwrap();
    assert!(cache.footprint() >= 40);
}
