//! GPU resource caches keyed by CPU-side identity.
//!
//! Entries are stamped with the frame that last used them; anything not used
//! during the previous frame is evicted, which drops its wgpu resources.

use std::collections::HashMap;
use std::hash::Hash;

pub struct FrameCache<K, V> {
    entries: HashMap<K, (V, u64)>,
    frame: u64,
}

impl<K: Eq + Hash + Copy, V> FrameCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            frame: 0,
        }
    }

    /// Start a new frame, dropping entries the previous frame did not touch.
    /// Returns how many were evicted.
    pub fn begin_frame(&mut self) -> usize {
        let before = self.entries.len();
        let last = self.frame;
        self.entries.retain(|_, (_, used)| *used >= last);
        self.frame += 1;
        before - self.entries.len()
    }

    /// Mark `key` used this frame, creating the value if it is missing.
    pub fn touch_or_insert_with(&mut self, key: K, create: impl FnOnce() -> V) -> bool {
        let frame = self.frame;
        let mut created = false;
        self.entries
            .entry(key)
            .or_insert_with(|| {
                created = true;
                (create(), frame)
            })
            .1 = frame;
        created
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|(v, _)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash + Copy, V> Default for FrameCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_created_once() {
        let mut cache: FrameCache<u32, String> = FrameCache::new();
        cache.begin_frame();
        assert!(cache.touch_or_insert_with(1, || "one".into()));
        assert!(!cache.touch_or_insert_with(1, || unreachable!()));
        assert_eq!(cache.get(&1).map(String::as_str), Some("one"));
    }

    #[test]
    fn unused_entries_are_evicted_after_one_idle_frame() {
        let mut cache: FrameCache<u32, ()> = FrameCache::new();
        cache.begin_frame();
        cache.touch_or_insert_with(1, || ());
        cache.touch_or_insert_with(2, || ());

        // Frame 2 uses only key 1.
        assert_eq!(cache.begin_frame(), 0);
        cache.touch_or_insert_with(1, || ());

        // Key 2 sat out a whole frame.
        assert_eq!(cache.begin_frame(), 1);
        assert!(cache.get(&1).is_some());
        assert!(cache.get(&2).is_none());
    }
}
