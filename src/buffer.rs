//! Offline sample buffer
//!
//! Fixed-capacity circular queue of serialized samples, the core of the
//! offline resilience path. An index pair plus an occupancy count over a
//! preallocated slot array; enqueue is O(1) and never fails — when the
//! ring is full the oldest entry is overwritten, so the buffer always
//! holds the N most recent samples.
//!
//! Invariants:
//! - `0 <= count <= capacity`
//! - `write_index` and `read_index` are positions modulo capacity; `count`
//!   tracks occupancy independent of index arithmetic
//! - drain removes entries strictly oldest-first, and only on confirmed
//!   publish success

use log::debug;

pub struct OfflineBuffer {
    slots: Vec<Option<String>>,
    write_index: usize,
    read_index: usize,
    count: usize,
}

impl OfflineBuffer {
    /// Allocate the slot array once; it is never resized
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            write_index: 0,
            read_index: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append an entry, overwriting the oldest when full. Never fails.
    pub fn enqueue(&mut self, entry: String) {
        let capacity = self.capacity();
        if self.count == capacity {
            // slot at write_index holds the oldest entry; read_index
            // advances in lockstep so order is preserved
            debug!("buffer full ({capacity}), overwriting oldest sample");
            self.read_index = (self.read_index + 1) % capacity;
        } else {
            self.count += 1;
        }
        self.slots[self.write_index] = Some(entry);
        self.write_index = (self.write_index + 1) % capacity;
    }

    /// Publish entries oldest-first through `publish`, stopping on the
    /// first failure or when empty. An entry is removed only after
    /// `publish` confirms success. Returns the number published.
    pub fn drain_while<F>(&mut self, mut publish: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let mut published = 0;
        while self.count > 0 {
            let Some(entry) = self.slots[self.read_index].as_deref() else {
                break;
            };
            if !publish(entry) {
                debug!("drain aborted with {} entries remaining", self.count);
                break;
            }
            self.slots[self.read_index] = None;
            self.read_index = (self.read_index + 1) % self.capacity();
            self.count -= 1;
            published += 1;
        }

        if self.count == 0 {
            // cosmetic given the modulo arithmetic, but keeps indices readable
            self.write_index = 0;
            self.read_index = 0;
        }
        published
    }

    /// Non-destructive view, oldest to newest
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &str> {
        (0..self.count).filter_map(move |offset| {
            let index = (self.read_index + offset) % self.capacity();
            self.slots[index].as_deref()
        })
    }
}
