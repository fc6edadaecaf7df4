//! Small helpers shared by the protocol layers and the control surface.

pub mod enum_macros;

use std::collections::VecDeque;

/// Highest assignable object instance number
pub const MAX_INSTANCE: u32 = 0x3F_FFFE;

/// Instance number that addresses "this device" regardless of its id
pub const WILDCARD_INSTANCE: u32 = 0x3F_FFFF;

/// Validate object instance number (must be 0-4194302)
pub fn is_valid_instance_number(instance: u32) -> bool {
    instance <= MAX_INSTANCE
}

/// Format a frame for trace logging, e.g. `810b000c 0120ffff00ff1008`
///
/// The BVLC header is separated from the rest so captured traces are easier
/// to line up against a packet dissector.
pub fn frame_trace(data: &[u8]) -> String {
    if data.len() > 4 && data[0] == 0x81 {
        format!("{} {}", hex::encode(&data[..4]), hex::encode(&data[4..]))
    } else {
        hex::encode(data)
    }
}

/// Fixed capacity buffer that drops the oldest entry when full
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RingBuffer<T> {
    /// Create a new ring buffer with given capacity (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add an item, evicting the oldest one when at capacity
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// All items, newest first
    pub fn newest_first(&self) -> Vec<T> {
        self.items.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
