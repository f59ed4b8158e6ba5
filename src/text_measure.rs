//! Memoized text measurement used to size nodes

use egui::Vec2;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct MeasureKey {
    text: u64,
    wrap_width: u32,
    font_size: u32,
}

#[derive(Default)]
pub struct TextMeasureCache {
    entries: HashMap<MeasureKey, Vec2>,
    pub hits: u64,
    pub misses: u64,
}

impl TextMeasureCache {
    /// Streaming produces a new string every frame, so the cache is flushed past this size
    pub const MAX_ENTRIES: usize = 2048;

    pub fn new() -> Self {
        Self::default()
    }

    /// Size of `text` wrapped at `wrap_width`. `layout` runs only on a miss.
    pub fn measure(
        &mut self,
        text: &str,
        wrap_width: f32,
        font_size: f32,
        layout: impl FnOnce(&str, f32, f32) -> Vec2,
    ) -> Vec2 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let key = MeasureKey {
            text: hasher.finish(),
            wrap_width: wrap_width.to_bits(),
            font_size: font_size.to_bits(),
        };

        if let Some(size) = self.entries.get(&key) {
            self.hits += 1;
            return *size;
        }

        self.misses += 1;
        if self.entries.len() >= Self::MAX_ENTRIES {
            self.entries.clear();
        }
        let size = layout(text, wrap_width, font_size);
        self.entries.insert(key, size);
        size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
