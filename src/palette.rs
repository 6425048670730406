//! Palette cycle - fixed list of colour triples indexed by a counter

use serde::Serialize;
use std::sync::Arc;

/// Three hex colours applied to series in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Palette(pub [String; 3]);

impl Palette {
    pub fn colors(&self) -> &[String] {
        &self.0
    }

    /// Colour for the n-th series, wrapping past the last one
    pub fn color(&self, n: usize) -> &str {
        &self.0[n % self.0.len()]
    }
}

impl From<[String; 3]> for Palette {
    fn from(colors: [String; 3]) -> Self {
        Palette(colors)
    }
}

/// Ordered palettes plus a selection counter.
///
/// Request handlers never keep a cycle between requests: they build one
/// with [`PaletteCycle::at`] from the click count the browser sends, so the
/// selected palette is a pure function of that count.
#[derive(Debug, Clone)]
pub struct PaletteCycle {
    palettes: Arc<[Palette]>,
    counter: u64,
}

impl PaletteCycle {
    /// Start at the first palette. `palettes` must be non-empty (checked at config load).
    pub fn new(palettes: Arc<[Palette]>) -> Self {
        Self::at(palettes, 0)
    }

    /// A cycle already advanced `clicks` times
    pub fn at(palettes: Arc<[Palette]>, clicks: u64) -> Self {
        debug_assert!(!palettes.is_empty());
        Self {
            palettes,
            counter: clicks,
        }
    }

    /// Position of the current palette in the list
    pub fn index(&self) -> usize {
        (self.counter % self.palettes.len() as u64) as usize
    }

    pub fn current(&self) -> &Palette {
        &self.palettes[self.index()]
    }

    pub fn advance(&mut self) {
        self.counter = self.counter.wrapping_add(1);
    }

    pub fn len(&self) -> usize {
        self.palettes.len()
    }
}
