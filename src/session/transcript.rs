//! Transcript accumulation.
//!
//! Tracks the two display strings the screen renders: the committed
//! transcript, which only ever grows (or is explicitly cleared), and the
//! tentative transcript, which is replaced wholesale by each engine update
//! and forcibly emptied whenever recording stops.

use serde::{Deserialize, Serialize};

use crate::engine::EngineUpdate;

/// How committed text accumulates across engine updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccumulationStrategy {
    /// Append each committed increment to a growing transcript
    #[default]
    Append,
    /// Keep only the most recent committed increment
    Latest,
}

/// Owns the committed and tentative transcript strings.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    committed: String,
    tentative: String,
    strategy: AccumulationStrategy,
}

impl TranscriptAccumulator {
    pub fn new(strategy: AccumulationStrategy) -> Self {
        Self {
            committed: String::new(),
            tentative: String::new(),
            strategy,
        }
    }

    /// Text the engine has finalized.
    pub fn committed(&self) -> &str {
        &self.committed
    }

    /// The engine's current in-flight hypothesis.
    pub fn tentative(&self) -> &str {
        &self.tentative
    }

    /// Returns whether both strings are empty.
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty() && self.tentative.is_empty()
    }

    /// Committed and tentative text joined for export (clipboard).
    pub fn full_text(&self) -> String {
        let mut text = self.committed.trim_end().to_string();
        if !self.tentative.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&self.tentative);
        }
        text
    }

    /// Applies one engine update. Non-transcript updates are ignored.
    pub fn apply(&mut self, update: &EngineUpdate) {
        match update {
            EngineUpdate::Committed(increment) => self.apply_committed(increment),
            EngineUpdate::Tentative(text) => self.apply_tentative(text),
            _ => {}
        }
    }

    /// Handles a committed-text increment. Never rewrites earlier text under
    /// the append strategy.
    pub fn apply_committed(&mut self, increment: &str) {
        if increment.is_empty() {
            return;
        }
        match self.strategy {
            AccumulationStrategy::Append => self.committed.push_str(increment),
            AccumulationStrategy::Latest => {
                self.committed.clear();
                self.committed.push_str(increment);
            }
        }
    }

    /// Replaces the tentative text wholesale.
    pub fn apply_tentative(&mut self, text: &str) {
        self.tentative.clear();
        self.tentative.push_str(text);
    }

    /// Forced clear when recording stops: an in-flight hypothesis is
    /// meaningless once capture has ended, independent of any engine update.
    pub fn on_recording_stopped(&mut self) {
        self.tentative.clear();
    }

    /// Clears both strings. Purely local; touches no engine or recorder state.
    pub fn clear(&mut self) {
        self.committed.clear();
        self.tentative.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn committed_increments_append() {
        let mut acc = TranscriptAccumulator::new(AccumulationStrategy::Append);
        acc.apply_committed("Hello ");
        acc.apply_committed("world.");
        assert_eq!(acc.committed(), "Hello world.");
    }

    #[test]
    fn latest_strategy_replaces() {
        let mut acc = TranscriptAccumulator::new(AccumulationStrategy::Latest);
        acc.apply_committed("Hello ");
        acc.apply_committed("world.");
        assert_eq!(acc.committed(), "world.");
    }

    #[test]
    fn tentative_is_replaced_wholesale() {
        let mut acc = TranscriptAccumulator::new(AccumulationStrategy::Append);
        acc.apply_tentative("wor");
        acc.apply_tentative("world");
        assert_eq!(acc.tentative(), "world");
        acc.apply_tentative("");
        assert_eq!(acc.tentative(), "");
    }

    #[test]
    fn stop_clears_tentative_only() {
        let mut acc = TranscriptAccumulator::new(AccumulationStrategy::Append);
        acc.apply_committed("Hello ");
        acc.apply_tentative("wor");
        acc.on_recording_stopped();
        assert_eq!(acc.tentative(), "");
        assert_eq!(acc.committed(), "Hello ");
    }

    #[test]
    fn clear_empties_both() {
        let mut acc = TranscriptAccumulator::new(AccumulationStrategy::Append);
        acc.apply_committed("abc");
        acc.apply_tentative("d");
        acc.clear();
        assert!(acc.is_empty());
    }

    #[test]
    fn applies_engine_updates() {
        let mut acc = TranscriptAccumulator::new(AccumulationStrategy::Append);
        acc.apply(&EngineUpdate::Committed("Hello ".to_string()));
        acc.apply(&EngineUpdate::Tentative("there".to_string()));
        acc.apply(&EngineUpdate::Ready); // ignored
        assert_eq!(acc.committed(), "Hello ");
        assert_eq!(acc.tentative(), "there");
    }

    #[test]
    fn full_text_joins_sections() {
        let mut acc = TranscriptAccumulator::new(AccumulationStrategy::Append);
        acc.apply_committed("Hello world. ");
        acc.apply_tentative("How are");
        assert_eq!(acc.full_text(), "Hello world. How are");
    }
}
