//! Best heights for the current session
//!
//! Kept in memory only; a new host process starts with an empty board.

use serde::{Deserialize, Serialize};

/// Maximum number of runs to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Best height reached, in meters
    pub height: u32,
    /// 1-based run number within the session
    pub run: u32,
    /// Seed the run's world was generated from
    pub seed: u64,
}

/// Session leaderboard, best first
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run of `height` would make the board
    pub fn qualifies(&self, height: u32) -> bool {
        height > 0
            && (self.entries.len() < MAX_HIGH_SCORES
                || self.entries.last().is_some_and(|lowest| height > lowest.height))
    }

    /// Record a finished run, returning its 1-based rank if it placed
    ///
    /// Equal heights rank behind the runs that reached them first.
    pub fn add_run(&mut self, height: u32, run: u32, seed: u64) -> Option<usize> {
        if !self.qualifies(height) {
            return None;
        }

        let index = self.entries.partition_point(|e| e.height >= height);
        self.entries.insert(index, HighScoreEntry { height, run, seed });
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(index + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_height(&self) -> Option<u32> {
        self.entries.first().map(|e| e.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_height_never_qualifies() {
        let mut scores = HighScores::new();
        assert_eq!(scores.add_run(0, 1, 0), None);
        assert!(scores.is_empty());
    }

    #[test]
    fn test_ranks_descending() {
        let mut scores = HighScores::new();
        assert_eq!(scores.add_run(40, 1, 0), Some(1));
        assert_eq!(scores.add_run(90, 2, 0), Some(1));
        assert_eq!(scores.add_run(40, 3, 0), Some(3));
        assert_eq!(scores.top_height(), Some(90));
        assert_eq!(scores.entries[1].run, 1);
    }

    #[test]
    fn test_board_is_capped() {
        let mut scores = HighScores::new();
        for run in 1..=15 {
            scores.add_run(run * 10, run, 0);
        }
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        assert!(!scores.qualifies(50));
        assert!(scores.qualifies(200));
        assert_eq!(scores.entries.last().map(|e| e.height), Some(60));
    }
}
