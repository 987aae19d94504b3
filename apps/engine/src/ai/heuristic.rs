//! Deterministic local pick heuristic.
//!
//! This is the fallback the whole table degrades to when the scoring oracle
//! is unreachable, so it must be strictly deterministic: same pool, same
//! pack, same decision. No RNG anywhere.
//!
//! Scoring:
//! - Start from the card's external rating.
//! - Add an affinity bonus per color the card shares with the two colors the
//!   seat has committed to most, scaled by how committed the pool already is.
//! - Ties break toward the lowest pack index.
//!
//! Burns are the mirror image: the lowest-scoring card goes first.

use async_trait::async_trait;

use crate::ai::trait_def::{AgentError, DraftAgent, RoundInfo};
use crate::domain::cards::{Card, Color, Pack};

/// Bonus per matching committed color, at full commitment.
const COLOR_AFFINITY_BONUS: f32 = 0.9;
/// Picks before the pool is considered fully committed.
const COMMITMENT_HORIZON: f32 = 12.0;

#[derive(Debug, Clone, Default)]
pub struct HeuristicAgent {
    color_counts: [u32; 5],
    picks_recorded: u32,
}

impl HeuristicAgent {
    pub const NAME: &'static str = "heuristic";
    pub const VERSION: &'static str = "1.0.0";

    pub fn new() -> Self {
        Self::default()
    }

    fn color_index(color: Color) -> usize {
        match color {
            Color::White => 0,
            Color::Blue => 1,
            Color::Black => 2,
            Color::Red => 3,
            Color::Green => 4,
        }
    }

    /// The two colors the pool leans into, by pick count. Stable order:
    /// count descending, then color index ascending.
    fn committed_colors(&self) -> [Option<Color>; 2] {
        let mut ranked: Vec<(u32, usize)> = self
            .color_counts
            .iter()
            .copied()
            .enumerate()
            .map(|(idx, count)| (count, idx))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let pick = |slot: usize| {
            let (count, idx) = ranked[slot];
            (count > 0).then(|| Color::ALL[idx])
        };
        [pick(0), pick(1)]
    }

    /// How strongly the affinity bonus applies, ramping up over the first
    /// picks so early ratings dominate an empty pool.
    fn commitment(&self) -> f32 {
        (self.picks_recorded as f32 / COMMITMENT_HORIZON).min(1.0)
    }

    fn score(&self, card: &Card) -> f32 {
        let committed = self.committed_colors();
        let affinity = card
            .colors
            .iter()
            .filter(|c| committed.iter().flatten().any(|cc| cc == *c))
            .count() as f32;
        card.rating + affinity * COLOR_AFFINITY_BONUS * self.commitment()
    }

    pub fn score_pack(&self, pack: &Pack) -> Vec<f32> {
        pack.cards.iter().map(|c| self.score(c)).collect()
    }

    fn best_index(&self, pack: &Pack) -> Result<usize, AgentError> {
        if pack.is_empty() {
            return Err(AgentError::InvalidDecision("empty pack".into()));
        }
        let scores = self.score_pack(pack);
        let mut best = 0;
        for (idx, score) in scores.iter().enumerate().skip(1) {
            if *score > scores[best] {
                best = idx;
            }
        }
        Ok(best)
    }

    fn worst_index(&self, pack: &Pack) -> Result<usize, AgentError> {
        if pack.is_empty() {
            return Err(AgentError::InvalidDecision("empty pack".into()));
        }
        let scores = self.score_pack(pack);
        let mut worst = 0;
        for (idx, score) in scores.iter().enumerate().skip(1) {
            if *score < scores[worst] {
                worst = idx;
            }
        }
        Ok(worst)
    }
}

#[async_trait]
impl DraftAgent for HeuristicAgent {
    async fn pick(&mut self, pack: &Pack, _round: &RoundInfo) -> Result<usize, AgentError> {
        self.best_index(pack)
    }

    async fn burn(&mut self, pack: &Pack, _round: &RoundInfo) -> Result<usize, AgentError> {
        self.worst_index(pack)
    }

    async fn scores(&mut self, pack: &Pack, _round: &RoundInfo) -> Result<Vec<f32>, AgentError> {
        Ok(self.score_pack(pack))
    }

    fn add_picked(&mut self, card: &Card) {
        for color in &card.colors {
            self.color_counts[Self::color_index(*color)] += 1;
        }
        self.picks_recorded += 1;
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rated(id: &str, rating: f32, colors: Vec<Color>) -> Card {
        Card::plain(id, id, rating).with_colors(colors)
    }

    fn round() -> RoundInfo {
        RoundInfo {
            round_number: 0,
            rounds_total: 3,
            pick_number: 0,
            cards_per_pack: 15,
        }
    }

    #[tokio::test]
    async fn picks_highest_rating_from_empty_pool() {
        let mut agent = HeuristicAgent::new();
        let pack = Pack::new(vec![
            rated("a", 1.0, vec![Color::Red]),
            rated("b", 4.0, vec![Color::Blue]),
            rated("c", 2.0, vec![]),
        ]);
        assert_eq!(agent.pick(&pack, &round()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn color_commitment_sways_close_ratings() {
        let mut agent = HeuristicAgent::new();
        for _ in 0..12 {
            agent.add_picked(&rated("g", 3.0, vec![Color::Green]));
        }
        let pack = Pack::new(vec![
            rated("offcolor", 3.2, vec![Color::Blue]),
            rated("oncolor", 3.0, vec![Color::Green]),
        ]);
        assert_eq!(agent.pick(&pack, &round()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn burns_lowest_score() {
        let mut agent = HeuristicAgent::new();
        let pack = Pack::new(vec![
            rated("a", 2.0, vec![]),
            rated("b", 0.5, vec![]),
            rated("c", 3.0, vec![]),
        ]);
        assert_eq!(agent.burn(&pack, &round()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn deterministic_across_instances() {
        let pack = Pack::new(vec![
            rated("a", 2.0, vec![Color::Red]),
            rated("b", 2.0, vec![Color::White]),
        ]);
        let mut first = HeuristicAgent::new();
        let mut second = HeuristicAgent::new();
        assert_eq!(
            first.pick(&pack, &round()).await.unwrap(),
            second.pick(&pack, &round()).await.unwrap()
        );
    }
}
