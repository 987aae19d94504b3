//! Network scoring oracle and the agent that consumes it.
//!
//! The oracle is best effort: any error or timeout degrades the decision to
//! the deterministic local heuristic. A failed oracle therefore never stalls
//! a cycle and never surfaces as an error, only as different pick behavior.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ai::heuristic::HeuristicAgent;
use crate::ai::trait_def::{AgentError, DraftAgent, RoundInfo};
use crate::config::OracleConfig;
use crate::domain::cards::{Card, CardId, Pack};

#[derive(Debug)]
pub enum OracleError {
    Timeout,
    Unreachable(String),
    BadResponse(String),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::Timeout => write!(f, "oracle timeout"),
            OracleError::Unreachable(msg) => write!(f, "oracle unreachable: {msg}"),
            OracleError::BadResponse(msg) => write!(f, "oracle bad response: {msg}"),
        }
    }
}

impl std::error::Error for OracleError {}

/// One oracle answer: the index it would pick plus per-card scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub chosen_index: usize,
    pub scores: Vec<f32>,
}

/// Opaque scoring service consumed over the network.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    async fn recommend(
        &self,
        history: &[CardId],
        pack: &Pack,
        round: &RoundInfo,
    ) -> Result<Recommendation, OracleError>;
}

#[derive(Serialize)]
struct RecommendRequest<'a> {
    history: &'a [CardId],
    pack: Vec<WireCard<'a>>,
    round_number: u8,
    rounds_total: u8,
    pick_number: usize,
    cards_per_pack: usize,
}

#[derive(Serialize)]
struct WireCard<'a> {
    id: &'a CardId,
    name: &'a str,
    rating: f32,
}

/// HTTP implementation of the scoring oracle.
pub struct HttpScoringOracle {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpScoringOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| OracleError::Unreachable(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ScoringOracle for HttpScoringOracle {
    async fn recommend(
        &self,
        history: &[CardId],
        pack: &Pack,
        round: &RoundInfo,
    ) -> Result<Recommendation, OracleError> {
        let request = RecommendRequest {
            history,
            pack: pack
                .cards
                .iter()
                .map(|c| WireCard {
                    id: &c.id,
                    name: &c.name,
                    rating: c.rating,
                })
                .collect(),
            round_number: round.round_number,
            rounds_total: round.rounds_total,
            pick_number: round.pick_number,
            cards_per_pack: round.cards_per_pack,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    OracleError::Timeout
                } else {
                    OracleError::Unreachable(err.to_string())
                }
            })?;
        let response = response
            .error_for_status()
            .map_err(|err| OracleError::Unreachable(err.to_string()))?;
        response
            .json::<Recommendation>()
            .await
            .map_err(|err| OracleError::BadResponse(err.to_string()))
    }
}

/// Agent backed by the scoring oracle, with the local heuristic as fallback.
///
/// The embedded heuristic sees every pick through `add_picked`, so a mid-
/// draft oracle outage hands over a warm pool, not an empty one.
pub struct OracleAgent {
    oracle: Arc<dyn ScoringOracle>,
    fallback: HeuristicAgent,
    history: Vec<CardId>,
}

impl OracleAgent {
    pub const NAME: &'static str = "oracle";

    pub fn new(oracle: Arc<dyn ScoringOracle>) -> Self {
        Self {
            oracle,
            fallback: HeuristicAgent::new(),
            history: Vec::new(),
        }
    }

    async fn recommendation(&mut self, pack: &Pack, round: &RoundInfo) -> Option<Recommendation> {
        match self.oracle.recommend(&self.history, pack, round).await {
            Ok(rec) if rec.chosen_index < pack.len() && rec.scores.len() == pack.len() => {
                Some(rec)
            }
            Ok(rec) => {
                warn!(
                    chosen_index = rec.chosen_index,
                    pack_len = pack.len(),
                    "oracle recommendation out of shape, falling back"
                );
                None
            }
            Err(err) => {
                warn!(error = %err, "oracle unavailable, falling back to local heuristic");
                None
            }
        }
    }
}

#[async_trait]
impl DraftAgent for OracleAgent {
    async fn pick(&mut self, pack: &Pack, round: &RoundInfo) -> Result<usize, AgentError> {
        match self.recommendation(pack, round).await {
            Some(rec) => Ok(rec.chosen_index),
            None => self.fallback.pick(pack, round).await,
        }
    }

    async fn burn(&mut self, pack: &Pack, round: &RoundInfo) -> Result<usize, AgentError> {
        match self.recommendation(pack, round).await {
            Some(rec) => {
                let mut worst = 0;
                for (idx, score) in rec.scores.iter().enumerate().skip(1) {
                    if *score < rec.scores[worst] {
                        worst = idx;
                    }
                }
                Ok(worst)
            }
            None => self.fallback.burn(pack, round).await,
        }
    }

    async fn scores(&mut self, pack: &Pack, round: &RoundInfo) -> Result<Vec<f32>, AgentError> {
        match self.recommendation(pack, round).await {
            Some(rec) => Ok(rec.scores),
            None => self.fallback.scores(pack, round).await,
        }
    }

    fn add_picked(&mut self, card: &Card) {
        self.history.push(card.id.clone());
        self.fallback.add_picked(card);
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cards::Color;

    struct DownOracle;

    #[async_trait]
    impl ScoringOracle for DownOracle {
        async fn recommend(
            &self,
            _history: &[CardId],
            _pack: &Pack,
            _round: &RoundInfo,
        ) -> Result<Recommendation, OracleError> {
            Err(OracleError::Unreachable("connection refused".into()))
        }
    }

    struct FixedOracle(usize);

    #[async_trait]
    impl ScoringOracle for FixedOracle {
        async fn recommend(
            &self,
            _history: &[CardId],
            pack: &Pack,
            _round: &RoundInfo,
        ) -> Result<Recommendation, OracleError> {
            Ok(Recommendation {
                chosen_index: self.0,
                scores: vec![1.0; pack.len()],
            })
        }
    }

    fn pack() -> Pack {
        Pack::new(vec![
            Card::plain("a", "a", 1.0).with_colors(vec![Color::Red]),
            Card::plain("b", "b", 4.0),
            Card::plain("c", "c", 2.0),
        ])
    }

    fn round() -> RoundInfo {
        RoundInfo {
            round_number: 0,
            rounds_total: 1,
            pick_number: 0,
            cards_per_pack: 3,
        }
    }

    #[tokio::test]
    async fn down_oracle_falls_back_to_heuristic() {
        let mut agent = OracleAgent::new(Arc::new(DownOracle));
        // Heuristic picks the highest rating.
        assert_eq!(agent.pick(&pack(), &round()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn healthy_oracle_decision_is_used() {
        let mut agent = OracleAgent::new(Arc::new(FixedOracle(2)));
        assert_eq!(agent.pick(&pack(), &round()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn out_of_bounds_recommendation_falls_back() {
        let mut agent = OracleAgent::new(Arc::new(FixedOracle(99)));
        assert_eq!(agent.pick(&pack(), &round()).await.unwrap(), 1);
    }
}
