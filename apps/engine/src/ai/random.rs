//! Random legal picks, seedable for reproducible tests.

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::ai::trait_def::{AgentError, DraftAgent, RoundInfo};
use crate::domain::cards::{Card, Pack};

pub struct RandomAgent {
    rng: ChaCha8Rng,
}

impl RandomAgent {
    pub const NAME: &'static str = "random";
    pub const VERSION: &'static str = "1.0.0";

    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        Self { rng }
    }

    fn any_index(&mut self, pack: &Pack) -> Result<usize, AgentError> {
        if pack.is_empty() {
            return Err(AgentError::InvalidDecision("empty pack".into()));
        }
        Ok(self.rng.random_range(0..pack.len()))
    }
}

#[async_trait]
impl DraftAgent for RandomAgent {
    async fn pick(&mut self, pack: &Pack, _round: &RoundInfo) -> Result<usize, AgentError> {
        self.any_index(pack)
    }

    async fn burn(&mut self, pack: &Pack, _round: &RoundInfo) -> Result<usize, AgentError> {
        self.any_index(pack)
    }

    async fn scores(&mut self, pack: &Pack, _round: &RoundInfo) -> Result<Vec<f32>, AgentError> {
        Ok(vec![0.0; pack.len()])
    }

    fn add_picked(&mut self, _card: &Card) {}

    fn name(&self) -> &'static str {
        Self::NAME
    }
}
