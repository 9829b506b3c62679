//! Token economy and reward catalog.
//!
//! The economy is a bounded counter. Rewards are looked up against the
//! current count; claiming one never spends tokens.

use serde::{Deserialize, Serialize};

/// Default cap on tokens per session.
pub const DEFAULT_MAX_TOKENS: u32 = 10;

/// Activity meters run from 0 to 100 and award a token on every quarter.
pub const METER_QUARTER: f64 = 25.0;

/// True when `new` lies in a higher `divisor`-sized band than `old`.
///
/// A zero or non-finite divisor never crosses.
pub fn crossed_threshold(old: f64, new: f64, divisor: f64) -> bool {
    if !(divisor.is_finite() && divisor > 0.0) {
        return false;
    }
    (new / divisor).floor() > (old / divisor).floor()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEconomy {
    count: u32,
    max: u32,
}

impl TokenEconomy {
    pub fn new(max: u32) -> Self {
        Self { count: 0, max }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.max
    }

    /// Adds one token. Returns false, leaving the count alone, at the cap.
    pub fn add(&mut self) -> bool {
        if self.is_full() {
            return false;
        }
        self.count += 1;
        true
    }

    /// `min(100, count / cost * 100)`. A free reward is always at 100.
    pub fn progress_to_reward(&self, cost: u32) -> f64 {
        if cost == 0 {
            return 100.0;
        }
        (self.count as f64 / cost as f64 * 100.0).min(100.0)
    }

    /// 0.0 .. 100.0 fill of the token board.
    pub fn fill_percent(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        self.count as f64 / self.max as f64 * 100.0
    }

    /// Whether moving from `old` to `new` tokens crosses a quarter of `max`.
    pub fn crossed_quarter(&self, old: u32, new: u32) -> bool {
        crossed_threshold(old as f64, new as f64, self.max as f64 / 4.0)
    }
}

impl Default for TokenEconomy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub token_cost: u32,
}

impl Reward {
    fn new(id: &str, name: &str, description: &str, token_cost: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            token_cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardCatalog {
    rewards: Vec<Reward>,
}

impl RewardCatalog {
    pub fn new(rewards: Vec<Reward>) -> Self {
        Self { rewards }
    }

    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }

    pub fn get(&self, id: &str) -> Option<&Reward> {
        self.rewards.iter().find(|r| r.id == id)
    }

    /// Rewards affordable with `count` tokens, cheapest first.
    pub fn claimable(&self, count: u32) -> Vec<&Reward> {
        let mut affordable: Vec<&Reward> = self
            .rewards
            .iter()
            .filter(|r| r.token_cost <= count)
            .collect();
        affordable.sort_by_key(|r| r.token_cost);
        affordable
    }
}

impl Default for RewardCatalog {
    fn default() -> Self {
        Self::new(vec![
            Reward::new("reward-1", "Special Story", "Unlock a special story to read together", 5),
            Reward::new("reward-2", "Dance Party", "Have a 1-minute dance party with music", 3),
            Reward::new("reward-3", "Treasure", "Receive a small themed prize", 10),
            Reward::new("reward-4", "Drawing", "Create a special drawing together", 7),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_clamps_at_max() {
        let mut economy = TokenEconomy::new(10);
        let added = (0..12).filter(|_| economy.add()).count();
        assert_eq!(added, 10);
        assert_eq!(economy.count(), 10);
        assert!(economy.is_full());
    }

    #[test]
    fn zero_max_never_accepts() {
        let mut economy = TokenEconomy::new(0);
        assert!(!economy.add());
        assert_eq!(economy.fill_percent(), 0.0);
    }

    #[test]
    fn progress_to_reward_caps_at_100() {
        let mut economy = TokenEconomy::new(10);
        for _ in 0..4 {
            economy.add();
        }
        assert_eq!(economy.progress_to_reward(8), 50.0);
        assert_eq!(economy.progress_to_reward(3), 100.0);
        assert_eq!(economy.progress_to_reward(0), 100.0);
        assert_eq!(economy.fill_percent(), 40.0);
    }

    #[test]
    fn crossed_threshold_detects_band_changes() {
        assert!(crossed_threshold(20.0, 25.0, 25.0));
        assert!(crossed_threshold(0.0, 33.3, 25.0));
        assert!(!crossed_threshold(25.0, 49.9, 25.0));
        assert!(!crossed_threshold(50.0, 50.0, 25.0));
        assert!(crossed_threshold(10.0, 100.0, 25.0));
        assert!(!crossed_threshold(0.0, 100.0, 0.0));
        assert!(!crossed_threshold(0.0, 100.0, f64::NAN));
    }

    #[test]
    fn crossed_quarter_scales_with_max() {
        let economy = TokenEconomy::new(8);
        assert!(!economy.crossed_quarter(0, 1));
        assert!(economy.crossed_quarter(1, 2));
        assert!(economy.crossed_quarter(7, 8));
    }

    #[test]
    fn claimable_rewards_are_sorted_by_cost() {
        let catalog = RewardCatalog::default();
        let ids: Vec<_> = catalog.claimable(7).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["reward-2", "reward-1", "reward-4"]);
        assert!(catalog.claimable(2).is_empty());
        assert_eq!(catalog.get("reward-3").unwrap().token_cost, 10);
    }
}
