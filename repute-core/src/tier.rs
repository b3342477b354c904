//! Score tiers
//!
//! Lower bounds are inclusive: a score of exactly 450 is `Established`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse, human-facing bucket derived from the final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Unproven,
    Developing,
    Established,
    Trusted,
    Elite,
}

/// Inclusive lower bound of each tier, ascending
pub static TIER_THRESHOLDS: &[(Tier, u16)] = &[
    (Tier::Unproven, 0),
    (Tier::Developing, 200),
    (Tier::Established, 450),
    (Tier::Trusted, 700),
    (Tier::Elite, 900),
];

impl Tier {
    /// Map a score on the canonical scale to its tier
    pub fn from_score(score: u16) -> Tier {
        TIER_THRESHOLDS
            .iter()
            .rev()
            .find(|(_, lower)| score >= *lower)
            .map(|(tier, _)| *tier)
            .unwrap_or(Tier::Unproven)
    }

    /// Inclusive lower bound of this tier
    pub fn lower_bound(&self) -> u16 {
        TIER_THRESHOLDS
            .iter()
            .find(|(tier, _)| tier == self)
            .map(|(_, lower)| *lower)
            .unwrap_or(0)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tier::Unproven => "unproven",
            Tier::Developing => "developing",
            Tier::Established => "established",
            Tier::Trusted => "trusted",
            Tier::Elite => "elite",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_are_lower_inclusive() {
        assert_eq!(Tier::from_score(200), Tier::Developing);
        assert_eq!(Tier::from_score(450), Tier::Established);
        assert_eq!(Tier::from_score(700), Tier::Trusted);
        assert_eq!(Tier::from_score(900), Tier::Elite);

        assert_eq!(Tier::from_score(199), Tier::Unproven);
        assert_eq!(Tier::from_score(449), Tier::Developing);
        assert_eq!(Tier::from_score(699), Tier::Established);
        assert_eq!(Tier::from_score(899), Tier::Trusted);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(Tier::from_score(0), Tier::Unproven);
        assert_eq!(Tier::from_score(1000), Tier::Elite);
    }

    #[test]
    fn test_lower_bound_roundtrips() {
        for (tier, lower) in TIER_THRESHOLDS {
            assert_eq!(tier.lower_bound(), *lower);
            assert_eq!(Tier::from_score(*lower), *tier);
        }
    }
}
