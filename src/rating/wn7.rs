//! WN7 composite rating.
//!
//! Community-defined formula; the arithmetic is kept term for term so results
//! match published calculators.

/// Averages the rating is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingInputs {
    pub avg_tier: f64,
    pub avg_kills: f64,
    pub avg_dmg: f64,
    pub avg_spotted: f64,
    pub avg_decap: f64,
    /// Fraction of battles won, 0.0 to 1.0.
    pub win_rate: f64,
    pub battle_count: u32,
}

/// WN7 rating, or `None` for no battles or a non-positive tier.
pub fn composite_rating(inputs: &RatingInputs) -> Option<f64> {
    let t = inputs.avg_tier;
    if inputs.battle_count == 0 || !(t > 0.0) {
        return None;
    }
    let battles = f64::from(inputs.battle_count);

    let kills = (1240.0 - 1040.0 / t.min(6.0).powf(0.164)) * inputs.avg_kills;
    let damage = inputs.avg_dmg * 530.0 / (184.0 * (0.24 * t).exp() + 130.0);
    let spotting = inputs.avg_spotted * 125.0 * t.min(3.0) / 3.0;
    let defense = inputs.avg_decap.min(2.2) * 100.0;
    let winning = ((185.0 / (0.17 + ((inputs.win_rate * 100.0 - 35.0) * -0.134).exp())) - 500.0) * 0.45;
    let low_tier_penalty =
        ((5.0 - t.min(5.0)) * 125.0) / (1.0 + ((t - (battles / 220.0).powf(3.0 / t)) * 1.5).exp());

    Some(kills + damage + spotting + defense + winning - low_tier_penalty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> RatingInputs {
        RatingInputs {
            avg_tier: 6.0,
            avg_kills: 1.0,
            avg_dmg: 1000.0,
            avg_spotted: 3.0,
            avg_decap: 0.0,
            win_rate: 0.5,
            battle_count: 50,
        }
    }

    #[test]
    fn test_reference_vector() {
        let rating = composite_rating(&reference()).unwrap();
        assert!((rating - 1473.250572758421).abs() < 1e-6, "rating was {}", rating);
    }

    #[test]
    fn test_rejects_empty_input() {
        let mut inputs = reference();
        inputs.battle_count = 0;
        assert_eq!(composite_rating(&inputs), None);

        let mut inputs = reference();
        inputs.avg_tier = 0.0;
        assert_eq!(composite_rating(&inputs), None);

        inputs.avg_tier = f64::NAN;
        assert_eq!(composite_rating(&inputs), None);
    }

    #[test]
    fn test_decap_is_capped() {
        let mut capped = reference();
        capped.avg_decap = 2.2;
        let mut excess = reference();
        excess.avg_decap = 10.0;

        assert_eq!(composite_rating(&capped), composite_rating(&excess));
    }

    #[test]
    fn test_more_damage_rates_higher() {
        let mut better = reference();
        better.avg_dmg = 1500.0;

        assert!(composite_rating(&better).unwrap() > composite_rating(&reference()).unwrap());
    }

    #[test]
    fn test_low_tier_penalty() {
        let mut low = reference();
        low.avg_tier = 2.0;
        low.avg_dmg = 0.0;
        low.avg_kills = 0.0;
        low.avg_spotted = 0.0;

        let mut high = low;
        high.avg_tier = 5.0;

        // Tier 5 and above carry no penalty term.
        let high_rating = composite_rating(&high).unwrap();
        let winning = ((185.0 / (0.17 + (-15.0f64 * 0.134).exp())) - 500.0) * 0.45;
        assert!((high_rating - winning).abs() < 1e-9);
        assert!(composite_rating(&low).unwrap() < high_rating);
    }
}
