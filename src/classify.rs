use crate::models::{Classification, Tier};

/// Buckets a student's score against one program threshold. Both inputs
/// must already be on the 0–20 scale; no scale detection happens here.
pub fn classify(student_score_20: f64, required_grade_20: f64) -> Classification {
    let margin = student_score_20 - required_grade_20;
    let tier = if margin >= 1.0 {
        Tier::Safe
    } else if margin >= -1.0 {
        Tier::Target
    } else {
        Tier::Reach
    };
    Classification { tier, margin }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margin_of_exactly_one_is_safe() {
        assert_eq!(classify(21.0, 20.0).tier, Tier::Safe);
    }

    #[test]
    fn margin_of_exactly_minus_one_is_target() {
        assert_eq!(classify(19.0, 20.0).tier, Tier::Target);
    }

    #[test]
    fn just_below_minus_one_is_reach() {
        assert_eq!(classify(18.99, 20.0).tier, Tier::Reach);
    }

    #[test]
    fn half_point_below_threshold_is_target() {
        let result = classify(18.5, 19.0);
        assert_eq!(result.tier, Tier::Target);
        assert!((result.margin + 0.5).abs() < 1e-12);
    }

    #[test]
    fn comfortable_lead_is_safe() {
        let result = classify(18.0, 15.2);
        assert_eq!(result.tier, Tier::Safe);
        assert!((result.margin - 2.8).abs() < 1e-12);
    }

    #[test]
    fn defined_for_extreme_margins() {
        assert_eq!(classify(0.0, 20.0).tier, Tier::Reach);
        assert_eq!(classify(20.0, 0.0).tier, Tier::Safe);
    }
}
