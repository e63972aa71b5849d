/// Tolerance for the sum-to-one weight invariant.
pub const WEIGHT_EPSILON: f64 = 0.001;

/// Composite thresholds shared by every consumer of the status ladder.
pub const STRONG_THRESHOLD: f64 = 7.0;
pub const CAUTION_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub vol: f64,
    pub structure: f64,
    pub edge: f64,
}

impl Weights {
    /// Re-normalize an arbitrary weight triple so it sums to 1.0.
    ///
    /// Non-finite or negative inputs count as zero; an all-zero triple falls
    /// back to equal thirds. Never rejects.
    pub fn normalized(vol: f64, structure: f64, edge: f64) -> Self {
        let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let (v, s, e) = (clean(vol), clean(structure), clean(edge));
        let sum = v + s + e;

        if sum < WEIGHT_EPSILON {
            let third = 1.0 / 3.0;
            return Self {
                vol: third,
                structure: third,
                edge: third,
            };
        }

        if (sum - 1.0).abs() < WEIGHT_EPSILON {
            return Self {
                vol: v,
                structure: s,
                edge: e,
            };
        }

        Self {
            vol: v / sum,
            structure: s / sum,
            edge: e / sum,
        }
    }

    pub fn sum(&self) -> f64 {
        self.vol + self.structure + self.edge
    }
}

fn clamp_score(s: f64) -> f64 {
    if s.is_finite() {
        s.clamp(0.0, 10.0)
    } else {
        0.0
    }
}

/// Blend the three sub-scores into the 0-10 composite.
///
/// Weights are defensively re-normalized before blending, and the result is
/// clamped, so the output is in [0, 10] for any input.
pub fn compose(vol_score: f64, struct_score: f64, edge_score: f64, weights: Weights) -> f64 {
    let w = Weights::normalized(weights.vol, weights.structure, weights.edge);
    let blended = clamp_score(vol_score) * w.vol
        + clamp_score(struct_score) * w.structure
        + clamp_score(edge_score) * w.edge;
    blended.clamp(0.0, 10.0)
}

/// Render-facing verdict per expiry card. The threshold ladder (7 and 5,
/// inclusive on the upper side) is a stable contract; a veto always wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MandateStatus {
    Blocked,
    Strong,
    Caution,
    Weak,
}

impl MandateStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Blocked => "🚫",
            Self::Strong => "✅",
            Self::Caution => "⚠️",
            Self::Weak => "🔻",
        }
    }
}

pub fn status(is_trade_allowed: bool, composite: f64) -> MandateStatus {
    if !is_trade_allowed {
        return MandateStatus::Blocked;
    }
    if composite >= STRONG_THRESHOLD {
        MandateStatus::Strong
    } else if composite >= CAUTION_THRESHOLD {
        MandateStatus::Caution
    } else {
        MandateStatus::Weak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_pass_through_when_already_normalized() {
        let w = Weights::normalized(0.35, 0.30, 0.35);
        assert_eq!(w.vol, 0.35);
        assert_eq!(w.structure, 0.30);
        assert_eq!(w.edge, 0.35);
    }

    #[test]
    fn weights_renormalize_arbitrary_triples() {
        let w = Weights::normalized(2.0, 1.0, 1.0);
        assert!((w.sum() - 1.0).abs() < WEIGHT_EPSILON);
        assert!((w.vol - 0.5).abs() < 1e-9);
    }

    #[test]
    fn all_zero_weights_fall_back_to_equal_thirds() {
        let w = Weights::normalized(0.0, 0.0, 0.0);
        assert!((w.vol - 1.0 / 3.0).abs() < 1e-9);
        assert!((w.sum() - 1.0).abs() < WEIGHT_EPSILON);
    }

    #[test]
    fn non_finite_weights_are_treated_as_zero() {
        let w = Weights::normalized(f64::NAN, f64::INFINITY, 0.4);
        assert!((w.edge - 1.0).abs() < 1e-9);
        assert_eq!(w.vol, 0.0);
        assert_eq!(w.structure, 0.0);
    }

    #[test]
    fn compose_is_bounded_for_valid_sub_scores() {
        let w = Weights::normalized(0.35, 0.30, 0.35);
        for &(v, s, e) in &[(0.0, 0.0, 0.0), (10.0, 10.0, 10.0), (7.5, 6.8, 9.2)] {
            let c = compose(v, s, e, w);
            assert!((0.0..=10.0).contains(&c), "composite {c} out of range");
        }
    }

    #[test]
    fn compose_clamps_garbage_sub_scores() {
        let w = Weights::normalized(0.35, 0.30, 0.35);
        let c = compose(f64::NAN, 42.0, -3.0, w);
        assert!((0.0..=10.0).contains(&c));
        assert!(c.is_finite());
    }

    #[test]
    fn compose_matches_weighted_blend() {
        let w = Weights::normalized(0.35, 0.30, 0.35);
        let c = compose(7.5, 6.8, 9.2, w);
        let expected = 7.5 * 0.35 + 6.8 * 0.30 + 9.2 * 0.35;
        assert!((c - expected).abs() < 1e-9);
    }

    #[test]
    fn status_ladder_boundaries_are_inclusive_on_the_upper_side() {
        assert_eq!(status(true, 7.0), MandateStatus::Strong);
        assert_eq!(status(true, 6.999), MandateStatus::Caution);
        assert_eq!(status(true, 5.0), MandateStatus::Caution);
        assert_eq!(status(true, 4.999), MandateStatus::Weak);
    }

    #[test]
    fn veto_blocks_regardless_of_composite() {
        assert_eq!(status(false, 10.0), MandateStatus::Blocked);
        assert_eq!(status(false, 0.0), MandateStatus::Blocked);
    }
}
