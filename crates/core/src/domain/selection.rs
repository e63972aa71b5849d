use crate::domain::snapshot::{ExpiryBucket, ExpirySlots, ScoreBreakdown, TradingMandate};

/// Validate the upstream `primary_recommendation` directive.
///
/// Anything outside the three legal bucket keys falls back deterministically
/// to the weekly bucket (the shortest-dated, most time-sensitive one). The
/// returned flag reports whether the fallback fired.
pub fn resolve_primary(raw: Option<&str>) -> (ExpiryBucket, bool) {
    match raw.and_then(ExpiryBucket::parse) {
        Some(bucket) => (bucket, false),
        None => (ExpiryBucket::Weekly, true),
    }
}

/// Recompute the primary recommendation from scores when no upstream
/// directive is trusted: highest composite among buckets that allow trading.
///
/// Buckets are visited shortest-dated first, so a composite tie resolves to
/// the earlier expiry. Returns `None` when no bucket allows trading; the
/// caller must render an explicit no-trade state rather than picking a
/// vetoed bucket.
pub fn select_from_scores(
    scores: &ExpirySlots<ScoreBreakdown>,
    mandates: &ExpirySlots<TradingMandate>,
) -> Option<ExpiryBucket> {
    let mut best: Option<(ExpiryBucket, f64)> = None;
    for (bucket, mandate) in mandates.iter() {
        if !mandate.is_trade_allowed {
            continue;
        }
        let composite = scores.get(bucket).composite;
        if best.map_or(true, |(_, c)| composite > c) {
            best = Some((bucket, composite));
        }
    }
    best.map(|(bucket, _)| bucket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::{Confidence, RegimeName};

    fn score(composite: f64) -> ScoreBreakdown {
        ScoreBreakdown {
            composite,
            confidence: Confidence::Medium,
            ..ScoreBreakdown::absent()
        }
    }

    fn mandate(allowed: bool) -> TradingMandate {
        TradingMandate {
            regime_name: RegimeName::ModerateShort,
            is_trade_allowed: allowed,
            ..TradingMandate::disabled("test")
        }
    }

    #[test]
    fn resolve_primary_accepts_legal_keys() {
        assert_eq!(
            resolve_primary(Some("monthly")),
            (ExpiryBucket::Monthly, false)
        );
        assert_eq!(
            resolve_primary(Some("next_weekly")),
            (ExpiryBucket::NextWeekly, false)
        );
    }

    #[test]
    fn resolve_primary_falls_back_to_weekly_on_illegal_value() {
        assert_eq!(
            resolve_primary(Some("quarterly")),
            (ExpiryBucket::Weekly, true)
        );
        assert_eq!(resolve_primary(None), (ExpiryBucket::Weekly, true));
        assert_eq!(resolve_primary(Some("")), (ExpiryBucket::Weekly, true));
    }

    #[test]
    fn select_prefers_highest_composite_among_allowed() {
        let scores = ExpirySlots {
            weekly: score(8.2),
            next_weekly: score(7.1),
            monthly: score(9.0),
        };
        let mandates = ExpirySlots {
            weekly: mandate(true),
            next_weekly: mandate(true),
            monthly: mandate(true),
        };
        assert_eq!(
            select_from_scores(&scores, &mandates),
            Some(ExpiryBucket::Monthly)
        );
    }

    #[test]
    fn select_skips_vetoed_buckets() {
        let scores = ExpirySlots {
            weekly: score(8.2),
            next_weekly: score(7.1),
            monthly: score(9.0),
        };
        let mandates = ExpirySlots {
            weekly: mandate(true),
            next_weekly: mandate(true),
            monthly: mandate(false),
        };
        assert_eq!(
            select_from_scores(&scores, &mandates),
            Some(ExpiryBucket::Weekly)
        );
    }

    #[test]
    fn select_returns_none_when_nothing_is_allowed() {
        let scores = ExpirySlots {
            weekly: score(8.2),
            next_weekly: score(7.1),
            monthly: score(9.0),
        };
        let mandates = ExpirySlots {
            weekly: mandate(false),
            next_weekly: mandate(false),
            monthly: mandate(false),
        };
        assert_eq!(select_from_scores(&scores, &mandates), None);
    }

    #[test]
    fn composite_tie_resolves_to_the_shorter_dated_bucket() {
        let scores = ExpirySlots {
            weekly: score(7.0),
            next_weekly: score(7.0),
            monthly: score(7.0),
        };
        let mandates = ExpirySlots {
            weekly: mandate(true),
            next_weekly: mandate(true),
            monthly: mandate(true),
        };
        assert_eq!(
            select_from_scores(&scores, &mandates),
            Some(ExpiryBucket::Weekly)
        );
    }
}
