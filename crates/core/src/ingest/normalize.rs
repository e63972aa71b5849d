//! Safe-defaulting normalizer for the upstream dashboard document.
//!
//! Takes any JSON value and produces a fully-populated [`DashboardSnapshot`]:
//! missing or non-finite numbers become static neutral defaults, enum values
//! outside their declared set become the most conservative member, and a
//! wholesale-absent mandate or score becomes its canonical disabled
//! substitute. Every substitution is recorded as a degraded field path so
//! the poller can surface data quality without ever failing the render path.

use crate::domain::score::{compose, Weights};
use crate::domain::selection;
use crate::domain::snapshot::{
    Confidence, DashboardSnapshot, DirectionalBias, EdgeMetrics, ExpirySlots, ExternalMetrics,
    Impact, OptionChainRow, RegimeName, ScoreBreakdown, ScoreDriver, StructureMetrics,
    TermStructure, TimeContext, TradingMandate, VetoEvent, VolMetrics, VolRegime,
};
use crate::ingest::raw::{
    RawEdgeMetrics, RawExternalMetrics, RawOptionChainRow, RawScoreBreakdown, RawStructureMetrics,
    RawTimeContext, RawTradingMandate, RawVetoEvent, RawVolMetrics,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

const ABSENT_MANDATE_RATIONALE: &str = "No mandate supplied by the engine; standing down.";

#[derive(Debug, Clone)]
pub struct NormalizedDashboard {
    pub snapshot: DashboardSnapshot,
    /// Field paths where a conservative default was substituted.
    pub degraded: Vec<String>,
}

/// Normalize a raw upstream document into a renderable snapshot.
///
/// Pure and total: no I/O (wall-clock time is passed in), and any input,
/// including `{}`, `null`, or a non-object, yields a complete snapshot.
pub fn normalize(doc: &Value, now: DateTime<Utc>) -> NormalizedDashboard {
    let mut deg = Vec::new();

    let time_context = normalize_time(
        opt_section::<RawTimeContext>(doc, "time_context").unwrap_or_default(),
        now,
        &mut deg,
    );
    let vol_metrics = normalize_vol(
        opt_section::<RawVolMetrics>(doc, "vol_metrics").unwrap_or_default(),
        &mut deg,
    );

    let structure = ExpirySlots {
        weekly: normalize_structure(
            opt_section(doc, "struct_weekly").unwrap_or_default(),
            "struct_weekly",
            &mut deg,
        ),
        next_weekly: normalize_structure(
            opt_section(doc, "struct_next_weekly").unwrap_or_default(),
            "struct_next_weekly",
            &mut deg,
        ),
        monthly: normalize_structure(
            opt_section(doc, "struct_monthly").unwrap_or_default(),
            "struct_monthly",
            &mut deg,
        ),
    };

    let edge_metrics = normalize_edge(
        opt_section::<RawEdgeMetrics>(doc, "edge_metrics").unwrap_or_default(),
        &mut deg,
    );

    let scores = ExpirySlots {
        weekly: normalize_score(opt_section(doc, "weekly_score"), "weekly_score", &mut deg),
        next_weekly: normalize_score(
            opt_section(doc, "next_weekly_score"),
            "next_weekly_score",
            &mut deg,
        ),
        monthly: normalize_score(opt_section(doc, "monthly_score"), "monthly_score", &mut deg),
    };

    let mandates = ExpirySlots {
        weekly: normalize_mandate(
            opt_section(doc, "weekly_mandate"),
            "weekly_mandate",
            &mut deg,
        ),
        next_weekly: normalize_mandate(
            opt_section(doc, "next_weekly_mandate"),
            "next_weekly_mandate",
            &mut deg,
        ),
        monthly: normalize_mandate(
            opt_section(doc, "monthly_mandate"),
            "monthly_mandate",
            &mut deg,
        ),
    };

    let external_metrics = normalize_external(
        opt_section::<RawExternalMetrics>(doc, "external_metrics").unwrap_or_default(),
        &mut deg,
    );

    let primary_recommendation = match doc.get("primary_recommendation") {
        Some(v) => {
            let (bucket, fell_back) = selection::resolve_primary(v.as_str());
            if fell_back {
                deg.push("primary_recommendation".to_string());
            }
            Some(bucket)
        }
        None => {
            // No upstream directive at all: derive one from the scores and
            // mandates instead of guessing. None means no bucket allows
            // trading, which renders as an explicit no-trade state.
            deg.push("primary_recommendation (derived)".to_string());
            selection::select_from_scores(&scores, &mandates)
        }
    };

    NormalizedDashboard {
        snapshot: DashboardSnapshot {
            time_context,
            vol_metrics,
            structure,
            edge_metrics,
            scores,
            mandates,
            external_metrics,
            primary_recommendation,
        },
        degraded: deg,
    }
}

/// Normalize one option-chain response (expected: a JSON array of rows).
/// Rows without a usable strike are dropped; other missing fields default
/// to zero.
pub fn normalize_chain(doc: &Value) -> Vec<OptionChainRow> {
    let Value::Array(items) = doc else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|v| serde_json::from_value::<RawOptionChainRow>(v.clone()).ok())
        .filter_map(|raw| {
            let strike = raw.strike?;
            Some(OptionChainRow {
                strike,
                ce_iv: raw.ce_iv.unwrap_or(0.0),
                pe_iv: raw.pe_iv.unwrap_or(0.0),
                ce_oi: raw.ce_oi.unwrap_or(0.0),
                pe_oi: raw.pe_oi.unwrap_or(0.0),
                ce_ltp: raw.ce_ltp.unwrap_or(0.0),
                pe_ltp: raw.pe_ltp.unwrap_or(0.0),
            })
        })
        .collect()
}

/// Parse one top-level section in isolation, so a malformed sibling cannot
/// poison it. Returns `None` for a missing, null, or non-object section.
fn opt_section<T: DeserializeOwned>(doc: &Value, key: &str) -> Option<T> {
    match doc.get(key) {
        Some(v) if v.is_object() => serde_json::from_value(v.clone()).ok(),
        _ => None,
    }
}

fn num(v: Option<f64>, path: &str, deg: &mut Vec<String>) -> f64 {
    match v {
        Some(x) => x,
        None => {
            deg.push(path.to_string());
            0.0
        }
    }
}

fn score10(v: Option<f64>, path: &str, deg: &mut Vec<String>) -> f64 {
    match v {
        Some(x) if (0.0..=10.0).contains(&x) => x,
        Some(x) => {
            deg.push(format!("{path} (clamped)"));
            x.clamp(0.0, 10.0)
        }
        None => {
            deg.push(path.to_string());
            0.0
        }
    }
}

fn enum_or<T>(
    raw: Option<&str>,
    parse: fn(&str) -> Option<T>,
    fallback: T,
    path: &str,
    deg: &mut Vec<String>,
) -> T {
    match raw.and_then(parse) {
        Some(v) => v,
        None => {
            deg.push(path.to_string());
            fallback
        }
    }
}

fn date_or(raw: Option<&str>, fallback: NaiveDate, path: &str, deg: &mut Vec<String>) -> NaiveDate {
    match raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()) {
        Some(d) => d,
        None => {
            deg.push(path.to_string());
            fallback
        }
    }
}

fn dte(v: Option<f64>, path: &str, deg: &mut Vec<String>) -> i64 {
    num(v, path, deg).max(0.0) as i64
}

fn flag(v: Option<bool>, path: &str, deg: &mut Vec<String>) -> bool {
    match v {
        Some(b) => b,
        None => {
            deg.push(path.to_string());
            false
        }
    }
}

fn normalize_time(raw: RawTimeContext, now: DateTime<Utc>, deg: &mut Vec<String>) -> TimeContext {
    let today = now.date_naive();
    let current_time_ist = match raw.current_time_ist {
        Some(s) => s,
        None => {
            deg.push("time_context.current_time_ist".to_string());
            now.to_rfc3339()
        }
    };

    TimeContext {
        current_time_ist,
        weekly_exp: date_or(
            raw.weekly_exp.as_deref(),
            today,
            "time_context.weekly_exp",
            deg,
        ),
        monthly_exp: date_or(
            raw.monthly_exp.as_deref(),
            today,
            "time_context.monthly_exp",
            deg,
        ),
        next_weekly_exp: date_or(
            raw.next_weekly_exp.as_deref(),
            today,
            "time_context.next_weekly_exp",
            deg,
        ),
        dte_weekly: dte(raw.dte_weekly, "time_context.dte_weekly", deg),
        dte_monthly: dte(raw.dte_monthly, "time_context.dte_monthly", deg),
        dte_next_weekly: dte(raw.dte_next_weekly, "time_context.dte_next_weekly", deg),
        is_expiry_day_weekly: flag(
            raw.is_expiry_day_weekly,
            "time_context.is_expiry_day_weekly",
            deg,
        ),
        is_past_square_off_time: flag(
            raw.is_past_square_off_time,
            "time_context.is_past_square_off_time",
            deg,
        ),
    }
}

fn normalize_vol(raw: RawVolMetrics, deg: &mut Vec<String>) -> VolMetrics {
    VolMetrics {
        spot: num(raw.spot, "vol_metrics.spot", deg),
        vix: num(raw.vix, "vol_metrics.vix", deg),
        rv_7d: num(raw.rv_7d, "vol_metrics.rv_7d", deg),
        rv_28d: num(raw.rv_28d, "vol_metrics.rv_28d", deg),
        rv_90d: num(raw.rv_90d, "vol_metrics.rv_90d", deg),
        garch_vol: num(raw.garch_vol, "vol_metrics.garch_vol", deg),
        parkinson_vol: num(raw.parkinson_vol, "vol_metrics.parkinson_vol", deg),
        ivp_30d: num(raw.ivp_30d, "vol_metrics.ivp_30d", deg),
        ivp_90d: num(raw.ivp_90d, "vol_metrics.ivp_90d", deg),
        ivp_1yr: num(raw.ivp_1yr, "vol_metrics.ivp_1yr", deg),
        vov: num(raw.vov, "vol_metrics.vov", deg),
        vov_zscore: num(raw.vov_zscore, "vol_metrics.vov_zscore", deg),
        vol_regime: enum_or(
            raw.vol_regime.as_deref(),
            VolRegime::parse,
            VolRegime::Fair,
            "vol_metrics.vol_regime",
            deg,
        ),
    }
}

fn normalize_structure(
    raw: RawStructureMetrics,
    path: &str,
    deg: &mut Vec<String>,
) -> StructureMetrics {
    StructureMetrics {
        gex: num(raw.gex, &format!("{path}.gex"), deg),
        pcr: num(raw.pcr, &format!("{path}.pcr"), deg),
        max_pain: num(raw.max_pain, &format!("{path}.max_pain"), deg),
        skew_25d: num(raw.skew_25d, &format!("{path}.skew_25d"), deg),
        total_oi_calls: num(raw.total_oi_calls, &format!("{path}.total_oi_calls"), deg).max(0.0)
            as u64,
        total_oi_puts: num(raw.total_oi_puts, &format!("{path}.total_oi_puts"), deg).max(0.0)
            as u64,
    }
}

fn normalize_edge(raw: RawEdgeMetrics, deg: &mut Vec<String>) -> EdgeMetrics {
    EdgeMetrics {
        iv_atm: num(raw.iv_atm, "edge_metrics.iv_atm", deg),
        iv_spread_weekly_monthly: num(
            raw.iv_spread_weekly_monthly,
            "edge_metrics.iv_spread_weekly_monthly",
            deg,
        ),
        vrp_rv: num(raw.vrp_rv, "edge_metrics.vrp_rv", deg),
        vrp_garch: num(raw.vrp_garch, "edge_metrics.vrp_garch", deg),
        vrp_parkinson: num(raw.vrp_parkinson, "edge_metrics.vrp_parkinson", deg),
        term_structure: enum_or(
            raw.term_structure.as_deref(),
            TermStructure::parse,
            TermStructure::Flat,
            "edge_metrics.term_structure",
            deg,
        ),
    }
}

fn normalize_score(
    raw: Option<RawScoreBreakdown>,
    path: &str,
    deg: &mut Vec<String>,
) -> ScoreBreakdown {
    let Some(raw) = raw else {
        deg.push(format!("{path} (absent)"));
        return ScoreBreakdown::absent();
    };

    if raw.vol_weight.is_none() || raw.struct_weight.is_none() || raw.edge_weight.is_none() {
        deg.push(format!("{path}.weights"));
    }
    let weights = Weights::normalized(
        raw.vol_weight.unwrap_or(0.0),
        raw.struct_weight.unwrap_or(0.0),
        raw.edge_weight.unwrap_or(0.0),
    );

    let vol_score = score10(raw.vol_score, &format!("{path}.vol_score"), deg);
    let struct_score = score10(raw.struct_score, &format!("{path}.struct_score"), deg);
    let edge_score = score10(raw.edge_score, &format!("{path}.edge_score"), deg);

    let composite = match raw.composite {
        Some(c) if (0.0..=10.0).contains(&c) => c,
        Some(c) => {
            deg.push(format!("{path}.composite (clamped)"));
            c.clamp(0.0, 10.0)
        }
        None => {
            deg.push(format!("{path}.composite (recomputed)"));
            compose(vol_score, struct_score, edge_score, weights)
        }
    };

    let drivers = raw
        .drivers
        .unwrap_or_default()
        .into_iter()
        .map(|d| ScoreDriver {
            metric: d.metric.unwrap_or_default(),
            value: d.value.unwrap_or_default(),
            impact: d.impact.unwrap_or(0.0),
            description: d.description.unwrap_or_default(),
        })
        .collect();

    ScoreBreakdown {
        composite,
        confidence: enum_or(
            raw.confidence.as_deref(),
            Confidence::parse,
            Confidence::Low,
            &format!("{path}.confidence"),
            deg,
        ),
        vol_score,
        vol_weight: weights.vol,
        struct_score,
        struct_weight: weights.structure,
        edge_score,
        edge_weight: weights.edge,
        drivers,
    }
}

fn normalize_mandate(
    raw: Option<RawTradingMandate>,
    path: &str,
    deg: &mut Vec<String>,
) -> TradingMandate {
    let Some(raw) = raw else {
        deg.push(format!("{path} (absent)"));
        return TradingMandate::disabled(ABSENT_MANDATE_RATIONALE);
    };

    let veto_reasons = raw.veto_reasons.unwrap_or_default();
    let mut is_trade_allowed = match raw.is_trade_allowed {
        Some(b) => b,
        None => {
            deg.push(format!("{path}.is_trade_allowed"));
            false
        }
    };

    // Veto reasons are authoritative: a non-empty veto list always blocks,
    // whatever the upstream flag says.
    if is_trade_allowed && !veto_reasons.is_empty() {
        deg.push(format!("{path}.is_trade_allowed (vetoed but allowed)"));
        is_trade_allowed = false;
    }

    let suggested_structure = match raw.suggested_structure {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            deg.push(format!("{path}.suggested_structure"));
            "NONE".to_string()
        }
    };

    let allocation_pct = match raw.allocation_pct {
        Some(p) if (0.0..=100.0).contains(&p) => p,
        Some(p) => {
            deg.push(format!("{path}.allocation_pct (clamped)"));
            p.clamp(0.0, 100.0)
        }
        None => {
            deg.push(format!("{path}.allocation_pct"));
            0.0
        }
    };

    TradingMandate {
        regime_name: enum_or(
            raw.regime_name.as_deref(),
            RegimeName::parse,
            RegimeName::Cash,
            &format!("{path}.regime_name"),
            deg,
        ),
        suggested_structure,
        allocation_pct,
        deployment_amount: num(
            raw.deployment_amount,
            &format!("{path}.deployment_amount"),
            deg,
        )
        .max(0.0),
        is_trade_allowed,
        veto_reasons,
        directional_bias: enum_or(
            raw.directional_bias.as_deref(),
            DirectionalBias::parse,
            DirectionalBias::Neutral,
            &format!("{path}.directional_bias"),
            deg,
        ),
        rationale: raw.rationale.unwrap_or_default(),
        square_off_instruction: raw.square_off_instruction,
    }
}

fn normalize_external(raw: RawExternalMetrics, deg: &mut Vec<String>) -> ExternalMetrics {
    let veto_events = match raw.veto_events {
        Some(events) => normalize_events(events, deg),
        None => {
            deg.push("external_metrics.veto_events".to_string());
            Vec::new()
        }
    };

    ExternalMetrics {
        fii_net: num(raw.fii_net, "external_metrics.fii_net", deg),
        dii_net: num(raw.dii_net, "external_metrics.dii_net", deg),
        veto_events,
        veto_square_off_needed: flag(
            raw.veto_square_off_needed,
            "external_metrics.veto_square_off_needed",
            deg,
        ),
        veto_square_off_time: raw.veto_square_off_time,
    }
}

fn normalize_events(raws: Vec<RawVetoEvent>, deg: &mut Vec<String>) -> Vec<VetoEvent> {
    let mut out = Vec::with_capacity(raws.len());
    for (i, raw) in raws.into_iter().enumerate() {
        // An event without a parseable date cannot be counted down; drop it.
        let date = raw
            .date
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
        let Some(date) = date else {
            deg.push(format!("external_metrics.veto_events[{i}].date (dropped)"));
            continue;
        };

        out.push(VetoEvent {
            event: raw.event.unwrap_or_else(|| "UNKNOWN".to_string()),
            date,
            impact: enum_or(
                raw.impact.as_deref(),
                Impact::parse,
                Impact::Low,
                &format!("external_metrics.veto_events[{i}].impact"),
                deg,
            ),
        });
    }
    out
}
