//! Wire-shaped mirror types for the upstream dashboard document.
//!
//! Every leaf is optional and deserialized leniently: a field of the wrong
//! type, a non-finite number, or a missing key all decode to `None` instead
//! of failing the document. The normalizer turns these into total values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn value_as_finite_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(value_as_finite_f64))
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Bool(b)) => Some(b),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_string_vec<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|it| match it {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

fn lenient_array<'de, D, T>(d: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|it| serde_json::from_value(it).ok())
                .collect(),
        ),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTimeContext {
    #[serde(deserialize_with = "lenient_string")]
    pub current_time_ist: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub weekly_exp: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub monthly_exp: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub next_weekly_exp: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub dte_weekly: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub dte_monthly: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub dte_next_weekly: Option<f64>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_expiry_day_weekly: Option<bool>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_past_square_off_time: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawVolMetrics {
    #[serde(deserialize_with = "lenient_f64")]
    pub spot: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub vix: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub rv_7d: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub rv_28d: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub rv_90d: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub garch_vol: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub parkinson_vol: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub ivp_30d: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub ivp_90d: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub ivp_1yr: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub vov: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub vov_zscore: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub vol_regime: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStructureMetrics {
    #[serde(deserialize_with = "lenient_f64")]
    pub gex: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub pcr: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub max_pain: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub skew_25d: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_oi_calls: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_oi_puts: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawEdgeMetrics {
    #[serde(deserialize_with = "lenient_f64")]
    pub iv_atm: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub iv_spread_weekly_monthly: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub vrp_rv: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub vrp_garch: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub vrp_parkinson: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub term_structure: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawScoreDriver {
    #[serde(deserialize_with = "lenient_string")]
    pub metric: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub value: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub impact: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawScoreBreakdown {
    #[serde(deserialize_with = "lenient_f64")]
    pub composite: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub confidence: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub vol_score: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub vol_weight: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub struct_score: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub struct_weight: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub edge_score: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub edge_weight: Option<f64>,
    #[serde(deserialize_with = "lenient_array")]
    pub drivers: Option<Vec<RawScoreDriver>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTradingMandate {
    #[serde(deserialize_with = "lenient_string")]
    pub regime_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub suggested_structure: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub allocation_pct: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub deployment_amount: Option<f64>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_trade_allowed: Option<bool>,
    #[serde(deserialize_with = "lenient_string_vec")]
    pub veto_reasons: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_string")]
    pub directional_bias: Option<String>,
    #[serde(deserialize_with = "lenient_string_vec")]
    pub rationale: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_string")]
    pub square_off_instruction: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawVetoEvent {
    #[serde(deserialize_with = "lenient_string")]
    pub event: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub impact: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawExternalMetrics {
    #[serde(deserialize_with = "lenient_f64")]
    pub fii_net: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub dii_net: Option<f64>,
    #[serde(deserialize_with = "lenient_array")]
    pub veto_events: Option<Vec<RawVetoEvent>>,
    #[serde(deserialize_with = "lenient_bool")]
    pub veto_square_off_needed: Option<bool>,
    #[serde(deserialize_with = "lenient_string")]
    pub veto_square_off_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOptionChainRow {
    #[serde(deserialize_with = "lenient_f64")]
    pub strike: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub ce_iv: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub pe_iv: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub ce_oi: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub pe_oi: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub ce_ltp: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub pe_ltp: Option<f64>,
}
