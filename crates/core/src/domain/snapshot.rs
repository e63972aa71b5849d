use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolRegime {
    Cheap,
    Fair,
    Rich,
    Extreme,
}

impl VolRegime {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CHEAP" => Some(Self::Cheap),
            "FAIR" => Some(Self::Fair),
            "RICH" => Some(Self::Rich),
            "EXTREME" => Some(Self::Extreme),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheap => "CHEAP",
            Self::Fair => "FAIR",
            Self::Rich => "RICH",
            Self::Extreme => "EXTREME",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TermStructure {
    Contango,
    Backwardation,
    Flat,
}

impl TermStructure {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONTANGO" => Some(Self::Contango),
            "BACKWARDATION" => Some(Self::Backwardation),
            "FLAT" => Some(Self::Flat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contango => "CONTANGO",
            Self::Backwardation => "BACKWARDATION",
            Self::Flat => "FLAT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl Impact {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

/// WAITING is never sent by the backend; it is the canonical regime for a
/// mandate the normalizer had to synthesize when upstream sent none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegimeName {
    AggressiveShort,
    ModerateShort,
    Defensive,
    Cash,
    Waiting,
}

impl RegimeName {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AGGRESSIVE_SHORT" => Some(Self::AggressiveShort),
            "MODERATE_SHORT" => Some(Self::ModerateShort),
            "DEFENSIVE" => Some(Self::Defensive),
            "CASH" => Some(Self::Cash),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AggressiveShort => "AGGRESSIVE_SHORT",
            Self::ModerateShort => "MODERATE_SHORT",
            Self::Defensive => "DEFENSIVE",
            Self::Cash => "CASH",
            Self::Waiting => "WAITING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectionalBias {
    Bullish,
    Bearish,
    Neutral,
}

impl DirectionalBias {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BULLISH" => Some(Self::Bullish),
            "BEARISH" => Some(Self::Bearish),
            "NEUTRAL" => Some(Self::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullish => "BULLISH",
            Self::Bearish => "BEARISH",
            Self::Neutral => "NEUTRAL",
        }
    }
}

/// One of the three forward-looking option-expiration horizons tracked in
/// parallel. The wire spelling is lowercase ("weekly", "monthly",
/// "next_weekly").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryBucket {
    Weekly,
    NextWeekly,
    Monthly,
}

impl ExpiryBucket {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Some(Self::Weekly),
            "next_weekly" => Some(Self::NextWeekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::NextWeekly => "next_weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// Per-bucket container for structure metrics, scores, and mandates.
/// Iteration order is shortest-dated first; selection tie-breaks rely on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirySlots<T> {
    pub weekly: T,
    pub next_weekly: T,
    pub monthly: T,
}

impl<T> ExpirySlots<T> {
    pub fn get(&self, bucket: ExpiryBucket) -> &T {
        match bucket {
            ExpiryBucket::Weekly => &self.weekly,
            ExpiryBucket::NextWeekly => &self.next_weekly,
            ExpiryBucket::Monthly => &self.monthly,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExpiryBucket, &T)> {
        [
            (ExpiryBucket::Weekly, &self.weekly),
            (ExpiryBucket::NextWeekly, &self.next_weekly),
            (ExpiryBucket::Monthly, &self.monthly),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeContext {
    pub current_time_ist: String,
    pub weekly_exp: NaiveDate,
    pub monthly_exp: NaiveDate,
    pub next_weekly_exp: NaiveDate,
    pub dte_weekly: i64,
    pub dte_monthly: i64,
    pub dte_next_weekly: i64,
    pub is_expiry_day_weekly: bool,
    pub is_past_square_off_time: bool,
}

/// Annualized-percent vol metrics plus percentile ranks. `vov` (percent) and
/// `vov_zscore` (sigma) are deliberately distinct fields; the backend has
/// shipped both units under the name "vov" at different times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolMetrics {
    pub spot: f64,
    pub vix: f64,
    pub rv_7d: f64,
    pub rv_28d: f64,
    pub rv_90d: f64,
    pub garch_vol: f64,
    pub parkinson_vol: f64,
    pub ivp_30d: f64,
    pub ivp_90d: f64,
    pub ivp_1yr: f64,
    pub vov: f64,
    pub vov_zscore: f64,
    pub vol_regime: VolRegime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureMetrics {
    pub gex: f64,
    pub pcr: f64,
    pub max_pain: f64,
    pub skew_25d: f64,
    pub total_oi_calls: u64,
    pub total_oi_puts: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeMetrics {
    pub iv_atm: f64,
    pub iv_spread_weekly_monthly: f64,
    pub vrp_rv: f64,
    pub vrp_garch: f64,
    pub vrp_parkinson: f64,
    pub term_structure: TermStructure,
}

/// Presentation evidence for a score. Advisory only: nothing forces
/// `sum(impact)` to equal the composite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreDriver {
    pub metric: String,
    pub value: String,
    pub impact: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub composite: f64,
    pub confidence: Confidence,
    pub vol_score: f64,
    pub vol_weight: f64,
    pub struct_score: f64,
    pub struct_weight: f64,
    pub edge_score: f64,
    pub edge_weight: f64,
    pub drivers: Vec<ScoreDriver>,
}

impl ScoreBreakdown {
    /// Substitute for a wholesale-absent score: zeroed, LOW confidence,
    /// equal-thirds weights.
    pub fn absent() -> Self {
        Self {
            composite: 0.0,
            confidence: Confidence::Low,
            vol_score: 0.0,
            vol_weight: 1.0 / 3.0,
            struct_score: 0.0,
            struct_weight: 1.0 / 3.0,
            edge_score: 0.0,
            edge_weight: 1.0 / 3.0,
            drivers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingMandate {
    pub regime_name: RegimeName,
    pub suggested_structure: String,
    pub allocation_pct: f64,
    pub deployment_amount: f64,
    pub is_trade_allowed: bool,
    pub veto_reasons: Vec<String>,
    pub directional_bias: DirectionalBias,
    pub rationale: Vec<String>,
    pub square_off_instruction: Option<String>,
}

impl TradingMandate {
    /// Canonical disabled mandate for an explicit-null upstream mandate
    /// ("no trade" signal).
    pub fn disabled(rationale: &str) -> Self {
        Self {
            regime_name: RegimeName::Waiting,
            suggested_structure: "NONE".to_string(),
            allocation_pct: 0.0,
            deployment_amount: 0.0,
            is_trade_allowed: false,
            veto_reasons: Vec::new(),
            directional_bias: DirectionalBias::Neutral,
            rationale: vec![rationale.to_string()],
            square_off_instruction: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VetoEvent {
    pub event: String,
    pub date: NaiveDate,
    pub impact: Impact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalMetrics {
    pub fii_net: f64,
    pub dii_net: f64,
    pub veto_events: Vec<VetoEvent>,
    pub veto_square_off_needed: bool,
    pub veto_square_off_time: Option<String>,
}

/// Aggregate root. Replaced wholesale on every successful poll; never merged
/// incrementally, so readers only ever observe a complete document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub time_context: TimeContext,
    pub vol_metrics: VolMetrics,
    pub structure: ExpirySlots<StructureMetrics>,
    pub edge_metrics: EdgeMetrics,
    pub scores: ExpirySlots<ScoreBreakdown>,
    pub mandates: ExpirySlots<TradingMandate>,
    pub external_metrics: ExternalMetrics,
    /// `None` means an explicit no-trade state: selection had to be derived
    /// locally and no bucket allows trading.
    pub primary_recommendation: Option<ExpiryBucket>,
}

/// One row of the per-strike option chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChainRow {
    pub strike: f64,
    pub ce_iv: f64,
    pub pe_iv: f64,
    pub ce_oi: f64,
    pub pe_oi: f64,
    pub ce_ltp: f64,
    pub pe_ltp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainExpiry {
    Weekly,
    Monthly,
}

impl ChainExpiry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_enums_round_trip_exactly() {
        assert_eq!(
            serde_json::to_string(&VolRegime::Extreme).unwrap(),
            "\"EXTREME\""
        );
        assert_eq!(
            serde_json::from_str::<VolRegime>("\"CHEAP\"").unwrap(),
            VolRegime::Cheap
        );
        assert_eq!(
            serde_json::to_string(&RegimeName::AggressiveShort).unwrap(),
            "\"AGGRESSIVE_SHORT\""
        );
        assert_eq!(
            serde_json::from_str::<TermStructure>("\"BACKWARDATION\"").unwrap(),
            TermStructure::Backwardation
        );
        assert_eq!(
            serde_json::to_string(&ExpiryBucket::NextWeekly).unwrap(),
            "\"next_weekly\""
        );
        assert_eq!(
            serde_json::from_str::<ExpiryBucket>("\"weekly\"").unwrap(),
            ExpiryBucket::Weekly
        );
    }

    #[test]
    fn parse_rejects_values_outside_the_set() {
        assert_eq!(VolRegime::parse("EXPLODING"), None);
        assert_eq!(RegimeName::parse("YOLO_LONG"), None);
        // WAITING is synthesized locally, never accepted from the wire.
        assert_eq!(RegimeName::parse("WAITING"), None);
        assert_eq!(ExpiryBucket::parse("quarterly"), None);
        assert_eq!(Confidence::parse(" low "), Some(Confidence::Low));
    }

    #[test]
    fn slots_iterate_shortest_dated_first() {
        let slots = ExpirySlots {
            weekly: 1,
            next_weekly: 2,
            monthly: 3,
        };
        let order: Vec<_> = slots.iter().map(|(b, _)| b).collect();
        assert_eq!(
            order,
            vec![
                ExpiryBucket::Weekly,
                ExpiryBucket::NextWeekly,
                ExpiryBucket::Monthly
            ]
        );
        assert_eq!(*slots.get(ExpiryBucket::Monthly), 3);
    }

    #[test]
    fn disabled_mandate_is_blocked_and_flat() {
        let m = TradingMandate::disabled("no mandate supplied by engine");
        assert_eq!(m.regime_name, RegimeName::Waiting);
        assert_eq!(m.suggested_structure, "NONE");
        assert_eq!(m.allocation_pct, 0.0);
        assert!(!m.is_trade_allowed);
        assert!(m.veto_reasons.is_empty());
        assert!(!m.rationale.is_empty());
    }
}
