use chrono::{DateTime, Utc};
use volguard_core::domain::countdown::{self, Countdown};
use volguard_core::domain::score;
use volguard_core::domain::snapshot::{ExpiryBucket, VetoEvent};
use volguard_core::poll::DashboardState;

/// Indian-market currency shorthand: crores above 1e7, lakhs above 1e5.
pub fn format_crore(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    if abs >= 1.0e7 {
        format!("{sign}₹{:.2}Cr", abs / 1.0e7)
    } else if abs >= 1.0e5 {
        format!("{sign}₹{:.2}L", abs / 1.0e5)
    } else {
        format!("{sign}₹{abs:.0}")
    }
}

fn bucket_label(bucket: ExpiryBucket) -> &'static str {
    match bucket {
        ExpiryBucket::Weekly => "WEEKLY",
        ExpiryBucket::NextWeekly => "NEXT WEEKLY",
        ExpiryBucket::Monthly => "MONTHLY",
    }
}

/// Render the full dashboard state as terminal text. A failed refresh keeps
/// the last good snapshot on screen behind an explicit error banner.
pub fn render_state(state: &DashboardState) -> String {
    let mut out = String::new();

    if let Some(err) = &state.error {
        match state.last_success {
            Some(at) => out.push_str(&format!(
                "⚠ refresh failed ({err}); showing data from {}\n",
                at.to_rfc3339()
            )),
            None => out.push_str(&format!("⚠ refresh failed ({err}); no data received yet\n")),
        }
    }

    let Some(snapshot) = &state.snapshot else {
        out.push_str("waiting for first snapshot\n");
        return out;
    };

    let v = &snapshot.vol_metrics;
    out.push_str(&format!(
        "NIFTY {:.2} | VIX {:.2} ({}) | IVP30 {:.0} | VoV {:.1}% ({:+.1}σ)\n",
        v.spot,
        v.vix,
        v.vol_regime.as_str(),
        v.ivp_30d,
        v.vov,
        v.vov_zscore,
    ));

    let e = &snapshot.edge_metrics;
    out.push_str(&format!(
        "IV ATM {:.2} ({}) | VRP rv {:+.2} garch {:+.2} park {:+.2}\n",
        e.iv_atm,
        e.term_structure.as_str(),
        e.vrp_rv,
        e.vrp_garch,
        e.vrp_parkinson,
    ));

    for (bucket, mandate) in snapshot.mandates.iter() {
        let sc = snapshot.scores.get(bucket);
        let st = score::status(mandate.is_trade_allowed, sc.composite);
        let primary = if snapshot.primary_recommendation == Some(bucket) {
            " ★"
        } else {
            ""
        };

        out.push_str(&format!(
            "{} {}{primary}: {:.1}/10 {} | {} {} | alloc {:.0}% {} | bias {}\n",
            st.icon(),
            bucket_label(bucket),
            sc.composite,
            sc.confidence.as_str(),
            mandate.regime_name.as_str(),
            mandate.suggested_structure,
            mandate.allocation_pct,
            format_crore(mandate.deployment_amount),
            mandate.directional_bias.as_str(),
        ));
        for reason in &mandate.veto_reasons {
            out.push_str(&format!("    veto: {reason}\n"));
        }
        if let Some(instruction) = &mandate.square_off_instruction {
            out.push_str(&format!("    square-off: {instruction}\n"));
        }
    }

    if snapshot.primary_recommendation.is_none() {
        out.push_str("⛔ no trade: no expiry currently allows trading\n");
    }

    let ext = &snapshot.external_metrics;
    out.push_str(&format!(
        "FII {:+.1} | DII {:+.1} (₹ Cr)\n",
        ext.fii_net, ext.dii_net
    ));

    if !state.degraded.is_empty() {
        out.push_str(&format!(
            "⚠ {} field(s) defaulted due to bad upstream data\n",
            state.degraded.len()
        ));
    }

    out
}

/// Countdown line for the nearest high-impact veto event, including the
/// position square-off deadline while the event is still ahead.
pub fn render_countdown(events: &[VetoEvent], now: DateTime<Utc>) -> Option<String> {
    let (event, remaining) = countdown::next_high_impact(events, now)?;
    let mut line = format!("⏳ {}: {remaining}", event.event);

    if matches!(remaining, Countdown::Remaining { .. }) {
        if let Some(deadline) = countdown::square_off_deadline(event.date) {
            match Countdown::until(deadline, now) {
                c @ Countdown::Remaining { .. } => {
                    line.push_str(&format!(" (square off in {c})"));
                }
                Countdown::InProgress => line.push_str(" (square-off deadline passed)"),
            }
        }
    }

    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use volguard_core::domain::snapshot::Impact;
    use volguard_core::ingest::normalize::normalize;
    use volguard_core::poll::apply_fetch_result;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn formats_crores_and_lakhs() {
        assert_eq!(format_crore(25_000_000.0), "₹2.50Cr");
        assert_eq!(format_crore(500_000.0), "₹5.00L");
        assert_eq!(format_crore(980.0), "₹980");
        assert_eq!(format_crore(-12_500_000.0), "-₹1.25Cr");
    }

    #[test]
    fn renders_a_fully_defaulted_snapshot_without_panicking() {
        let state = apply_fetch_result(&DashboardState::default(), Ok(json!({})), now());
        let text = render_state(&state);
        assert!(text.contains("WAITING"));
        assert!(text.contains("🚫"));
        assert!(!text.contains("★"));
        assert!(text.contains("no trade: no expiry currently allows trading"));
        assert!(text.contains("field(s) defaulted"));
    }

    #[test]
    fn renders_waiting_line_before_the_first_snapshot() {
        let text = render_state(&DashboardState::default());
        assert!(text.contains("waiting for first snapshot"));
    }

    #[test]
    fn stale_state_keeps_data_behind_an_error_banner() {
        let good = apply_fetch_result(&DashboardState::default(), Ok(json!({})), now());
        let stale = apply_fetch_result(&good, Err(anyhow::anyhow!("boom")), now());
        let text = render_state(&stale);
        assert!(text.contains("refresh failed"));
        assert!(text.contains("NIFTY"));
    }

    #[test]
    fn countdown_line_includes_the_square_off_deadline() {
        let events = vec![VetoEvent {
            event: "RBI MPC Meeting".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(),
            impact: Impact::High,
        }];
        let line = render_countdown(&events, now()).unwrap();
        assert!(line.contains("RBI MPC Meeting: 2d 12h 0m"));
        assert!(line.contains("square off in"));
    }

    #[test]
    fn no_high_impact_events_means_no_countdown_line() {
        assert!(render_countdown(&[], now()).is_none());
    }
}
