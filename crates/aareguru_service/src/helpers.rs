//! Pure enrichment helpers: safety, seasons, and Swiss German phrases.
//!
//! Flow thresholds follow the BAFU danger scale used by Aareguru.

use serde::Serialize;

/// Default flow (m³/s) above which swimming needs caution.
pub const DEFAULT_FLOW_THRESHOLD: f64 = 220.0;
/// Flow (m³/s) below which a city counts as safe in comparisons.
pub const SAFE_FLOW_LIMIT: f64 = 150.0;
/// Water temperature (°C) below which a warmer city is suggested.
pub const SUGGESTION_BELOW: f64 = 18.0;

const HIGH_FLOW: f64 = 300.0;
const EXTREME_FLOW: f64 = 430.0;
const LOW_FLOW: f64 = 100.0;

/// Checked in order; the first phrase contained in the text wins.
const SWISS_GERMAN_PHRASES: &[(&str, &str)] = &[
    (
        "geil aber chli chalt",
        "Awesome but a bit cold (typical Bernese understatement)",
    ),
    ("schön warm", "Nice and warm"),
    ("arschkalt", "Freezing cold"),
    ("perfekt", "Perfect conditions"),
    ("chli chalt", "A bit cold"),
    ("brrr", "Very cold"),
];

/// Swimming advice for a calendar month (1 = January).
pub fn seasonal_advice(month: u32) -> &'static str {
    match month {
        11 | 12 | 1 | 2 | 3 => {
            "❄️ Winter Season: Water is freezing. Only for experienced ice swimmers. Keep swims very short."
        }
        4 | 5 => "🌱 Spring: Water is still very cold from snowmelt. Wetsuit recommended.",
        6..=8 => "☀️ Summer: Perfect swimming season! Don't forget sunscreen.",
        _ => "🍂 Autumn: Water is getting colder. Check daylight hours and bring warm clothes.",
    }
}

/// Warning text when flow is dangerous, `None` when it is fine or unknown.
pub fn safety_warning(flow: Option<f64>, threshold: Option<f64>) -> Option<&'static str> {
    let flow = flow?;
    let threshold = threshold.unwrap_or(DEFAULT_FLOW_THRESHOLD);

    if flow > EXTREME_FLOW {
        Some("⛔ EXTREME DANGER: Flow is very high (>430 m³/s). Swimming is life-threatening.")
    } else if flow > HIGH_FLOW {
        Some("⚠️ DANGER: High flow rate (>300 m³/s). Swimming NOT recommended.")
    } else if flow > threshold {
        Some("⚠️ CAUTION: Elevated flow rate. Only for experienced swimmers.")
    } else {
        None
    }
}

/// Assessment text and danger level (0 = unknown, 1..=5 BAFU scale).
pub fn safety_assessment(flow: Option<f64>, threshold: f64) -> (&'static str, u8) {
    let Some(flow) = flow else {
        return ("Unknown - no flow data", 0);
    };

    if flow < LOW_FLOW {
        ("Safe - low flow", 1)
    } else if flow < threshold {
        ("Moderate - safe for experienced swimmers", 2)
    } else if flow < HIGH_FLOW {
        ("Elevated - caution advised", 3)
    } else if flow < EXTREME_FLOW {
        ("High - dangerous conditions", 4)
    } else {
        ("Very high - extremely dangerous, avoid swimming", 5)
    }
}

/// English context for a Swiss German temperature phrase.
pub fn swiss_german_explanation(text: Option<&str>) -> Option<&'static str> {
    let lowered = text.filter(|t| !t.is_empty())?.to_lowercase();
    SWISS_GERMAN_PHRASES
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase))
        .map(|(_, explanation)| *explanation)
}

/// Direction of the two-hour water temperature forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
    Unknown,
}

pub fn trend(current: Option<f64>, forecast_2h: Option<f64>) -> Trend {
    match (current, forecast_2h) {
        (Some(now), Some(later)) if later > now => Trend::Rising,
        (Some(now), Some(later)) if later < now => Trend::Falling,
        (Some(_), Some(_)) => Trend::Stable,
        _ => Trend::Unknown,
    }
}

/// Counted as safe when flow is below [`SAFE_FLOW_LIMIT`] or unknown.
pub fn is_safe_flow(flow: Option<f64>) -> bool {
    flow.map_or(true, |f| f < SAFE_FLOW_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seasons_cover_every_month() {
        assert!(seasonal_advice(1).starts_with("❄️"));
        assert!(seasonal_advice(4).starts_with("🌱"));
        assert!(seasonal_advice(7).starts_with("☀️"));
        assert!(seasonal_advice(9).starts_with("🍂"));
        assert!(seasonal_advice(10).starts_with("🍂"));
        assert!(seasonal_advice(12).starts_with("❄️"));
    }

    #[test]
    fn test_safety_warning_levels() {
        assert_eq!(safety_warning(None, None), None);
        assert_eq!(safety_warning(Some(150.0), None), None);
        assert!(safety_warning(Some(250.0), None)
            .expect("above default threshold")
            .contains("CAUTION"));
        assert!(safety_warning(Some(350.0), None)
            .expect("danger")
            .contains("DANGER: High"));
        assert!(safety_warning(Some(500.0), None)
            .expect("extreme")
            .contains("EXTREME"));
        // Custom threshold lowers the caution point.
        assert!(safety_warning(Some(160.0), Some(150.0)).is_some());
    }

    #[test]
    fn test_safety_assessment_boundaries() {
        assert_eq!(safety_assessment(None, 220.0).1, 0);
        assert_eq!(safety_assessment(Some(99.9), 220.0).1, 1);
        assert_eq!(safety_assessment(Some(100.0), 220.0).1, 2);
        assert_eq!(safety_assessment(Some(220.0), 220.0).1, 3);
        assert_eq!(safety_assessment(Some(300.0), 220.0).1, 4);
        assert_eq!(safety_assessment(Some(430.0), 220.0).1, 5);
    }

    #[test]
    fn test_swiss_german_first_match_wins() {
        assert_eq!(
            swiss_german_explanation(Some("Geil aber chli chalt")),
            Some("Awesome but a bit cold (typical Bernese understatement)")
        );
        assert_eq!(swiss_german_explanation(Some("no chli chalt")), Some("A bit cold"));
        assert_eq!(swiss_german_explanation(Some("hello")), None);
        assert_eq!(swiss_german_explanation(Some("")), None);
        assert_eq!(swiss_german_explanation(None), None);
    }

    #[test]
    fn test_trend() {
        assert_eq!(trend(Some(17.0), Some(17.5)), Trend::Rising);
        assert_eq!(trend(Some(17.0), Some(16.5)), Trend::Falling);
        assert_eq!(trend(Some(17.0), Some(17.0)), Trend::Stable);
        assert_eq!(trend(None, Some(17.0)), Trend::Unknown);
    }

    #[test]
    fn test_safe_flow() {
        assert!(is_safe_flow(None));
        assert!(is_safe_flow(Some(149.9)));
        assert!(!is_safe_flow(Some(150.0)));
    }
}
