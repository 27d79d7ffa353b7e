//! Upstream response models for the Aareguru API.
//!
//! Every field the API may omit is an `Option`; only the city identity
//! fields of `/cities` are required.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Post-decode schema checks that serde alone cannot express.
///
/// A payload that deserializes but fails validation is treated exactly like
/// one that fails to deserialize.
pub trait Validate {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl Validate for Value {}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), String> {
        for (idx, item) in self.iter().enumerate() {
            item.validate().map_err(|e| format!("[{idx}]: {e}"))?;
        }
        Ok(())
    }
}

// ── /v2018/current ────────────────────────────────────────────────────

/// River block of the `/current` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AareData {
    pub location: Option<String>,
    pub location_long: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub forecast: Option<bool>,
    pub timestamp: Option<i64>,
    pub timestring: Option<String>,
    /// Water temperature in °C.
    pub temperature: Option<f64>,
    pub temperature_prec: Option<f64>,
    /// Swiss German temperature description.
    pub temperature_text: Option<String>,
    pub temperature_text_short: Option<String>,
    /// Flow rate in m³/s.
    pub flow: Option<f64>,
    pub flow_text: Option<String>,
    /// BAFU danger level, 1..=5 when present.
    pub flow_gefahrenstufe: Option<i64>,
    pub flow_scale_threshold: Option<f64>,
    /// Water temperature forecast two hours out.
    pub forecast2h: Option<f64>,
    pub forecast2h_text: Option<String>,
    /// Water level.
    pub height: Option<f64>,
    pub temperature_scale: Option<Vec<Value>>,
    pub flow_scale: Option<Vec<Value>>,
    pub historical_temp_max: Option<Value>,
}

impl Validate for AareData {
    fn validate(&self) -> Result<(), String> {
        match self.flow_gefahrenstufe {
            Some(level) if !(1..=5).contains(&level) => {
                Err(format!("flow_gefahrenstufe must be in 1..=5, got {level}"))
            }
            _ => Ok(()),
        }
    }
}

/// Complete current conditions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrentResponse {
    pub aare: Option<AareData>,
    pub aarepast: Option<Vec<Value>>,
    pub weather: Option<Value>,
    pub weatherprognosis: Option<Vec<Value>>,
    pub sun: Option<Value>,
}

impl Validate for CurrentResponse {
    fn validate(&self) -> Result<(), String> {
        match &self.aare {
            Some(aare) => aare.validate().map_err(|e| format!("aare.{e}")),
            None => Ok(()),
        }
    }
}

// ── /v2018/today ──────────────────────────────────────────────────────

/// Minimal, flat current data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TodayResponse {
    /// Water temperature in °C.
    pub aare: Option<f64>,
    pub aare_prec: Option<f64>,
    pub text: Option<String>,
    pub text_short: Option<String>,
    pub time: Option<i64>,
    pub name: Option<String>,
    pub longname: Option<String>,
}

impl Validate for TodayResponse {}

// ── /v2018/cities ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// One entry of the `/cities` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityListItem {
    /// City identifier used as the `city` query parameter.
    pub city: String,
    pub name: String,
    pub longname: String,
    pub coordinates: Option<Coordinates>,
    /// Current water temperature in °C.
    pub aare: Option<f64>,
    pub aare_prec: Option<f64>,
    pub sy: Option<i64>,
    pub tn: Option<f64>,
    pub tx: Option<f64>,
    pub forecast: Option<bool>,
    pub time: Option<i64>,
    pub url: Option<String>,
    pub today: Option<String>,
    pub widget: Option<String>,
    pub history: Option<String>,
}

impl Validate for CityListItem {
    fn validate(&self) -> Result<(), String> {
        if self.city.trim().is_empty() {
            return Err("city identifier is empty".into());
        }
        Ok(())
    }
}
