//! Business operations over the Aareguru client.
//!
//! One `AareguruService` owns one client, so every operation shares the same
//! response cache and throttle.

use aareguru_client::{AareguruClient, HttpUpstream, MetricsSnapshot, Upstream};
use chrono::{Datelike, Local};
use common::{CityListItem, Error, Settings};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, info};

use crate::fanout::{fan_out, fan_out_bounded, AggregateResult};
use crate::helpers::{
    is_safe_flow, safety_assessment, safety_warning, seasonal_advice, swiss_german_explanation,
    trend, Trend, DEFAULT_FLOW_THRESHOLD, SUGGESTION_BELOW,
};

/// Current water temperature with context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureReport {
    pub city: String,
    pub temperature: Option<f64>,
    pub temperature_text: Option<String>,
    pub swiss_german_explanation: Option<String>,
    pub name: Option<String>,
    pub warning: Option<String>,
    pub suggestion: Option<String>,
    pub seasonal_advice: String,
    pub temperature_prec: Option<f64>,
    pub temperature_text_short: Option<String>,
    pub longname: Option<String>,
}

/// River block of [`ConditionsReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AareConditions {
    pub location: Option<String>,
    pub location_long: Option<String>,
    pub temperature: Option<f64>,
    pub temperature_text: Option<String>,
    pub swiss_german_explanation: Option<String>,
    pub temperature_text_short: Option<String>,
    pub flow: Option<f64>,
    pub flow_text: Option<String>,
    pub height: Option<f64>,
    pub forecast2h: Option<f64>,
    pub forecast2h_text: Option<String>,
    pub warning: Option<String>,
}

/// Everything known about one city right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionsReport {
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aare: Option<AareConditions>,
    pub seasonal_advice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Vec<Value>>,
}

/// BAFU flow assessment for one city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowDangerReport {
    pub city: String,
    pub flow: Option<f64>,
    pub flow_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_threshold: Option<f64>,
    pub safety_assessment: String,
    pub danger_level: u8,
}

/// One row of a city comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitySnapshot {
    pub city: String,
    pub temperature: Option<f64>,
    pub flow: Option<f64>,
    pub safe: bool,
    pub temperature_text: Option<String>,
    pub location: Option<String>,
}

/// A failed key as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityError {
    pub city: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityComparison {
    /// Warmest first; equal temperatures keep request order.
    pub cities: Vec<CitySnapshot>,
    pub warmest: Option<CitySnapshot>,
    pub coldest: Option<CitySnapshot>,
    pub safe_count: usize,
    pub total_count: usize,
    pub requested_count: usize,
    pub errors: Option<Vec<CityError>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityForecast {
    pub city: String,
    pub current: Option<f64>,
    pub forecast_2h: Option<f64>,
    pub trend: Trend,
    pub change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    /// In request order.
    pub forecasts: Vec<CityForecast>,
    pub success_count: usize,
    pub requested_count: usize,
    pub errors: Option<Vec<CityError>>,
}

fn collect_errors<T>(aggregate: &AggregateResult<String, T>) -> Option<Vec<CityError>> {
    if aggregate.failures.is_empty() {
        return None;
    }
    Some(
        aggregate
            .failures
            .iter()
            .map(|(city, err)| CityError {
                city: city.clone(),
                error: format!("{}: {}", err.kind(), err),
            })
            .collect(),
    )
}

fn current_season_advice() -> String {
    seasonal_advice(Local::now().month()).to_string()
}

/// Aare river operations for tools and CLI commands.
pub struct AareguruService<U = HttpUpstream> {
    client: AareguruClient<U>,
    fanout_concurrency: Option<usize>,
}

impl AareguruService<HttpUpstream> {
    /// Open a service backed by the real Aareguru API.
    pub fn open(settings: &Settings) -> Result<Self, Error> {
        Ok(Self::new(AareguruClient::open(settings)?, settings))
    }
}

impl<U: Upstream> AareguruService<U> {
    pub fn new(client: AareguruClient<U>, settings: &Settings) -> Self {
        Self {
            client,
            fanout_concurrency: settings.fanout.concurrency,
        }
    }

    pub fn client(&self) -> &AareguruClient<U> {
        &self.client
    }

    /// Fan out over cities, honouring the configured concurrency cap.
    async fn fan_out_cities<T, F, Fut>(
        &self,
        cities: Vec<String>,
        op: F,
    ) -> Result<AggregateResult<String, T>, Error>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        match self.fanout_concurrency {
            Some(limit) => fan_out_bounded(cities, limit, op).await,
            None => fan_out(cities, op).await,
        }
    }

    /// Current water temperature with warning, phrase explanation, warmer-city
    /// suggestion and seasonal advice. Falls back to `/today` when `/current`
    /// carries no river block.
    pub async fn current_temperature(&self, city: &str) -> Result<TemperatureReport, Error> {
        info!("service.current_temperature city={}", city);
        let current = self.client.get_current(city).await?;

        let mut report = match current.aare {
            Some(aare) => TemperatureReport {
                city: city.to_string(),
                temperature: aare.temperature,
                swiss_german_explanation: swiss_german_explanation(
                    aare.temperature_text.as_deref(),
                )
                .map(str::to_string),
                temperature_text: aare.temperature_text,
                name: aare.location,
                warning: safety_warning(aare.flow, None).map(str::to_string),
                suggestion: None,
                seasonal_advice: current_season_advice(),
                temperature_prec: aare.temperature_prec.or(aare.temperature),
                temperature_text_short: aare.temperature_text_short,
                longname: aare.location_long,
            },
            None => {
                debug!("No river block in /current for {}, falling back to /today", city);
                let today = self.client.get_today(city).await?;
                TemperatureReport {
                    city: city.to_string(),
                    temperature: today.aare,
                    swiss_german_explanation: swiss_german_explanation(today.text.as_deref())
                        .map(str::to_string),
                    temperature_text: today.text,
                    name: today.name,
                    warning: None,
                    suggestion: None,
                    seasonal_advice: current_season_advice(),
                    temperature_prec: today.aare_prec,
                    temperature_text_short: today.text_short,
                    longname: today.longname,
                }
            }
        };

        report.suggestion = self.warmer_suggestion(city, report.temperature).await;
        Ok(report)
    }

    /// Best effort: any failure simply means no suggestion.
    async fn warmer_suggestion(&self, city: &str, temperature: Option<f64>) -> Option<String> {
        let current = temperature.filter(|t| *t < SUGGESTION_BELOW)?;

        let cities = match self.client.get_cities().await {
            Ok(cities) => cities,
            Err(e) => {
                debug!("Skipping warmer-city suggestion: {}", e);
                return None;
            }
        };

        let mut warmest: Option<(&CityListItem, f64)> = None;
        for candidate in &cities {
            if candidate.city.eq_ignore_ascii_case(city) {
                continue;
            }
            let Some(temp) = candidate.aare else {
                continue;
            };
            if warmest.map_or(true, |(_, best)| temp > best) {
                warmest = Some((candidate, temp));
            }
        }

        let (best, temp) = warmest?;
        (temp > current + 1.0)
            .then(|| format!("💡 Tip: {} is warmer right now ({:.1}°C)", best.name, temp))
    }

    /// Full current conditions for one city.
    pub async fn current_conditions(&self, city: &str) -> Result<ConditionsReport, Error> {
        info!("service.current_conditions city={}", city);
        let current = self.client.get_current(city).await?;

        let aare = current.aare.map(|aare| AareConditions {
            warning: safety_warning(aare.flow, None).map(str::to_string),
            swiss_german_explanation: swiss_german_explanation(aare.temperature_text.as_deref())
                .map(str::to_string),
            location: aare.location,
            location_long: aare.location_long,
            temperature: aare.temperature,
            temperature_text: aare.temperature_text,
            temperature_text_short: aare.temperature_text_short,
            flow: aare.flow,
            flow_text: aare.flow_text,
            height: aare.height,
            forecast2h: aare.forecast2h,
            forecast2h_text: aare.forecast2h_text,
        });

        Ok(ConditionsReport {
            city: city.to_string(),
            aare,
            seasonal_advice: current_season_advice(),
            weather: current.weather,
            forecast: current.weatherprognosis,
        })
    }

    /// Historical series for trend analysis; always fetched fresh.
    pub async fn historical_data(&self, city: &str, start: &str, end: &str) -> Result<Value, Error> {
        info!(
            "service.historical_data city={} start={} end={}",
            city, start, end
        );
        self.client.get_history(city, start, end).await
    }

    /// Current flow with BAFU danger level.
    pub async fn flow_danger_level(&self, city: &str) -> Result<FlowDangerReport, Error> {
        info!("service.flow_danger_level city={}", city);
        let current = self.client.get_current(city).await?;

        let Some(aare) = current.aare else {
            return Ok(FlowDangerReport {
                city: city.to_string(),
                flow: None,
                flow_text: None,
                flow_threshold: None,
                safety_assessment: "No data available".into(),
                danger_level: 0,
            });
        };

        let threshold = aare.flow_scale_threshold.unwrap_or(DEFAULT_FLOW_THRESHOLD);
        let (assessment, level) = safety_assessment(aare.flow, threshold);

        Ok(FlowDangerReport {
            city: city.to_string(),
            flow: aare.flow,
            flow_text: aare.flow_text,
            flow_threshold: Some(threshold),
            safety_assessment: assessment.to_string(),
            danger_level: level,
        })
    }

    pub async fn cities_list(&self) -> Result<Vec<CityListItem>, Error> {
        info!("service.cities_list");
        self.client.get_cities().await
    }

    /// Compare cities concurrently, ranked warmest first. `None` compares
    /// every city the API knows. Fails only if every city failed.
    pub async fn compare_cities(&self, cities: Option<Vec<String>>) -> Result<CityComparison, Error> {
        let cities = match cities {
            Some(cities) => cities,
            None => self
                .client
                .get_cities()
                .await?
                .into_iter()
                .map(|c| c.city)
                .collect(),
        };
        info!("Comparing {} cities in parallel: {:?}", cities.len(), cities);

        let client = &self.client;
        let aggregate = self
            .fan_out_cities(cities, move |city: String| async move {
                let current = client.get_current(&city).await?;
                let aare = current
                    .aare
                    .ok_or_else(|| Error::NoData(format!("no aare data for {city}")))?;
                Ok::<_, Error>(CitySnapshot {
                    safe: is_safe_flow(aare.flow),
                    temperature: aare.temperature,
                    flow: aare.flow,
                    temperature_text: aare.temperature_text,
                    location: aare.location,
                    city,
                })
            })
            .await?;

        info!(
            "Comparison complete: {}/{} cities succeeded",
            aggregate.succeeded_count, aggregate.requested_count
        );

        let warmest = aggregate
            .pick_max(|s| s.temperature)
            .map(|(_, s)| s.clone());
        let coldest = aggregate
            .pick_min(|s| s.temperature)
            .map(|(_, s)| s.clone());
        let errors = collect_errors(&aggregate);

        let mut ranked: Vec<CitySnapshot> =
            aggregate.successes.into_iter().map(|(_, s)| s).collect();
        // Stable sort: equal temperatures keep request order.
        ranked.sort_by(|a, b| {
            let a = a.temperature.unwrap_or(0.0);
            let b = b.temperature.unwrap_or(0.0);
            b.total_cmp(&a)
        });

        Ok(CityComparison {
            safe_count: ranked.iter().filter(|c| c.safe).count(),
            total_count: ranked.len(),
            requested_count: aggregate.requested_count,
            cities: ranked,
            warmest,
            coldest,
            errors,
        })
    }

    /// Two-hour forecasts with trend for several cities concurrently.
    pub async fn forecasts(&self, cities: &[String]) -> Result<ForecastReport, Error> {
        info!("Fetching forecasts for {} cities: {:?}", cities.len(), cities);

        let client = &self.client;
        let aggregate = self
            .fan_out_cities(cities.to_vec(), move |city: String| async move {
                let current = client.get_current(&city).await?;
                let aare = current
                    .aare
                    .ok_or_else(|| Error::NoData(format!("no aare data for {city}")))?;

                let now = aare.temperature;
                let later = aare.forecast2h;
                Ok::<_, Error>(CityForecast {
                    trend: trend(now, later),
                    change: now.zip(later).map(|(now, later)| later - now),
                    current: now,
                    forecast_2h: later,
                    city,
                })
            })
            .await?;

        info!(
            "Forecast fetch complete: {}/{} cities succeeded",
            aggregate.succeeded_count, aggregate.requested_count
        );

        let errors = collect_errors(&aggregate);
        Ok(ForecastReport {
            success_count: aggregate.succeeded_count,
            requested_count: aggregate.requested_count,
            forecasts: aggregate.successes.into_iter().map(|(_, f)| f).collect(),
            errors,
        })
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.client.metrics()
    }

    pub fn close(self) -> MetricsSnapshot {
        self.client.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aareguru_client::testing::{param, transport_error, ScriptedUpstream};
    use aareguru_client::{CITIES_PATH, CURRENT_PATH, TODAY_PATH};

    const CITIES: &str = r#"[
        {"city": "bern", "name": "Bärn", "longname": "Bern, Schönau", "aare": 17.0},
        {"city": "thun", "name": "Thun", "longname": "Thun, Schwäbis", "aare": 19.5},
        {"city": "olten", "name": "Olten", "longname": "Olten, Aare", "aare": 16.0},
        {"city": "brugg", "name": "Brugg", "longname": "Brugg, Aare", "aare": null}
    ]"#;

    fn current_body(city: &str) -> Option<&'static str> {
        let body = match city {
            "bern" => {
                r#"{"aare": {"location": "Bärn", "location_long": "Bern, Schönau",
                    "temperature": 17.0, "temperature_text": "geil aber chli chalt",
                    "flow": 88.0, "flow_text": "tief", "forecast2h": 17.5}}"#
            }
            "thun" => {
                r#"{"aare": {"location": "Thun", "temperature": 19.5, "flow": 160.0,
                    "forecast2h": 19.0}}"#
            }
            "olten" => {
                r#"{"aare": {"location": "Olten", "temperature": 16.0, "flow": 320.0,
                    "flow_scale_threshold": 200.0, "forecast2h": 16.0},
                    "weather": {"current": {"tt": 21.0}},
                    "weatherprognosis": [{"day": "Heute"}]}"#
            }
            "aarau" => r#"{"aare": {"location": "Aarau", "temperature": 18.0, "flow": 90.0}}"#,
            "biel" => r#"{"aare": {"location": "Biel", "temperature": 18.0, "flow": 90.0}}"#,
            "aarburg" => {
                r#"{"aare": {"location": "Aarburg", "temperature": 17.0, "flow": 210.0,
                    "flow_scale_threshold": 200.0}}"#
            }
            "brugg" => r#"{"weather": {"current": {"tt": 19.0}}}"#,
            _ => return None,
        };
        Some(body)
    }

    fn fake_upstream() -> ScriptedUpstream {
        ScriptedUpstream::new(|endpoint, query| {
            let city = param(query, "city").unwrap_or_default();
            let body = match endpoint {
                CITIES_PATH => Some(CITIES),
                CURRENT_PATH => current_body(city),
                TODAY_PATH if city == "brugg" => Some(
                    r#"{"aare": 14.2, "aare_prec": 14.23, "text": "arschkalt",
                        "text_short": "chalt", "name": "Brugg", "longname": "Brugg, Aare"}"#,
                ),
                _ => None,
            };
            body.map(|b| b.as_bytes().to_vec())
                .ok_or_else(|| transport_error(endpoint, "upstream returned 404: unknown city"))
        })
    }

    fn service_with(settings: &Settings) -> AareguruService<ScriptedUpstream> {
        AareguruService::new(
            AareguruClient::with_upstream(fake_upstream(), settings),
            settings,
        )
    }

    fn service() -> AareguruService<ScriptedUpstream> {
        service_with(&Settings::unthrottled())
    }

    fn names(cities: &[&str]) -> Vec<String> {
        cities.iter().map(|c| c.to_string()).collect()
    }

    fn dispatches(svc: &AareguruService<ScriptedUpstream>) -> usize {
        svc.client().fetch_client().upstream().calls()
    }

    #[tokio::test]
    async fn test_compare_reports_partial_failures() {
        let svc = service();
        let cmp = svc
            .compare_cities(Some(names(&["bern", "basel", "thun", "brugg", "olten"])))
            .await
            .expect("three cities succeed");

        let ranked: Vec<&str> = cmp.cities.iter().map(|c| c.city.as_str()).collect();
        assert_eq!(ranked, vec!["thun", "bern", "olten"]);
        assert_eq!(cmp.warmest.as_ref().map(|c| c.city.as_str()), Some("thun"));
        assert_eq!(cmp.coldest.as_ref().map(|c| c.city.as_str()), Some("olten"));
        assert_eq!(cmp.safe_count, 1);
        assert_eq!(cmp.total_count, 3);
        assert_eq!(cmp.requested_count, 5);

        let errors = cmp.errors.expect("two failures");
        let failed: Vec<&str> = errors.iter().map(|e| e.city.as_str()).collect();
        assert_eq!(failed, vec!["basel", "brugg"]);
        assert!(errors[0].error.starts_with("TransportError"));
        assert!(errors[1].error.starts_with("NoData"));
    }

    #[tokio::test]
    async fn test_compare_ties_keep_request_order() {
        let svc = service();
        let cmp = svc
            .compare_cities(Some(names(&["biel", "aarau"])))
            .await
            .expect("both succeed");
        assert_eq!(cmp.warmest.map(|c| c.city), Some("biel".to_string()));
        assert_eq!(cmp.coldest.map(|c| c.city), Some("biel".to_string()));
        assert_eq!(cmp.cities[0].city, "biel");
        assert!(cmp.errors.is_none());
    }

    #[tokio::test]
    async fn test_compare_all_failed_is_an_error() {
        let svc = service();
        let err = svc
            .compare_cities(Some(names(&["basel", "zurich", "brugg"])))
            .await
            .expect_err("no city succeeds");
        match err {
            Error::AllFailed { requested, sample } => {
                assert_eq!(requested, 3);
                assert_eq!(sample.len(), 3);
                assert!(sample[0].starts_with("basel: "));
            }
            other => panic!("expected AllFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_compare_empty_request_is_empty_result() {
        let svc = service();
        let cmp = svc.compare_cities(Some(Vec::new())).await.expect("empty ok");
        assert!(cmp.cities.is_empty());
        assert!(cmp.warmest.is_none());
        assert!(cmp.errors.is_none());
        assert_eq!(cmp.requested_count, 0);
        assert_eq!(dispatches(&svc), 0);
    }

    #[tokio::test]
    async fn test_compare_all_cities_uses_city_list() {
        let svc = service();
        let cmp = svc.compare_cities(None).await.expect("list comparison");
        assert_eq!(cmp.requested_count, 4);
        assert_eq!(cmp.total_count, 3);

        // Second comparison is served from cache.
        let before = dispatches(&svc);
        svc.compare_cities(None).await.expect("cached comparison");
        assert_eq!(dispatches(&svc), before);
        assert_eq!(svc.metrics().cache_hits, 5);
    }

    #[tokio::test]
    async fn test_bounded_compare_matches_unbounded() {
        let mut settings = Settings::unthrottled();
        settings.fanout.concurrency = Some(1);
        let svc = service_with(&settings);

        let cmp = svc
            .compare_cities(Some(names(&["olten", "thun", "bern"])))
            .await
            .expect("all succeed");
        let ranked: Vec<&str> = cmp.cities.iter().map(|c| c.city.as_str()).collect();
        assert_eq!(ranked, vec!["thun", "bern", "olten"]);
    }

    #[tokio::test]
    async fn test_forecasts_compute_trend() {
        let svc = service();
        let report = svc
            .forecasts(&names(&["bern", "basel", "thun", "olten"]))
            .await
            .expect("partial success");

        assert_eq!(report.success_count, 3);
        assert_eq!(report.requested_count, 4);
        let bern = &report.forecasts[0];
        assert_eq!(bern.city, "bern");
        assert_eq!(bern.trend, Trend::Rising);
        assert!((bern.change.expect("both values") - 0.5).abs() < 1e-9);
        assert_eq!(report.forecasts[1].trend, Trend::Falling);
        assert_eq!(report.forecasts[2].trend, Trend::Stable);
        assert_eq!(report.errors.map(|e| e.len()), Some(1));
    }

    #[tokio::test]
    async fn test_forecasts_all_failed() {
        let svc = service();
        let err = svc
            .forecasts(&names(&["brugg"]))
            .await
            .expect_err("brugg has no river block");
        assert!(matches!(err, Error::AllFailed { requested: 1, .. }));
    }

    #[tokio::test]
    async fn test_current_temperature_enriches() {
        let svc = service();
        let report = svc.current_temperature("bern").await.expect("bern");

        assert_eq!(report.temperature, Some(17.0));
        assert_eq!(report.name.as_deref(), Some("Bärn"));
        assert_eq!(report.temperature_prec, Some(17.0));
        assert_eq!(
            report.swiss_german_explanation.as_deref(),
            Some("Awesome but a bit cold (typical Bernese understatement)")
        );
        assert!(report.warning.is_none());
        assert_eq!(
            report.suggestion.as_deref(),
            Some("💡 Tip: Thun is warmer right now (19.5°C)")
        );
        assert!(!report.seasonal_advice.is_empty());
    }

    #[tokio::test]
    async fn test_current_temperature_falls_back_to_today() {
        let svc = service();
        let report = svc.current_temperature("brugg").await.expect("brugg via today");

        assert_eq!(report.temperature, Some(14.2));
        assert_eq!(report.temperature_prec, Some(14.23));
        assert_eq!(report.swiss_german_explanation.as_deref(), Some("Freezing cold"));
        assert_eq!(report.longname.as_deref(), Some("Brugg, Aare"));
        assert!(report.suggestion.is_some());
    }

    #[tokio::test]
    async fn test_warm_city_gets_no_suggestion() {
        let svc = service();
        let report = svc.current_temperature("thun").await.expect("thun");
        assert!(report.suggestion.is_none());
    }

    #[tokio::test]
    async fn test_flow_danger_uses_city_threshold() {
        let svc = service();
        let olten = svc.flow_danger_level("olten").await.expect("olten");
        assert_eq!(olten.flow_threshold, Some(200.0));
        assert_eq!(olten.danger_level, 4);
        assert_eq!(olten.safety_assessment, "High - dangerous conditions");

        let bern = svc.flow_danger_level("bern").await.expect("bern");
        assert_eq!(bern.flow_threshold, Some(DEFAULT_FLOW_THRESHOLD));
        assert_eq!(bern.danger_level, 1);

        let brugg = svc.flow_danger_level("brugg").await.expect("brugg");
        assert_eq!(brugg.danger_level, 0);
        assert_eq!(brugg.safety_assessment, "No data available");
    }

    #[tokio::test]
    async fn test_current_conditions_carries_weather() {
        let svc = service();
        let report = svc.current_conditions("olten").await.expect("olten");
        let aare = report.aare.expect("river block");
        assert!(aare.warning.expect("320 m³/s").contains("DANGER"));
        assert!(report.weather.is_some());
        assert_eq!(report.forecast.map(|f| f.len()), Some(1));

        let json = serde_json::to_value(svc.current_conditions("bern").await.expect("bern"))
            .expect("serializable");
        assert!(json.get("weather").is_none());
    }

    #[tokio::test]
    async fn test_conditions_warning_uses_default_threshold() {
        let svc = service();
        // 210 m³/s is above the city's own scale threshold but below 220.
        let report = svc.current_conditions("aarburg").await.expect("aarburg");
        assert!(report.aare.expect("river block").warning.is_none());

        let flow = svc.flow_danger_level("aarburg").await.expect("aarburg");
        assert_eq!(flow.flow_threshold, Some(200.0));
        assert_eq!(flow.danger_level, 3);
    }

    #[tokio::test]
    async fn test_suggestion_keeps_one_decimal() {
        let cities = r#"[
            {"city": "bern", "name": "Bärn", "longname": "Bern", "aare": 16.0},
            {"city": "thun", "name": "Thun", "longname": "Thun", "aare": 20.0}
        ]"#;
        let upstream = ScriptedUpstream::new(move |endpoint, _| {
            let body = if endpoint == CITIES_PATH {
                cities
            } else {
                r#"{"aare": {"location": "Bärn", "temperature": 16.0, "flow": 80.0}}"#
            };
            Ok(body.as_bytes().to_vec())
        });
        let settings = Settings::unthrottled();
        let svc = AareguruService::new(AareguruClient::with_upstream(upstream, &settings), &settings);

        let report = svc.current_temperature("bern").await.expect("bern");
        assert_eq!(
            report.suggestion.as_deref(),
            Some("💡 Tip: Thun is warmer right now (20.0°C)")
        );
    }

    #[tokio::test]
    async fn test_unknown_city_propagates_transport_error() {
        let svc = service();
        let err = svc.current_conditions("basel").await.expect_err("404");
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_historical_data_is_never_cached() {
        let svc = AareguruService::new(
            AareguruClient::with_upstream(
                ScriptedUpstream::fixed(r#"{"status": "success", "data": {"temperature": []}}"#),
                &Settings::unthrottled(),
            ),
            &Settings::unthrottled(),
        );
        for _ in 0..2 {
            let history = svc
                .historical_data("bern", "-3 days", "now")
                .await
                .expect("history");
            assert_eq!(history["status"], "success");
        }
        assert_eq!(svc.client().fetch_client().upstream().calls(), 2);
    }

    #[tokio::test]
    async fn test_cities_list_and_close() {
        let svc = service();
        let cities = svc.cities_list().await.expect("cities");
        assert_eq!(cities.len(), 4);
        let closed = svc.close();
        assert_eq!(closed.dispatches, 1);
    }
}
