//! Aare river operations built on the caching client: concurrent multi-city
//! fan-out, safety and phrase enrichment, and session bookkeeping for push
//! connections.

pub mod fanout;
pub mod helpers;
pub mod service;
pub mod session;

pub use fanout::{fan_out, fan_out_bounded, AggregateResult, FetchOutcome, Outcome};
pub use helpers::Trend;
pub use service::{
    AareConditions, AareguruService, CityComparison, CityError, CityForecast, CitySnapshot,
    ConditionsReport, FlowDangerReport, ForecastReport, TemperatureReport,
};
pub use session::SessionTracker;
