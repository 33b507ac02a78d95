use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use reward_router::config::AppConfig;
use reward_router::rewards::JsonFileStore;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn file_store(config: &AppConfig) -> Arc<JsonFileStore> {
    Arc::new(JsonFileStore::new(config.storage.data_dir.clone()))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Accepts plain numbers and grouped input such as `1,50,000`.
pub(crate) fn parse_amount(raw: &str) -> Result<f64, String> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('₹')
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    cleaned
        .parse::<f64>()
        .map_err(|_| format!("'{raw}' is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grouped_amounts() {
        assert_eq!(parse_amount("1,50,000"), Ok(150_000.0));
        assert_eq!(parse_amount("₹60000.50"), Ok(60_000.5));
        assert!(parse_amount("lots").is_err());
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(
            parse_date(" 2026-06-15 "),
            Ok(NaiveDate::from_ymd_opt(2026, 6, 15).expect("valid"))
        );
        assert!(parse_date("15/06/2026").is_err());
    }
}
