//! JSON API handlers for the web dashboard.
//!
//! Each handler corresponds to an API endpoint and returns an
//! [`HttpResponse`] with JSON content. Handler errors are mapped to status
//! codes by [`error_response`].

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiny_http::{Response, StatusCode};

use crate::activity::reporter;
use crate::config;
use crate::dashboard::{self, Section};
use crate::engine::{self, Dimension, Metric};
use crate::error::EngineError;
use crate::store::cache::DatasetStatus;

use super::{HttpResponse, ServerState, content_type_json, header};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A request the client got wrong: missing or malformed parameters.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BadRequest(pub String);

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: String,
    /// Missing or sparse data rather than a broken file or request.
    data_gap: bool,
}

/// Status code and body for a failed handler.
///
/// - bad parameters and unsupported comparisons → 400
/// - every other engine error → 422, flagged when it is a data gap
/// - anything else → 500
fn classify(err: &anyhow::Error) -> (u16, ErrorBody) {
    if let Some(bad) = err.downcast_ref::<BadRequest>() {
        return (
            400,
            ErrorBody {
                error: bad.0.clone(),
                kind: "bad_request".to_string(),
                data_gap: false,
            },
        );
    }

    if let Some(engine) = err.downcast_ref::<EngineError>() {
        let status = match engine {
            EngineError::UnsupportedCombination { .. } => 400,
            _ => 422,
        };
        let error = match engine {
            EngineError::UnsupportedCombination { .. } => {
                "No data available for the selected combination".to_string()
            }
            other => other.to_string(),
        };
        return (
            status,
            ErrorBody {
                error,
                kind: engine.kind().to_string(),
                data_gap: engine.is_data_gap(),
            },
        );
    }

    (
        500,
        ErrorBody {
            error: format!("{err:#}"),
            kind: "internal".to_string(),
            data_gap: false,
        },
    )
}

pub fn error_response(err: &anyhow::Error) -> HttpResponse {
    let (status, body) = classify(err);
    let body = serde_json::to_string(&body).unwrap_or_else(|_| r#"{"error":"internal"}"#.into());
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status))
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Selector contents for the comparison tool.
#[derive(Serialize)]
struct OptionsResponse {
    dimensions: Vec<DimensionOption>,
    default_start_year: i32,
    sections: Vec<SectionOption>,
}

#[derive(Serialize)]
struct DimensionOption {
    value: Dimension,
    label: &'static str,
    metrics: Vec<MetricOption>,
}

#[derive(Serialize)]
struct MetricOption {
    value: Metric,
    label: &'static str,
}

#[derive(Serialize)]
struct SectionOption {
    value: &'static str,
    label: &'static str,
}

/// Config API response: the full config as a JSON value + the raw TOML.
#[derive(Serialize)]
struct ConfigResponse {
    config: config::HorizonConfig,
    toml_text: String,
}

/// Config update request: a list of key-value pairs.
#[derive(Deserialize)]
struct ConfigUpdateRequest {
    updates: Vec<ConfigKeyValue>,
}

#[derive(Deserialize)]
struct ConfigKeyValue {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct HealthResponse {
    data_dir: String,
    data_dir_exists: bool,
    datasets_loaded: usize,
    datasets_total: usize,
    config_exists: bool,
    log_enabled: bool,
    log_entries: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<HttpResponse> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

fn csv_response(body: String, filename: &str) -> HttpResponse {
    Response::from_data(body.into_bytes())
        .with_header(header("Content-Type", "text/csv; charset=utf-8"))
        .with_header(header(
            "Content-Disposition",
            &format!("attachment; filename=\"{filename}\""),
        ))
        .with_status_code(StatusCode(200))
}

/// Decode `+` and `%XX` escapes in a query component.
fn decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(b) => {
                        out.push(b);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Value of query parameter `key`, if present and non-empty.
fn query_param(url: &str, key: &str) -> Option<String> {
    url.split('?').nth(1)?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        let v = decode(v);
        if k == key && !v.is_empty() { Some(v) } else { None }
    })
}

fn required_param(url: &str, key: &str) -> Result<String> {
    query_param(url, key)
        .ok_or_else(|| BadRequest(format!("missing query parameter '{key}'")).into())
}

/// Integer query parameter. Present but unparsable is a bad request.
fn int_param<T: std::str::FromStr>(url: &str, key: &str) -> Result<Option<T>> {
    match query_param(url, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| BadRequest(format!("'{key}' must be a number, got '{raw}'")).into()),
    }
}

// ---------------------------------------------------------------------------
// Dashboard handlers
// ---------------------------------------------------------------------------

/// `GET /api/sections`: overview with spotlight and section blurbs.
pub fn get_sections() -> Result<HttpResponse> {
    json_response(&dashboard::overview(Local::now().date_naive()))
}

/// `GET /api/kpis?section=investment`: KPI panel of one section.
pub fn get_kpis(state: &mut ServerState, url: &str) -> Result<HttpResponse> {
    let raw = required_param(url, "section")?;
    let section =
        Section::parse(&raw).ok_or_else(|| BadRequest(format!("unknown section '{raw}'")))?;

    let report = state.log.track("kpis", section.slug(), "web", || {
        Ok(dashboard::section_report(section, &mut state.cache, &state.config))
    })?;

    json_response(&report)
}

/// `GET /api/options`: dimensions with their valid metrics.
pub fn get_options(state: &ServerState) -> Result<HttpResponse> {
    let resp = OptionsResponse {
        dimensions: Dimension::ALL
            .iter()
            .map(|&d| DimensionOption {
                value: d,
                label: d.label(),
                metrics: engine::metrics_for(d)
                    .into_iter()
                    .map(|m| MetricOption {
                        value: m,
                        label: m.label(),
                    })
                    .collect(),
            })
            .collect(),
        default_start_year: state.config.comparison.default_start_year,
        sections: Section::ALL
            .iter()
            .map(|s| SectionOption {
                value: s.slug(),
                label: s.title(),
            })
            .collect(),
    };

    json_response(&resp)
}

/// `GET /api/compare?dimension=&metric=&from=&to=[&format=csv]`
///
/// `from` defaults to the configured start year, `to` to the latest year in
/// the selected data.
pub fn get_compare(state: &mut ServerState, url: &str) -> Result<HttpResponse> {
    let raw_dimension = required_param(url, "dimension")?;
    let raw_metric = required_param(url, "metric")?;
    let dimension = Dimension::parse(&raw_dimension)
        .ok_or_else(|| BadRequest(format!("unknown dimension '{raw_dimension}'")))?;
    let metric = Metric::parse(&raw_metric)
        .ok_or_else(|| BadRequest(format!("unknown metric '{raw_metric}'")))?;
    let from: Option<i32> = int_param(url, "from")?;
    let to: Option<i32> = int_param(url, "to")?;

    let default_start = state.config.comparison.default_start_year;
    let detail = format!("{dimension}/{metric}");
    let cache = &mut state.cache;

    let result = state.log.track("compare", &detail, "web", || {
        let range = match to {
            Some(end) => (from.unwrap_or(default_start), end),
            None => engine::default_year_range(cache, dimension, metric, from, default_start)?,
        };
        engine::compare(cache, dimension, metric, range)
    })?;

    if query_param(url, "format").as_deref() == Some("csv") {
        let filename = format!("compare_{dimension}_{metric}.csv");
        return Ok(csv_response(result.to_csv()?, &filename));
    }

    json_response(&result)
}

/// `GET /api/concentration`: HHI per year over the configured regions.
pub fn get_concentration(state: &mut ServerState) -> Result<HttpResponse> {
    let detail = state.config.concentration.regions.join(",");
    let scores = state.log.track("concentration", &detail, "web", || {
        dashboard::investment_concentration(&mut state.cache, &state.config)
    })?;
    json_response(&scores)
}

/// `GET /api/volatility`: investment volatility per focus area.
pub fn get_volatility(state: &mut ServerState) -> Result<HttpResponse> {
    let scores = state
        .log
        .track("volatility", "investment_by_sector", "web", || {
            dashboard::sector_volatility(&mut state.cache)
        })?;
    json_response(&scores)
}

/// `GET /api/datasets`: catalog and load status.
pub fn get_datasets(state: &mut ServerState) -> Result<HttpResponse> {
    let statuses: Vec<DatasetStatus> = state.cache.status();
    json_response(&statuses)
}

/// `GET /api/activity?days=N`: activity log summary.
pub fn get_activity(state: &ServerState, url: &str) -> Result<HttpResponse> {
    let days: Option<u32> = int_param(url, "days")?;
    let entries = state.log.read_since_days(days);
    json_response(&serde_json::json!({
        "stats": reporter::build_stats(&entries),
        "trend": reporter::daily_trend(&entries),
    }))
}

// ---------------------------------------------------------------------------
// Config handlers
// ---------------------------------------------------------------------------

/// `GET /api/config`: current effective configuration.
pub fn get_config(state: &ServerState) -> Result<HttpResponse> {
    let toml_text = toml::to_string_pretty(&state.config).unwrap_or_default();

    let resp = ConfigResponse {
        config: state.config.clone(),
        toml_text,
    };

    json_response(&resp)
}

/// `PUT /api/config`: update configuration keys.
///
/// Expects JSON body: `{ "updates": [{ "key": "data.dir", "value": "/srv/data" }] }`
pub fn put_config(body: &str) -> Result<HttpResponse> {
    let req: ConfigUpdateRequest = serde_json::from_str(body)
        .map_err(|e| BadRequest(format!("invalid JSON in config update request: {e}")))?;

    let mut errors: Vec<String> = Vec::new();
    let mut applied: Vec<String> = Vec::new();

    for kv in &req.updates {
        match config::set_config_value(&kv.key, &kv.value) {
            Ok(()) => applied.push(format!("{} = {}", kv.key, kv.value)),
            Err(e) => errors.push(format!("{}: {:#}", kv.key, e)),
        }
    }

    let result = serde_json::json!({
        "applied": applied,
        "errors": errors,
        "success": errors.is_empty(),
    });

    json_response(&result)
}

/// `POST /api/config/reset`: reset config to defaults.
pub fn post_config_reset() -> Result<HttpResponse> {
    config::reset_config().context("failed to reset config")?;

    let result = serde_json::json!({
        "success": true,
        "message": "Configuration reset to defaults",
    });

    json_response(&result)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// `GET /api/health`: data directory, datasets, config and log summary.
pub fn get_health(state: &mut ServerState) -> Result<HttpResponse> {
    let statuses = state.cache.status();
    let data_dir = state.cache.dir().to_path_buf();

    let resp = HealthResponse {
        data_dir: data_dir.display().to_string(),
        data_dir_exists: data_dir.is_dir(),
        datasets_loaded: statuses.iter().filter(|s| s.error.is_none()).count(),
        datasets_total: statuses.len(),
        config_exists: config::global_config_file().is_some_and(|p| p.exists()),
        log_enabled: state.log.path().is_some(),
        log_entries: state.log.read_all().len(),
    };

    json_response(&resp)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_extracts_and_decodes() {
        assert_eq!(
            query_param("/api/compare?dimension=org-type&metric=training-cost", "metric"),
            Some("training-cost".to_string())
        );
        assert_eq!(
            query_param("/api/kpis?section=Public+View", "section"),
            Some("Public View".to_string())
        );
        assert_eq!(
            query_param("/api/kpis?section=public%20view", "section"),
            Some("public view".to_string())
        );
        assert_eq!(query_param("/api/kpis?section=", "section"), None);
        assert_eq!(query_param("/api/kpis", "section"), None);
    }

    #[test]
    fn decode_keeps_malformed_escapes() {
        assert_eq!(decode("100%"), "100%");
        assert_eq!(decode("a%zzb"), "a%zzb");
    }

    #[test]
    fn int_param_rejects_garbage() {
        assert_eq!(int_param::<i32>("/x?from=2019", "from").unwrap(), Some(2019));
        assert_eq!(int_param::<i32>("/x", "from").unwrap(), None);
        let err = int_param::<i32>("/x?from=soon", "from").unwrap_err();
        assert_eq!(classify(&err).0, 400);
    }

    #[test]
    fn engine_errors_map_to_status_codes() {
        let unsupported: anyhow::Error = EngineError::UnsupportedCombination {
            dimension: "country".into(),
            metric: "parameters".into(),
        }
        .into();
        let (status, body) = classify(&unsupported);
        assert_eq!(status, 400);
        assert_eq!(body.error, "No data available for the selected combination");
        assert_eq!(body.kind, "unsupported_combination");

        assert!(!body.data_gap);

        let gap: anyhow::Error = EngineError::MissingYear { year: 2022 }.into();
        let (status, body) = classify(&gap);
        assert_eq!(status, 422);
        assert!(body.data_gap);

        let broken: anyhow::Error = EngineError::schema("amount_usd", "field not present").into();
        let (status, body) = classify(&broken);
        assert_eq!(status, 422);
        assert!(!body.data_gap);

        let other = anyhow::anyhow!("disk on fire");
        let (status, body) = classify(&other);
        assert_eq!(status, 500);
        assert_eq!(body.kind, "internal");
    }

    #[test]
    fn config_update_request_deserializes() {
        let json = r#"{"updates": [{"key": "data.dir", "value": "/srv/data"}]}"#;
        let req: ConfigUpdateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.updates.len(), 1);
        assert_eq!(req.updates[0].key, "data.dir");
        assert_eq!(req.updates[0].value, "/srv/data");
    }

    #[test]
    fn malformed_config_update_is_bad_request() {
        match put_config("{not json") {
            Ok(_) => panic!("malformed body must be rejected"),
            Err(err) => assert_eq!(classify(&err).0, 400),
        }
    }
}
