use super::{MetricsError, Series};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Anything that can hand back a range of samples for a query.
#[async_trait::async_trait]
pub trait MetricSource: Send + Sync {
    /// Fetch `[start_ts, end_ts]` (Unix seconds) at resolution `step`
    /// (e.g. `"30s"`). An empty result is an empty series named after
    /// the query, not an error.
    async fn fetch_range(
        &self,
        query: &str,
        start_ts: f64,
        end_ts: f64,
        step: &str,
    ) -> Result<Series, MetricsError>;
}

/// Prometheus HTTP API client for `/api/v1/query_range`.
#[derive(Debug, Clone)]
pub struct PrometheusSource {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct QueryRangeResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryRangeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryRangeData {
    #[serde(default)]
    result: Vec<RangeResult>,
}

#[derive(Debug, Deserialize)]
struct RangeResult {
    #[serde(default)]
    values: Vec<(f64, String)>,
}

impl PrometheusSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MetricsError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Convert a decoded `query_range` body into a [`Series`], taking the first
/// returned series.
fn series_from_response(query: &str, body: QueryRangeResponse) -> Result<Series, MetricsError> {
    if body.status != "success" {
        return Err(MetricsError::Api {
            status: body.status,
            message: body.error.unwrap_or_default(),
        });
    }

    let Some(first) = body.data.and_then(|d| d.result.into_iter().next()) else {
        warn!(%query, "query returned no series");
        return Ok(Series::empty(query));
    };

    let mut timestamps = Vec::with_capacity(first.values.len());
    let mut values = Vec::with_capacity(first.values.len());
    for (ts, raw) in first.values {
        let v: f64 = raw
            .parse()
            .map_err(|_| MetricsError::Decode(format!("non-numeric sample {raw:?} at {ts}")))?;
        timestamps.push(ts);
        values.push(v);
    }

    Series::new(query, timestamps, values)
}

#[async_trait::async_trait]
impl MetricSource for PrometheusSource {
    async fn fetch_range(
        &self,
        query: &str,
        start_ts: f64,
        end_ts: f64,
        step: &str,
    ) -> Result<Series, MetricsError> {
        let url = format!("{}/api/v1/query_range", self.base_url);
        debug!(%url, %query, start_ts, end_ts, %step, "fetching range");

        let body: QueryRangeResponse = self
            .client
            .get(&url)
            .query(&[
                ("query", query.to_string()),
                ("start", start_ts.to_string()),
                ("end", end_ts.to_string()),
                ("step", step.to_string()),
            ])
            .send()
            .await?
            .json()
            .await?;

        let series = series_from_response(query, body)?;
        debug!(%query, points = series.len(), "range fetched");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> QueryRangeResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_first_series_is_used() {
        let body = decode(
            r#"{"status":"success","data":{"resultType":"matrix","result":[
                {"metric":{"job":"a"},"values":[[100,"0.5"],[130,"0.75"]]},
                {"metric":{"job":"b"},"values":[[100,"9"]]}
            ]}}"#,
        );
        let s = series_from_response("rate(x[5m])", body).unwrap();
        assert_eq!(s.name(), "rate(x[5m])");
        assert_eq!(s.timestamps(), &[100.0, 130.0]);
        assert_eq!(s.values(), &[0.5, 0.75]);
    }

    #[test]
    fn test_empty_result_is_empty_series() {
        let body = decode(r#"{"status":"success","data":{"resultType":"matrix","result":[]}}"#);
        let s = series_from_response("up", body).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.name(), "up");
    }

    #[test]
    fn test_error_status() {
        let body = decode(r#"{"status":"error","errorType":"bad_data","error":"parse error"}"#);
        let err = series_from_response("up{", body).unwrap_err();
        assert!(matches!(err, MetricsError::Api { ref message, .. } if message == "parse error"));
    }

    #[test]
    fn test_bad_sample() {
        let body = decode(r#"{"status":"success","data":{"result":[{"values":[[1,"abc"]]}]}}"#);
        assert!(matches!(
            series_from_response("up", body),
            Err(MetricsError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_source_is_transport_error() {
        let source = PrometheusSource::new("http://127.0.0.1:1/", Duration::from_millis(200)).unwrap();
        assert_eq!(source.base_url(), "http://127.0.0.1:1");
        let err = source.fetch_range("up", 0.0, 60.0, "15s").await.unwrap_err();
        assert!(matches!(err, MetricsError::Transport(_)));
    }
}
