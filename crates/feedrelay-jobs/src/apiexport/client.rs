//! Paginated REST API client
//!
//! The upstream API pages with `startDate`/`limit`/`offset` query parameters
//! and wraps every payload as `{resources: {data: [...], meta: {total}}}`.
//! Records are free-form JSON objects; the export headers are discovered
//! dynamically from the widest record the recon page returns, so new upstream
//! fields appear in the export without a code change.

use feedrelay_common::{FeedError, Result};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Bearer-token client for one partner's export endpoint
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: String,
    record_limit: u32,
}

/// Outcome of the recon call
#[derive(Debug, Clone)]
pub struct ReconReport {
    /// Records in scope for the start date
    pub total: i64,

    /// Full pages beyond the first; the page loop runs `0..=pages_remaining`
    pub pages_remaining: u32,

    /// Export header row, widest record first seen wins
    pub headers: Vec<String>,
}

impl ApiClient {
    pub fn new(base_url: String, auth_token: String, record_limit: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            auth_token,
            record_limit,
        }
    }

    /// Count the records in scope and discover the export headers
    pub async fn recon(&self, start_date: &str) -> Result<ReconReport> {
        let query = format!("startDate={}&limit={}", start_date, self.record_limit);
        info!("Running recon on {}?{}", self.base_url, query);

        let payload = self.get_json(&query).await?;
        let records = extract_records(&payload)?;

        if records.is_empty() {
            return Ok(ReconReport {
                total: 0,
                pages_remaining: 0,
                headers: Vec::new(),
            });
        }

        let total = payload
            .pointer("/resources/meta/total")
            .and_then(Value::as_i64)
            .ok_or_else(|| FeedError::parse("response missing resources.meta.total"))?;
        let pages_remaining = (total / i64::from(self.record_limit)) as u32;
        let headers = widest_headers(&records);

        info!(total, pages_remaining, "Recon complete");
        Ok(ReconReport {
            total,
            pages_remaining,
            headers,
        })
    }

    /// Pull one page of records
    pub async fn fetch_page(&self, start_date: &str, page: u32) -> Result<Vec<Map<String, Value>>> {
        let offset = page * self.record_limit;
        let query = format!(
            "startDate={}&limit={}&offset={}",
            start_date, self.record_limit, offset
        );
        debug!("Pulling page {} -> {}?{}", page, self.base_url, query);

        let payload = self.get_json(&query).await?;
        extract_records(&payload)
    }

    async fn get_json(&self, query: &str) -> Result<Value> {
        let url = format!("{}?{}", self.base_url, query);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(FeedError::network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::network(format!(
                "unexpected status {}: {}",
                status, body
            )));
        }

        response.json().await.map_err(FeedError::network)
    }
}

/// Pull the record array out of the response envelope
///
/// Zero-result payloads ship an empty `resources`; those map to an empty
/// vector, not an error.
fn extract_records(payload: &Value) -> Result<Vec<Map<String, Value>>> {
    let resources = payload
        .get("resources")
        .ok_or_else(|| FeedError::parse("response missing resources"))?;

    let Some(data) = resources.get("data").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    data.iter()
        .map(|record| {
            record
                .as_object()
                .cloned()
                .ok_or_else(|| FeedError::parse("record is not a JSON object"))
        })
        .collect()
}

/// Header row of the record with the most fields; the first widest wins,
/// in that record's own key order
pub fn widest_headers(records: &[Map<String, Value>]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for record in records {
        if record.len() > headers.len() {
            headers = record.keys().cloned().collect();
        }
    }
    headers
}

/// Replace embedded line feeds in string values with spaces
pub fn sanitize_record(record: &mut Map<String, Value>) {
    for value in record.values_mut() {
        if let Value::String(s) = value {
            if s.contains('\n') || s.contains('\r') {
                *s = s.replace(['\n', '\r'], " ");
            }
        }
    }
}

/// One export row, header-aligned; missing fields render empty
pub fn row_for(record: &Map<String, Value>, headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|header| match record.get(header) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(json: Value) -> Map<String, Value> {
        json.as_object().unwrap().clone()
    }

    #[test]
    fn test_widest_headers_first_widest_wins() {
        let records = vec![
            record(json!({"id": 1, "email": "a@x.edu"})),
            record(json!({"id": 2, "email": "b@x.edu", "phone": "555"})),
            record(json!({"id": 3, "name": "c", "city": "d"})),
        ];
        assert_eq!(widest_headers(&records), vec!["id", "email", "phone"]);
    }

    #[test]
    fn test_sanitize_record_replaces_line_feeds() {
        let mut r = record(json!({"street": "12 Main St\napt 4", "city": "Troy\r"}));
        sanitize_record(&mut r);
        assert_eq!(r["street"], "12 Main St apt 4");
        assert_eq!(r["city"], "Troy ");
    }

    #[test]
    fn test_row_for_aligns_to_headers() {
        let headers = vec!["id".to_string(), "email".to_string(), "phone".to_string()];
        let r = record(json!({"email": "a@x.edu", "id": 7, "extra": "dropped"}));
        assert_eq!(row_for(&r, &headers), vec!["7", "a@x.edu", ""]);
    }

    #[test]
    fn test_extract_records_tolerates_empty_resources() {
        let payload = json!({"resources": {}});
        assert!(extract_records(&payload).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recon_computes_page_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(bearer_token("token-1"))
            .and(query_param("startDate", "2024-01-01"))
            .and(query_param("limit", "500"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resources": {
                    "data": [{"id": 1, "creation_time": "2024-01-02 10:00:00"}],
                    "meta": {"total": 1250}
                }
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), "token-1".to_string(), 500);
        let report = client.recon("2024-01-01").await.unwrap();

        assert_eq!(report.total, 1250);
        assert_eq!(report.pages_remaining, 2);
        assert_eq!(report.headers, vec!["id", "creation_time"]);
    }

    #[tokio::test]
    async fn test_recon_zero_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"resources": {"data": []}})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), "t".to_string(), 500);
        let report = client.recon("2024-01-01").await.unwrap();
        assert_eq!(report.total, 0);
        assert!(report.headers.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_page_passes_offset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("offset", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resources": {"data": [{"id": 9}], "meta": {"total": 1250}}
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), "t".to_string(), 500);
        let records = client.fetch_page("2024-01-01", 2).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], 9);
    }

    #[tokio::test]
    async fn test_unexpected_status_is_a_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), "t".to_string(), 500);
        let err = client.recon("2024-01-01").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
