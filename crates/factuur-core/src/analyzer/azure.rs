//! Azure AI Document Intelligence REST backend.
//!
//! Analysis is a long-running operation: the initial `POST …:analyze` answers
//! `202 Accepted` with an `Operation-Location` header, which is polled until the
//! operation reaches a terminal status. Only the fields the normalizer reads
//! are decoded from the wire format.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use serde::Deserialize;

use super::DocumentAnalyzer;
use crate::{AnalyzeError, AnalyzeResult, AnalyzedDocument, FieldValue};

const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION: &str = "operation-location";

/// Poll interval used when the service sends no `Retry-After`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct AzureAnalyzer {
    endpoint: String,
    api_key: String,
    model_id: String,
    api_version: String,
    client: reqwest::Client,
    poll_interval: Duration,
}

impl AzureAnalyzer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model_id: impl Into<String>,
        api_version: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model_id: model_id.into(),
            api_version: api_version.into(),
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/documentintelligence/documentModels/{}:analyze?api-version={}",
            self.endpoint, self.model_id, self.api_version
        )
    }

    async fn run(
        &self,
        document: &[u8],
        content_type: &str,
    ) -> Result<AnalyzeResult, AnalyzeError> {
        let resp = self
            .client
            .post(self.analyze_url())
            .header(KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, content_type)
            .body(document.to_vec())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnalyzeError::Status { status, body });
        }

        let operation_url = resp
            .headers()
            .get(OPERATION_LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(AnalyzeError::MissingOperationLocation)?;
        let mut delay = retry_after(resp.headers()).unwrap_or(self.poll_interval);

        loop {
            tokio::time::sleep(delay).await;

            let resp = self
                .client
                .get(&operation_url)
                .header(KEY_HEADER, &self.api_key)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(AnalyzeError::Status { status, body });
            }
            delay = retry_after(resp.headers()).unwrap_or(self.poll_interval);

            let operation: Operation = resp.json().await?;
            match operation.status.as_str() {
                "succeeded" => {
                    return Ok(operation.analyze_result.unwrap_or_default().into());
                }
                "failed" | "canceled" => {
                    let message = operation
                        .error
                        .map(|e| e.describe())
                        .unwrap_or_else(|| format!("operation {}", operation.status));
                    return Err(AnalyzeError::Failed(message));
                }
                other => {
                    tracing::debug!(status = other, delay_ms = delay.as_millis() as u64, "analysis pending");
                }
            }
        }
    }
}

impl DocumentAnalyzer for AzureAnalyzer {
    fn name(&self) -> &str {
        "Azure Document Intelligence"
    }

    fn analyze<'a>(
        &'a self,
        document: &'a [u8],
        content_type: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AnalyzeResult, AnalyzeError>> + Send + 'a>> {
        Box::pin(self.run(document, content_type))
    }
}

/// `Retry-After` in whole seconds, if present and sane.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

// ── Wire format ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    status: String,
    #[serde(default)]
    analyze_result: Option<WireAnalyzeResult>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl WireError {
    fn describe(self) -> String {
        match (self.code, self.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message,
            (Some(code), None) => code,
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WireAnalyzeResult {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    documents: Vec<WireDocument>,
}

#[derive(Debug, Default, Deserialize)]
struct WireDocument {
    #[serde(default)]
    fields: HashMap<String, WireField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireField {
    value_string: Option<String>,
    value_date: Option<String>,
    value_phone_number: Option<String>,
    value_number: Option<f64>,
    value_integer: Option<i64>,
    value_currency: Option<WireCurrency>,
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireCurrency {
    amount: Option<f64>,
}

impl WireField {
    fn resolved(&self) -> Option<String> {
        self.value_string
            .clone()
            .or_else(|| self.value_date.clone())
            .or_else(|| {
                self.value_currency
                    .as_ref()
                    .and_then(|c| c.amount)
                    .map(|a| format!("{a:.2}"))
            })
            .or_else(|| self.value_number.map(|n| n.to_string()))
            .or_else(|| self.value_integer.map(|n| n.to_string()))
            .or_else(|| self.value_phone_number.clone())
    }
}

impl From<WireField> for FieldValue {
    fn from(field: WireField) -> Self {
        FieldValue::from_parts(field.resolved(), field.content)
    }
}

impl From<WireAnalyzeResult> for AnalyzeResult {
    fn from(wire: WireAnalyzeResult) -> Self {
        AnalyzeResult {
            content: wire.content.unwrap_or_default(),
            documents: wire
                .documents
                .into_iter()
                .map(|doc| AnalyzedDocument {
                    fields: doc
                        .fields
                        .into_iter()
                        .map(|(name, field)| (name, field.into()))
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};

    fn decode(json: &str) -> AnalyzeResult {
        let op: Operation = serde_json::from_str(json).unwrap();
        op.analyze_result.unwrap_or_default().into()
    }

    #[test]
    fn analyze_url_strips_trailing_slash() {
        let analyzer = AzureAnalyzer::new(
            "https://example.cognitiveservices.azure.com/",
            "key",
            "prebuilt-invoice",
            "2024-11-30",
            reqwest::Client::new(),
        );
        assert_eq!(
            analyzer.analyze_url(),
            "https://example.cognitiveservices.azure.com/documentintelligence/documentModels/prebuilt-invoice:analyze?api-version=2024-11-30"
        );
    }

    #[test]
    fn decodes_typed_values() {
        let result = decode(
            r#"{
              "status": "succeeded",
              "analyzeResult": {
                "content": "ACME B.V.\nKvK: 12345678",
                "documents": [{
                  "docType": "invoice",
                  "fields": {
                    "VendorName": {"type": "string", "valueString": "ACME B.V.", "content": "ACME B.V."},
                    "InvoiceDate": {"type": "date", "valueDate": "2024-03-01", "content": "1 maart 2024"},
                    "InvoiceTotal": {"type": "currency", "valueCurrency": {"amount": 121.0, "currencyCode": "EUR"}, "content": "€ 121,00"},
                    "TotalTax": {"type": "currency", "content": "€ 21,00"},
                    "VendorTaxId": {"type": "string"}
                  }
                }]
              }
            }"#,
        );

        assert_eq!(result.content, "ACME B.V.\nKvK: 12345678");
        let doc = &result.documents[0];
        assert_eq!(doc.field("VendorName"), &FieldValue::Resolved("ACME B.V.".into()));
        assert_eq!(doc.field("InvoiceDate"), &FieldValue::Resolved("2024-03-01".into()));
        assert_eq!(doc.field("InvoiceTotal"), &FieldValue::Resolved("121.00".into()));
        assert_eq!(doc.field("TotalTax"), &FieldValue::Raw("€ 21,00".into()));
        assert_eq!(doc.field("VendorTaxId"), &FieldValue::Absent);
    }

    #[test]
    fn decodes_result_without_documents() {
        let result = decode(r#"{"status": "succeeded", "analyzeResult": {"content": "hello"}}"#);
        assert_eq!(result.content, "hello");
        assert!(result.documents.is_empty());
    }

    #[test]
    fn failed_operation_error_message() {
        let op: Operation = serde_json::from_str(
            r#"{"status": "failed", "error": {"code": "InvalidContent", "message": "The file is corrupted."}}"#,
        )
        .unwrap();
        assert_eq!(
            op.error.unwrap().describe(),
            "InvalidContent: The file is corrupted."
        );
    }

    #[test]
    fn retry_after_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(RETRY_AFTER, "2".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(2)));
    }

    // ── Operation flow against a local service ──────────────────────────

    const KEY: &str = "secret";

    #[derive(Clone)]
    struct FakeService {
        base: String,
        polls: Arc<AtomicUsize>,
    }

    /// `{outcome}:analyze` picks how the operation ends.
    async fn submit(
        State(svc): State<FakeService>,
        Path(model): Path<String>,
        headers: HeaderMap,
    ) -> Response {
        if headers.get(KEY_HEADER).and_then(|v| v.to_str().ok()) != Some(KEY) {
            return (
                StatusCode::UNAUTHORIZED,
                "Access denied due to invalid subscription key.",
            )
                .into_response();
        }
        let outcome = model.trim_end_matches(":analyze");
        if outcome == "no-location" {
            return StatusCode::ACCEPTED.into_response();
        }
        (
            StatusCode::ACCEPTED,
            [
                ("operation-location", format!("{}/operations/{}", svc.base, outcome)),
                ("retry-after", "0".to_string()),
            ],
        )
            .into_response()
    }

    /// Reports `running` on the first poll, then the terminal status.
    async fn poll(State(svc): State<FakeService>, Path(outcome): Path<String>) -> Response {
        let body = if svc.polls.fetch_add(1, Ordering::SeqCst) == 0 {
            serde_json::json!({ "status": "running" })
        } else if outcome == "ok" {
            serde_json::json!({
                "status": "succeeded",
                "analyzeResult": {
                    "content": "ACME B.V.\nKvK: 12345678",
                    "documents": [{
                        "fields": {
                            "VendorName": {"valueString": "ACME B.V.", "content": "ACME B.V."},
                            "InvoiceTotal": {"valueCurrency": {"amount": 121.0}, "content": "€ 121,00"}
                        }
                    }]
                }
            })
        } else {
            serde_json::json!({
                "status": "failed",
                "error": {"code": "InvalidContent", "message": "The file is corrupted."}
            })
        };
        ([("retry-after", "0")], axum::Json(body)).into_response()
    }

    async fn spawn_service() -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let polls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/documentintelligence/documentModels/{model}", post(submit))
            .route("/operations/{outcome}", get(poll))
            .with_state(FakeService {
                base: base.clone(),
                polls: polls.clone(),
            });
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (base, polls)
    }

    /// A long fallback interval, so only `Retry-After: 0` keeps the flow fast.
    async fn run_against(
        base: &str,
        key: &str,
        outcome: &str,
    ) -> Result<AnalyzeResult, AnalyzeError> {
        let analyzer = AzureAnalyzer::new(base, key, outcome, "2024-11-30", reqwest::Client::new())
            .with_poll_interval(Duration::from_secs(60));
        tokio::time::timeout(
            Duration::from_secs(10),
            analyzer.analyze(b"%PDF-1.7", "application/pdf"),
        )
        .await
        .expect("Retry-After was not honoured")
    }

    #[tokio::test]
    async fn operation_succeeds_after_polling() {
        let (base, polls) = spawn_service().await;
        let result = run_against(&base, KEY, "ok").await.unwrap();

        assert_eq!(polls.load(Ordering::SeqCst), 2);
        assert_eq!(result.content, "ACME B.V.\nKvK: 12345678");
        let doc = &result.documents[0];
        assert_eq!(doc.field("VendorName"), &FieldValue::Resolved("ACME B.V.".into()));
        assert_eq!(doc.field("InvoiceTotal"), &FieldValue::Resolved("121.00".into()));
    }

    #[tokio::test]
    async fn failed_operation_returns_service_message() {
        let (base, polls) = spawn_service().await;
        let err = run_against(&base, KEY, "broken").await.unwrap_err();

        assert_eq!(polls.load(Ordering::SeqCst), 2);
        assert!(matches!(&err, AnalyzeError::Failed(m) if m == "InvalidContent: The file is corrupted."));
        assert_eq!(
            err.to_string(),
            "analysis failed: InvalidContent: The file is corrupted."
        );
    }

    #[tokio::test]
    async fn rejected_key_returns_status_and_body() {
        let (base, polls) = spawn_service().await;
        let err = run_against(&base, "wrong", "ok").await.unwrap_err();

        assert_eq!(polls.load(Ordering::SeqCst), 0);
        assert!(matches!(&err, AnalyzeError::Status { status, .. } if status.as_u16() == 401));
        assert_eq!(
            err.to_string(),
            "HTTP 401 Unauthorized: Access denied due to invalid subscription key."
        );
    }

    #[tokio::test]
    async fn accepted_without_operation_location_is_an_error() {
        let (base, polls) = spawn_service().await;
        let err = run_against(&base, KEY, "no-location").await.unwrap_err();

        assert_eq!(polls.load(Ordering::SeqCst), 0);
        assert!(matches!(err, AnalyzeError::MissingOperationLocation));
    }
}
