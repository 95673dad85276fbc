//! Mock analyzer for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::DocumentAnalyzer;
use crate::{AnalyzeError, AnalyzeResult};

/// A configurable mock response for [`MockAnalyzer`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Simulate a completed analysis.
    Completed(AnalyzeResult),
    /// Simulate a failure carrying the given message.
    Error(String),
}

/// A hand-rolled mock implementing [`DocumentAnalyzer`] for tests.
///
/// Returns a fixed response on every call and records the content type of
/// the last call.
pub struct MockAnalyzer {
    response: MockResponse,
    call_count: AtomicUsize,
    last_content_type: Mutex<Option<String>>,
}

impl MockAnalyzer {
    /// Create a mock that always returns `response`.
    pub fn new(response: MockResponse) -> Self {
        Self {
            response,
            call_count: AtomicUsize::new(0),
            last_content_type: Mutex::new(None),
        }
    }

    /// Shorthand for a mock that always completes with `result`.
    pub fn completed(result: AnalyzeResult) -> Self {
        Self::new(MockResponse::Completed(result))
    }

    /// Shorthand for a mock that always fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(MockResponse::Error(message.into()))
    }

    /// How many times `analyze()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Content type passed to the most recent call.
    pub fn last_content_type(&self) -> Option<String> {
        self.last_content_type
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

impl DocumentAnalyzer for MockAnalyzer {
    fn name(&self) -> &str {
        "Mock"
    }

    fn analyze<'a>(
        &'a self,
        _document: &'a [u8],
        content_type: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AnalyzeResult, AnalyzeError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_content_type.lock() {
            *last = Some(content_type.to_string());
        }
        let response = self.response.clone();

        Box::pin(async move {
            match response {
                MockResponse::Completed(result) => Ok(result),
                MockResponse::Error(msg) => Err(AnalyzeError::Other(msg)),
            }
        })
    }
}
