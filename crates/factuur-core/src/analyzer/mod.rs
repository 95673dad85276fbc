//! Document analysis backends: the seam between the gateway and a
//! document-understanding service.

pub mod azure;
pub mod mock;

use std::future::Future;
use std::pin::Pin;

use crate::{AnalyzeError, AnalyzeResult};

/// A service that turns document bytes into an [`AnalyzeResult`].
pub trait DocumentAnalyzer: Send + Sync {
    /// Human-readable backend name, used in logs.
    fn name(&self) -> &str;

    /// Analyze a document and wait for the terminal result.
    fn analyze<'a>(
        &'a self,
        document: &'a [u8],
        content_type: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AnalyzeResult, AnalyzeError>> + Send + 'a>>;
}
