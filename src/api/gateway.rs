use async_trait::async_trait;

use crate::api::models::Page;
use crate::error::AppResult;

/// Paged reads against the sensor data endpoint.
///
/// One call is one request: no retries and no caching happen behind it.
#[async_trait]
pub trait FetchGateway: Send + Sync {
    /// Fetch `limit` readings starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Network` on transport, HTTP or decoding failure.
    async fn fetch_page(&self, offset: usize, limit: usize) -> AppResult<Page>;
}
