use async_trait::async_trait;
use reqwest::{Request, Response};

/// Seam between the collector and the network; tests swap in a stub.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
