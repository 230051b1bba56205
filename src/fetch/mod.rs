mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use reqwest::Url;

use crate::error::FetchError;
use crate::parser::{VehiclesResponse, parse_vehicles};

/// Issues one GET for `url` and returns the body, classifying failures.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: Url) -> Result<Vec<u8>, FetchError> {
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await.map_err(FetchError::Connectivity)?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FetchError::HttpStatus { status, body });
    }

    let bytes = resp.bytes().await.map_err(FetchError::Connectivity)?;
    Ok(bytes.to_vec())
}

/// Builds the `vehicles.json` URL for a set of agencies.
pub fn vehicles_url(base_url: &Url, agencies: &[String]) -> Url {
    let mut url = base_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push("vehicles.json");
    }
    url.set_query(Some(&format!("agencies={}", agencies.join(","))));
    url
}

/// Polls `vehicles.json` once.
pub async fn fetch_vehicles<C: HttpClient>(
    client: &C,
    base_url: &Url,
    agencies: &[String],
) -> Result<VehiclesResponse, FetchError> {
    let bytes = fetch_bytes(client, vehicles_url(base_url, agencies)).await?;
    parse_vehicles(&bytes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned `(status, body)` responses and records request URLs.
    pub(crate) struct StubClient {
        responses: Mutex<Vec<(u16, String)>>,
        pub(crate) requests: Mutex<Vec<Url>>,
    }

    impl StubClient {
        pub(crate) fn new(mut responses: Vec<(u16, &str)>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|(status, body)| (status, body.to_string()))
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for StubClient {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.requests.lock().unwrap().push(req.url().clone());
            let (status, body) = self
                .responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or((500, "exhausted".to_string()));
            let resp = http::Response::builder().status(status).body(body).unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }

    pub(crate) const VEHICLES_BODY: &str = r#"{
        "generated_on": "2018-11-01T12:00:03+00:00",
        "data": {"12": [{
            "standing_capacity": null, "description": null, "seating_capacity": 40,
            "last_updated_on": "2018-11-01T08:00:01-04:00", "call_name": "2306",
            "speed": 10.0, "vehicle_id": "4008242", "segment_id": null,
            "passenger_load": null, "route_id": "4005134", "tracking_status": "up",
            "location": {"lat": 35.99, "lng": -78.9}, "heading": 90
        }]}
    }"#;

    fn base() -> Url {
        "https://transloc-api-1-2.p.mashape.com".parse().unwrap()
    }

    fn agencies() -> Vec<String> {
        vec!["12".to_string()]
    }

    #[test]
    fn test_vehicles_url() {
        let agencies = vec!["12".to_string(), "16".to_string()];
        let base: Url = "https://transloc-api-1-2.p.mashape.com/".parse().unwrap();
        assert_eq!(
            vehicles_url(&base, &agencies).as_str(),
            "https://transloc-api-1-2.p.mashape.com/vehicles.json?agencies=12,16"
        );
    }

    #[test]
    fn test_vehicles_url_keeps_base_path() {
        let base: Url = "http://localhost:8080/api/".parse().unwrap();
        assert_eq!(
            vehicles_url(&base, &agencies()).as_str(),
            "http://localhost:8080/api/vehicles.json?agencies=12"
        );
    }

    #[tokio::test]
    async fn test_success_parses_vehicles() {
        let client = StubClient::new(vec![(200, VEHICLES_BODY)]);

        let resp = fetch_vehicles(&client, &base(), &agencies()).await.unwrap();

        assert_eq!(resp.vehicles("12").len(), 1);
        let requests = client.requests.lock().unwrap();
        assert_eq!(requests[0].path(), "/vehicles.json");
        assert_eq!(requests[0].query(), Some("agencies=12"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_status_error() {
        let client = StubClient::new(vec![(429, "rate limited")]);

        let err = fetch_vehicles(&client, &base(), &agencies()).await.unwrap_err();

        match err {
            FetchError::HttpStatus { status, body } => {
                assert_eq!(status.as_u16(), 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_payload_error() {
        let client = StubClient::new(vec![(200, "<html>maintenance</html>")]);

        let err = fetch_vehicles(&client, &base(), &agencies()).await.unwrap_err();

        assert!(matches!(err, FetchError::Payload(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_refused_connection_is_connectivity_error() {
        // Nothing listens on port 1 of the loopback interface.
        let base: Url = "http://127.0.0.1:1".parse().unwrap();

        let err = fetch_vehicles(&BasicClient::new(), &base, &agencies())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Connectivity(_)), "{err:?}");
    }
}
