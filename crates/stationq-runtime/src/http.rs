//! REST implementation of [`QueueApi`]
//!
//! Talks to the queue service's `/api/v1` endpoints with a bearer token.
//! Successful responses wrap their payload as `{"data": ...}`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use stationq_core::{
    ApiConfig, ApiError, ApiResult, EntryId, QueueApi, QueueEntry, Result, StationId,
    StationSummary, StationqError,
};

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Queue service client over HTTP
#[derive(Debug, Clone)]
pub struct HttpQueueApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpQueueApi {
    pub fn new(config: &ApiConfig, token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| StationqError::config_error(format!("API URL {}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(StationqError::config_error(format!(
                "API URL {} cannot carry a path",
                config.base_url
            )));
        }
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StationqError::config_error(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "v1"]).extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.url(segments);
        debug!(%method, %url, "Queue API request");
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> ApiResult<String> {
        let response = request.send().await.map_err(|e| ApiError::Request {
            reason: e.to_string(),
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::Request {
            reason: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn fetch_data<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let body = self.execute(request).await?;
        serde_json::from_str::<Envelope<T>>(&body)
            .map(|envelope| envelope.data)
            .map_err(|e| ApiError::Decode {
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl QueueApi for HttpQueueApi {
    async fn fetch_queue(&self, station: &StationId) -> ApiResult<Vec<QueueEntry>> {
        self.fetch_data(self.request(Method::GET, &["queue", station.as_str()]))
            .await
    }

    async fn submit_reorder(&self, station: &StationId, order: &[EntryId]) -> ApiResult<()> {
        let request = self
            .request(Method::PUT, &["queue", station.as_str(), "reorder"])
            .json(&json!({ "entryIds": order }));
        self.execute(request).await.map(|_| ())
    }

    async fn delete_entry(&self, station: &StationId, entry: &EntryId) -> ApiResult<()> {
        let request = self.request(
            Method::DELETE,
            &["queue", station.as_str(), "entry", entry.as_str()],
        );
        match self.execute(request).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(%station, %entry, "Entry already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_summaries(&self) -> ApiResult<Vec<StationSummary>> {
        self.fetch_data(self.request(Method::GET, &["queue-summaries"]))
            .await
    }

    async fn add_vehicle(
        &self,
        station: &StationId,
        vehicle_id: &str,
        station_name: &str,
    ) -> ApiResult<QueueEntry> {
        let request = self
            .request(Method::POST, &["queue", station.as_str()])
            .json(&json!({
                "vehicleId": vehicle_id,
                "destinationId": station,
                "destinationName": station_name,
            }));
        self.fetch_data(request).await
    }
}
