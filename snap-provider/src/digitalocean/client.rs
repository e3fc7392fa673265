//! Blocking HTTP transport for the DigitalOcean v2 API.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::api::{ApiFailure, ApiResult, DropletApi, StopMethod};
use super::models::{Action, Droplet, DropletStatus, Snapshot};
use crate::error::{ProviderError, Result};

pub use snap_config::DEFAULT_API_URL;

const PER_PAGE: u32 = 200;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct DropletEnvelope {
    droplet: Droplet,
}

#[derive(Deserialize)]
struct DropletsEnvelope {
    droplets: Vec<Droplet>,
    #[serde(default)]
    links: Option<Links>,
}

#[derive(Deserialize, Default)]
struct Links {
    #[serde(default)]
    pages: Option<Pages>,
}

#[derive(Deserialize, Default)]
struct Pages {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct SnapshotsEnvelope {
    snapshots: Vec<Snapshot>,
    #[serde(default)]
    links: Option<Links>,
}

/// One page of a listing endpoint.
trait Page: DeserializeOwned {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<Links>);
}

impl Page for DropletsEnvelope {
    type Item = Droplet;

    fn into_parts(self) -> (Vec<Droplet>, Option<Links>) {
        (self.droplets, self.links)
    }
}

impl Page for SnapshotsEnvelope {
    type Item = Snapshot;

    fn into_parts(self) -> (Vec<Snapshot>, Option<Links>) {
        (self.snapshots, self.links)
    }
}

#[derive(Deserialize)]
struct ActionEnvelope {
    action: Action,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct HttpClient {
    base_url: String,
    token: String,
    http: Client,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("do-snapshot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/{}", self.base_url, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.url(path);
        debug!("GET {}", url);
        self.send(self.http.get(url))
    }

    /// Collect every page of `path`, following `links.pages.next`.
    fn get_all<P: Page>(&self, path: &str) -> ApiResult<Vec<P::Item>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let (batch, links) = self
                .get::<P>(&format!("{path}?page={page}&per_page={PER_PAGE}"))?
                .into_parts();
            let has_next = links
                .and_then(|links| links.pages)
                .and_then(|pages| pages.next)
                .is_some();
            let empty = batch.is_empty();
            items.extend(batch);

            if !has_next || empty {
                return Ok(items);
            }
            page += 1;
        }
    }

    fn post_action(&self, droplet_id: u64, body: serde_json::Value) -> ApiResult<Action> {
        let url = self.url(&format!("droplets/{droplet_id}/actions"));
        debug!("POST {} {}", url, body);
        let envelope: ActionEnvelope = self.send(self.http.post(url).json(&body))?;
        Ok(envelope.action)
    }

    fn execute(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| ApiFailure::new(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(failure_from(status, response))
        }
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = self.execute(request)?;
        let status = response.status();
        response.json::<T>().map_err(|e| {
            ApiFailure::with_status(
                status.as_u16(),
                format!("Unexpected response from DigitalOcean: {e}"),
            )
        })
    }
}

/// Prefer the `message` of a DigitalOcean error body, then the raw body,
/// then the HTTP reason phrase.
fn failure_from(status: StatusCode, response: Response) -> ApiFailure {
    let body = response.text().unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(error) => error.message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };
    ApiFailure::with_status(status.as_u16(), message)
}

impl DropletApi for HttpClient {
    fn droplet(&self, droplet_id: u64) -> ApiResult<Droplet> {
        let mut droplet = self
            .get::<DropletEnvelope>(&format!("droplets/{droplet_id}"))?
            .droplet;
        droplet.snapshots =
            self.get_all::<SnapshotsEnvelope>(&format!("droplets/{droplet_id}/snapshots"))?;
        droplet.sort_snapshots();
        Ok(droplet)
    }

    fn droplets(&self) -> ApiResult<Vec<Droplet>> {
        self.get_all::<DropletsEnvelope>("droplets")
    }

    fn power_state(&self, droplet_id: u64) -> ApiResult<DropletStatus> {
        let envelope: DropletEnvelope = self.get(&format!("droplets/{droplet_id}"))?;
        Ok(envelope.droplet.status)
    }

    fn power_on(&self, droplet_id: u64) -> ApiResult<Action> {
        self.post_action(droplet_id, json!({ "type": "power_on" }))
    }

    fn power_off(&self, droplet_id: u64, method: StopMethod) -> ApiResult<Action> {
        self.post_action(droplet_id, json!({ "type": method.action_type() }))
    }

    fn snapshot(&self, droplet_id: u64, name: &str) -> ApiResult<Action> {
        self.post_action(droplet_id, json!({ "type": "snapshot", "name": name }))
    }

    fn action(&self, action_id: u64) -> ApiResult<Action> {
        let envelope: ActionEnvelope = self.get(&format!("actions/{action_id}"))?;
        Ok(envelope.action)
    }

    fn delete_image(&self, image_id: u64) -> ApiResult<bool> {
        let url = self.url(&format!("images/{image_id}"));
        debug!("DELETE {}", url);
        let response = self.execute(self.http.delete(url))?;
        Ok(response.status() == StatusCode::NO_CONTENT)
    }
}
