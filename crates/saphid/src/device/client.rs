use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use serde_json::json;
use tracing::debug;

use super::DeviceError;
use super::Key;

/// Endpoints of the JSON control dialect, relative to
/// `{protocol}://{address}:{port}/{api_version}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    PowerState,
    InputKey,
    AmbientPower,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::PowerState => "powerstate",
            Endpoint::InputKey => "input/key",
            Endpoint::AmbientPower => "HueLamp/power",
        }
    }
}

/// Trait for the HTTP side of the control surface
///
/// This trait allows for mocking the transport for testing purposes
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET an endpoint and decode its JSON body. Any status other than 200 is an error.
    async fn get(&self, endpoint: Endpoint) -> Result<Value, DeviceError>;

    /// POST a JSON body and return the raw response text.
    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<String, DeviceError>;
}

/// reqwest-backed transport with a single hard per-request timeout.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, base_url })
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, endpoint: Endpoint) -> Result<Value, DeviceError> {
        let url = self.url(endpoint);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(DeviceError::from_reqwest)?;

        if response.status() != StatusCode::OK {
            return Err(DeviceError::Status(response.status().as_u16()));
        }

        response.json().await.map_err(DeviceError::from_reqwest)
    }

    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<String, DeviceError> {
        let url = self.url(endpoint);
        debug!("POST {} {}", url, body);

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(DeviceError::from_reqwest)?
            .error_for_status()
            .map_err(DeviceError::from_reqwest)?;

        response.text().await.map_err(DeviceError::from_reqwest)
    }
}

/// Outcome of a get-style call, to be merged into the last observed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    /// The device reported (or the failure implies) this value.
    Known(bool),
    /// Nothing conclusive; keep what we had.
    Unknown,
}

impl Reading {
    pub fn merge(self, previous: bool) -> bool {
        match self {
            Reading::Known(active) => active,
            Reading::Unknown => previous,
        }
    }

    fn from_body(body: &Value, on: &Value, off: &Value) -> Self {
        if body == on {
            Reading::Known(true)
        } else if body == off {
            Reading::Known(false)
        } else {
            Reading::Unknown
        }
    }

    fn from_error(err: &DeviceError) -> Self {
        if err.forces_inactive() {
            Reading::Known(false)
        } else {
            Reading::Unknown
        }
    }
}

pub fn power_on_body() -> Value {
    json!({ "powerstate": "On" })
}

pub fn power_off_body() -> Value {
    json!({ "powerstate": "Standby" })
}

pub fn ambient_body(on: bool) -> Value {
    json!({ "power": if on { "On" } else { "Off" } })
}

/// Stateless wrapper exposing the device primitives over a [`Transport`].
#[derive(Clone)]
pub struct DeviceClient {
    transport: Arc<dyn Transport>,
}

impl DeviceClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn get_power(&self) -> Reading {
        match self.transport.get(Endpoint::PowerState).await {
            Ok(body) => {
                debug!("Power state response: {}", body);
                Reading::from_body(&body, &power_on_body(), &power_off_body())
            }
            Err(e) => {
                debug!("Error getting power state: {}", e);
                Reading::from_error(&e)
            }
        }
    }

    pub async fn get_ambient(&self) -> Reading {
        match self.transport.get(Endpoint::AmbientPower).await {
            Ok(body) => {
                debug!("Ambient state response: {}", body);
                Reading::from_body(&body, &ambient_body(true), &ambient_body(false))
            }
            Err(e) => {
                debug!("Error getting ambient state: {}", e);
                Reading::from_error(&e)
            }
        }
    }

    pub async fn set_ambient(&self, on: bool) -> Result<String, DeviceError> {
        self.transport
            .post(Endpoint::AmbientPower, ambient_body(on))
            .await
    }

    /// Send the standby key. The device has no direct "power on" call; that goes
    /// through wake-on-LAN.
    pub async fn standby(&self) -> Result<String, DeviceError> {
        self.send_key(Key::Standby).await
    }

    pub async fn send_key(&self, key: Key) -> Result<String, DeviceError> {
        self.transport.post(Endpoint::InputKey, key.body()).await
    }
}

/// A request recorded by [`MockTransport`].
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub endpoint: Endpoint,
    pub body: Option<Value>,
    pub at: tokio::time::Instant,
}

/// Mock transport for testing
///
/// GET responses are scripted per endpoint and consumed in order; an endpoint
/// without a scripted response times out.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockTransport {
    calls: std::sync::Mutex<Vec<Call>>,
    responses: std::sync::Mutex<
        std::collections::HashMap<Endpoint, std::collections::VecDeque<Result<Value, DeviceError>>>,
    >,
    fail_posts: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MockTransport {
    pub fn respond(&self, endpoint: Endpoint, response: Result<Value, DeviceError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(response);
    }

    pub fn fail_posts(&self) {
        self.fail_posts
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn gets(&self, endpoint: Endpoint) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.method == "GET" && c.endpoint == endpoint)
            .count()
    }

    /// Bodies of every POST, rendered compactly for easy comparison.
    pub fn posted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.body.map(|b| b.to_string()))
            .collect()
    }

    /// Names of every key sent to `input/key`.
    pub fn keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.endpoint == Endpoint::InputKey)
            .filter_map(|c| c.body?.get("key")?.as_str().map(str::to_string))
            .collect()
    }

    fn record(&self, method: &'static str, endpoint: Endpoint, body: Option<Value>) {
        self.calls.lock().unwrap().push(Call {
            method,
            endpoint,
            body,
            at: tokio::time::Instant::now(),
        });
    }
}

#[cfg(test)]
#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, endpoint: Endpoint) -> Result<Value, DeviceError> {
        self.record("GET", endpoint, None);
        self.responses
            .lock()
            .unwrap()
            .get_mut(&endpoint)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Err(DeviceError::Timeout))
    }

    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<String, DeviceError> {
        self.record("POST", endpoint, Some(body));
        if self.fail_posts.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(DeviceError::Timeout);
        }
        Ok(String::new())
    }
}
