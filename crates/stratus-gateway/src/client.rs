//! Provider gateway client.
//!
//! One uniform operation covers every driver interaction:
//! `call(method, path, connection, body, deadline)`. The request body is the
//! driver's envelope `{ConnectionName, ReqInfo}`; the response is raw JSON
//! that typed helpers deserialize. Non-2xx responses become
//! [`GatewayError::Upstream`] carrying the body verbatim; deadline expiry
//! becomes [`GatewayError::Timeout`]. Retry policy belongs to the caller's
//! transport, never to this client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// The uniform remote-call seam the control plane programs against.
///
/// The production implementation is [`DriverClient`]; tests substitute a
/// scripted fake.
#[async_trait]
pub trait CloudDriver: Send + Sync {
    /// Execute one driver call. `body` becomes the envelope's `ReqInfo`;
    /// `deadline` overrides the client default when given.
    async fn call(
        &self,
        method: Method,
        path: &str,
        connection: &str,
        body: Option<Value>,
        deadline: Option<Duration>,
    ) -> GatewayResult<Value>;
}

/// HTTP client for the remote driver.
#[derive(Clone)]
pub struct DriverClient {
    http: reqwest::Client,
    base_url: String,
    default_timeout: Duration,
}

impl DriverClient {
    /// Create a client for the driver at `base_url`.
    pub fn new(base_url: impl Into<String>, default_timeout: Option<Duration>) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("stratus/0.1")
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_timeout: default_timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        payload: &Value,
    ) -> GatewayResult<Value> {
        debug!(%method, %url, "driver call");
        let response = self
            .http
            .request(method, url)
            .json(payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            // The raw body is the diagnostic; keep it verbatim.
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CloudDriver for DriverClient {
    async fn call(
        &self,
        method: Method,
        path: &str,
        connection: &str,
        body: Option<Value>,
        deadline: Option<Duration>,
    ) -> GatewayResult<Value> {
        let url = self.url(path);
        let mut payload = serde_json::json!({ "ConnectionName": connection });
        if let Some(req_info) = body {
            payload["ReqInfo"] = req_info;
        }

        let timeout = deadline.unwrap_or(self.default_timeout);
        match tokio::time::timeout(timeout, self.execute(method, &url, &payload)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(format!(
                "driver call {url} exceeded {}s",
                timeout.as_secs()
            ))),
        }
    }
}

/// Call the driver and deserialize the JSON payload into `T`.
pub async fn call_as<T: DeserializeOwned>(
    driver: &dyn CloudDriver,
    method: Method,
    path: &str,
    connection: &str,
    body: Option<Value>,
    deadline: Option<Duration>,
) -> GatewayResult<T> {
    let value = driver.call(method, path, connection, body, deadline).await?;
    serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DriverSpecList;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn success_passes_json_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vmspec"))
            .and(body_partial_json(serde_json::json!({"ConnectionName": "aws-seoul"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "vmspec": [{"Name": "t3.large", "Region": "ap-northeast-2"}]
            })))
            .mount(&server)
            .await;

        let client = DriverClient::new(server.uri(), None).unwrap();
        let list: DriverSpecList = call_as(
            &client,
            Method::GET,
            "/vmspec",
            "aws-seoul",
            None,
            None,
        )
        .await
        .unwrap();
        assert_eq!(list.vmspec.len(), 1);
        assert_eq!(list.vmspec[0].name, "t3.large");
    }

    #[tokio::test]
    async fn non_2xx_becomes_upstream_with_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/disk"))
            .respond_with(
                ResponseTemplate::new(500).set_body_string("quota exceeded for volume type gp3"),
            )
            .mount(&server)
            .await;

        let client = DriverClient::new(server.uri(), None).unwrap();
        let err = client
            .call(Method::POST, "/disk", "aws-seoul", None, None)
            .await
            .unwrap_err();
        match err {
            GatewayError::Upstream { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "quota exceeded for volume type gp3");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn request_wraps_body_in_req_info_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/disk"))
            .and(body_partial_json(serde_json::json!({
                "ConnectionName": "aws-seoul",
                "ReqInfo": {"Name": "uid-1", "DiskSize": "100"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "IId": {"NameId": "uid-1", "SystemId": "vol-1"}
            })))
            .mount(&server)
            .await;

        let client = DriverClient::new(server.uri(), None).unwrap();
        let result = client
            .call(
                Method::POST,
                "disk",
                "aws-seoul",
                Some(serde_json::json!({"Name": "uid-1", "DiskSize": "100"})),
                None,
            )
            .await
            .unwrap();
        assert_eq!(result["IId"]["SystemId"], "vol-1");
    }

    #[tokio::test]
    async fn deadline_expiry_is_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vmspec"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"vmspec": []}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = DriverClient::new(server.uri(), None).unwrap();
        let err = client
            .call(
                Method::GET,
                "/vmspec",
                "aws-seoul",
                None,
                Some(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Timeout(_)));
    }

    #[tokio::test]
    async fn empty_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/disk/d-uid"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = DriverClient::new(server.uri(), None).unwrap();
        let result = client
            .call(Method::DELETE, "/disk/d-uid", "aws-seoul", None, None)
            .await
            .unwrap();
        assert!(result.is_null());
    }
}
