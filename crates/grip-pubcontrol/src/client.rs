use grip_core::{GripProxy, Item};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::auth::JwtAuth;
use crate::error::PublishError;

/// Publisher for a single GRIP control endpoint.
#[derive(Clone, Debug)]
pub struct PubControlClient {
    uri: String,
    auth: Option<JwtAuth>,
    http: reqwest::Client,
}

impl PubControlClient {
    pub fn new(uri: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            uri: uri.into(),
            auth: None,
            http,
        }
    }

    /// Build a client for a proxy entry. `None` when the entry has no control URI.
    pub fn from_proxy(proxy: &GripProxy, http: reqwest::Client) -> Option<Self> {
        let uri = proxy.control_uri.as_deref()?;
        let mut client = Self::new(uri, http);
        if let (Some(iss), Some(key)) = (&proxy.control_iss, &proxy.key) {
            client.set_auth_jwt(JwtAuth::new(iss.clone(), key.clone()));
        }
        Some(client)
    }

    pub fn set_auth_jwt(&mut self, auth: JwtAuth) {
        self.auth = Some(auth);
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn auth(&self) -> Option<&JwtAuth> {
        self.auth.as_ref()
    }

    fn publish_url(&self) -> String {
        format!("{}/publish/", self.uri)
    }

    pub async fn publish(&self, channel: &str, item: &Item) -> Result<(), PublishError> {
        let exported = item.export(channel)?;
        self.publish_exported(vec![exported]).await
    }

    /// POST already-exported items to the endpoint.
    #[instrument(skip(self, items), fields(uri = %self.uri, count = items.len()))]
    pub async fn publish_exported(&self, items: Vec<Value>) -> Result<(), PublishError> {
        let mut req = self
            .http
            .post(self.publish_url())
            .json(&json!({ "items": items }));
        if let Some(auth) = &self.auth {
            req = req.header("authorization", auth.authorization_header()?);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PublishError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grip_core::{ControlKey, Format};
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_items_to_publish_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realm/publish/"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "items": [{"channel": "room", "ws-message": {"content": "hi"}}]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = PubControlClient::new(format!("{}/realm", server.uri()), reqwest::Client::new());
        let item = Item::new(vec![Format::ws_message("hi")]);
        client.publish("room", &item).await.unwrap();
    }

    #[tokio::test]
    async fn sends_bearer_token_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/publish/"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let proxy = GripProxy {
            control_uri: Some(server.uri()),
            control_iss: Some("realm".into()),
            key: Some(ControlKey::new(b"secret".to_vec())),
        };
        let client = PubControlClient::from_proxy(&proxy, reqwest::Client::new()).unwrap();
        assert_eq!(client.auth().unwrap().iss(), "realm");
        client
            .publish("c", &Item::new(vec![Format::ws_message("x")]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("bad auth"))
            .mount(&server)
            .await;

        let client = PubControlClient::new(server.uri(), reqwest::Client::new());
        let err = client
            .publish("c", &Item::new(vec![Format::ws_message("x")]))
            .await
            .unwrap_err();
        match err {
            PublishError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "bad auth");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        let client = PubControlClient::new("http://127.0.0.1:1", reqwest::Client::new());
        let err = client
            .publish("c", &Item::new(vec![Format::ws_message("x")]))
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), "network");
    }

    #[test]
    fn entry_without_control_uri_is_skipped() {
        let proxy = GripProxy {
            control_uri: None,
            control_iss: None,
            key: None,
        };
        assert!(PubControlClient::from_proxy(&proxy, reqwest::Client::new()).is_none());
    }
}
