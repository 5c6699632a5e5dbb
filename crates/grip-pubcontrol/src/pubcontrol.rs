use std::time::Duration;

use futures::future::join_all;
use grip_core::{GripProxy, Item};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::client::PubControlClient;
use crate::error::PublishError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Publishes items to every configured GRIP proxy.
///
/// - `publish` awaits all endpoints and returns the first error
/// - `publish_with_callback` runs in the background and reports once
/// - `finish` waits for outstanding background publishes
#[derive(Debug)]
pub struct GripPubControl {
    clients: Vec<PubControlClient>,
    http: reqwest::Client,
    tracker: TaskTracker,
}

impl GripPubControl {
    pub fn new() -> Result<Self, PublishError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PublishError::ClientBuild(e.to_string()))?;
        Ok(Self::with_http(http))
    }

    pub fn with_http(http: reqwest::Client) -> Self {
        Self {
            clients: Vec::new(),
            http,
            tracker: TaskTracker::new(),
        }
    }

    /// Add a client per proxy entry; entries without `control_uri` are skipped.
    pub fn apply_grip_config(&mut self, proxies: &[GripProxy]) {
        for proxy in proxies {
            match PubControlClient::from_proxy(proxy, self.http.clone()) {
                Some(client) => {
                    info!(uri = client.uri(), jwt = client.auth().is_some(), "added GRIP publisher");
                    self.clients.push(client);
                }
                None => warn!("skipping GRIP proxy entry without control_uri"),
            }
        }
    }

    pub fn add_client(&mut self, client: PubControlClient) {
        self.clients.push(client);
    }

    pub fn clients(&self) -> &[PubControlClient] {
        &self.clients
    }

    pub async fn publish(&self, channel: &str, item: &Item) -> Result<(), PublishError> {
        publish_to_all(&self.clients, channel, item).await
    }

    /// Publish without waiting. `callback` gets the combined outcome.
    pub fn publish_with_callback<F>(&self, channel: &str, item: Item, callback: F)
    where
        F: FnOnce(Result<(), PublishError>) + Send + 'static,
    {
        if tokio::runtime::Handle::try_current().is_err() {
            callback(Err(PublishError::NoRuntime));
            return;
        }

        let clients = self.clients.clone();
        let channel = channel.to_string();
        self.tracker.spawn(async move {
            let result = publish_to_all(&clients, &channel, &item).await;
            if let Err(e) = &result {
                warn!(channel = %channel, error = %e, kind = e.error_kind(), "background publish failed");
            }
            callback(result);
        });
    }

    /// Wait for every background publish started so far.
    pub async fn finish(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

async fn publish_to_all(
    clients: &[PubControlClient],
    channel: &str,
    item: &Item,
) -> Result<(), PublishError> {
    let exported = item.export(channel)?;
    if clients.is_empty() {
        debug!(channel, "no GRIP publishers configured, dropping item");
        return Ok(());
    }

    let results = join_all(
        clients
            .iter()
            .map(|client| client.publish_exported(vec![exported.clone()])),
    )
    .await;

    results.into_iter().collect::<Result<Vec<()>, _>>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use grip_core::Format;
    use parking_lot::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn proxy(uri: String) -> GripProxy {
        GripProxy {
            control_uri: Some(uri),
            control_iss: None,
            key: None,
        }
    }

    async fn server_with_status(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/publish/"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn apply_config_skips_entries_without_uri() {
        let mut pub_control = GripPubControl::new().unwrap();
        pub_control.apply_grip_config(&[
            proxy("http://localhost:5561".into()),
            GripProxy {
                control_uri: None,
                control_iss: None,
                key: None,
            },
        ]);
        assert_eq!(pub_control.clients().len(), 1);
        assert_eq!(pub_control.clients()[0].uri(), "http://localhost:5561");
    }

    #[tokio::test]
    async fn publishes_to_every_client() {
        let a = server_with_status(200).await;
        let b = server_with_status(200).await;
        let mut pub_control = GripPubControl::new().unwrap();
        pub_control.apply_grip_config(&[proxy(a.uri()), proxy(b.uri())]);

        let item = Item::new(vec![Format::ws_message("hello")]);
        pub_control.publish("room", &item).await.unwrap();

        assert_eq!(a.received_requests().await.unwrap().len(), 1);
        assert_eq!(b.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn one_failing_endpoint_fails_publish() {
        let ok = server_with_status(200).await;
        let bad = server_with_status(500).await;
        let mut pub_control = GripPubControl::new().unwrap();
        pub_control.apply_grip_config(&[proxy(ok.uri()), proxy(bad.uri())]);

        let err = pub_control
            .publish("room", &Item::new(vec![Format::ws_message("x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn no_clients_is_a_no_op() {
        let pub_control = GripPubControl::new().unwrap();
        pub_control
            .publish("room", &Item::new(vec![Format::ws_message("x")]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn invalid_item_fails_before_sending() {
        let server = server_with_status(200).await;
        let mut pub_control = GripPubControl::new().unwrap();
        pub_control.apply_grip_config(&[proxy(server.uri())]);

        let item = Item::new(vec![Format::ws_message("a"), Format::ws_message("b")]);
        let err = pub_control.publish("room", &item).await.unwrap_err();
        assert_eq!(err.error_kind(), "item");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn callback_publish_reports_after_finish() {
        let server = server_with_status(200).await;
        let mut pub_control = GripPubControl::new().unwrap();
        pub_control.apply_grip_config(&[proxy(server.uri())]);

        let outcome: Arc<Mutex<Option<Result<(), PublishError>>>> = Arc::new(Mutex::new(None));
        let slot = outcome.clone();
        pub_control.publish_with_callback(
            "room",
            Item::new(vec![Format::ws_message("x")]),
            move |result| *slot.lock() = Some(result),
        );
        pub_control.finish().await;

        assert!(matches!(*outcome.lock(), Some(Ok(()))));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);

        // Tracker accepts new work after finish.
        let slot = outcome.clone();
        pub_control.publish_with_callback(
            "room",
            Item::new(vec![Format::ws_message("y")]),
            move |result| *slot.lock() = Some(result),
        );
        pub_control.finish().await;
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[test]
    fn callback_publish_without_runtime_reports_error() {
        let pub_control = GripPubControl::new().unwrap();
        let outcome = Arc::new(Mutex::new(None));
        let slot = outcome.clone();
        pub_control.publish_with_callback(
            "room",
            Item::new(vec![Format::ws_message("x")]),
            move |result| *slot.lock() = Some(result),
        );
        assert!(matches!(*outcome.lock(), Some(Err(PublishError::NoRuntime))));
    }
}
