//! Process-wide publisher, built on first use from the environment.

use std::sync::Arc;

use grip_core::Item;
use grip_pubcontrol::{GripPubControl, PublishError};
use parking_lot::Mutex;
use tracing::info;

use crate::config;
use crate::error::FaasError;

static PUBCONTROL: Mutex<Option<Arc<GripPubControl>>> = parking_lot::const_mutex(None);

/// The shared publisher. Created once under the lock; a failed build is
/// not cached, so the next call tries again.
pub fn get_pubcontrol() -> Result<Arc<GripPubControl>, FaasError> {
    let mut slot = PUBCONTROL.lock();
    if let Some(existing) = slot.as_ref() {
        return Ok(existing.clone());
    }

    let proxies = config::proxies_from_env()?;
    let mut pub_control = GripPubControl::new()?;
    pub_control.apply_grip_config(&proxies);
    info!(clients = pub_control.clients().len(), "initialized GRIP publisher");

    let pub_control = Arc::new(pub_control);
    *slot = Some(pub_control.clone());
    Ok(pub_control)
}

/// Publish `item` to `GRIP_PREFIX + channel` and wait for every proxy.
pub async fn publish(channel: &str, item: &Item) -> Result<(), FaasError> {
    let pub_control = get_pubcontrol()?;
    let channel = format!("{}{}", config::grip_prefix(), channel);
    pub_control.publish(&channel, item).await?;
    Ok(())
}

/// Publish in the background; `callback` receives the outcome.
pub fn publish_with_callback<F>(channel: &str, item: Item, callback: F) -> Result<(), FaasError>
where
    F: FnOnce(Result<(), PublishError>) + Send + 'static,
{
    let pub_control = get_pubcontrol()?;
    let channel = format!("{}{}", config::grip_prefix(), channel);
    pub_control.publish_with_callback(&channel, item, callback);
    Ok(())
}

/// Wait for background publishes. Call before the handler returns.
/// No-op when no publisher has been built yet.
pub async fn finish() {
    finish_slot(&PUBCONTROL).await;
}

async fn finish_slot(slot: &Mutex<Option<Arc<GripPubControl>>>) {
    let existing = slot.lock().clone();
    if let Some(pub_control) = existing {
        pub_control.finish().await;
    }
}
