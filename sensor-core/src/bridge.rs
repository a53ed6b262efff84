//! Desktop Bridge
//!
//! The rendering side of the desktop app reaches the sensor through exactly
//! four request/response channels. [`BridgeHandle`] is the caller's end; each
//! call forwards to its named channel unchanged and waits for the reply.
//! [`serve`] is the sensor's end and answers from the [`SensorManager`].

use tokio::sync::{mpsc, oneshot};

use crate::manager::{SensorManager, SensorStatusReport};

pub const GET_SENSOR_STATUS: &str = "get-sensor-status";
pub const GET_SENSOR_ID: &str = "get-sensor-id";
pub const GET_HQ_SERVER_URL: &str = "get-hq-server-url";
pub const UPDATE_HQ_SERVER_URL: &str = "update-hq-server-url";

/// One in-flight bridge call and the slot its reply goes to
#[derive(Debug)]
pub enum BridgeRequest {
    GetSensorStatus(oneshot::Sender<Option<SensorStatusReport>>),
    GetSensorId(oneshot::Sender<Option<String>>),
    GetHqServerUrl(oneshot::Sender<Option<String>>),
    UpdateHqServerUrl {
        url: String,
        reply: oneshot::Sender<bool>,
    },
}

impl BridgeRequest {
    pub fn channel(&self) -> &'static str {
        match self {
            Self::GetSensorStatus(_) => GET_SENSOR_STATUS,
            Self::GetSensorId(_) => GET_SENSOR_ID,
            Self::GetHqServerUrl(_) => GET_HQ_SERVER_URL,
            Self::UpdateHqServerUrl { .. } => UPDATE_HQ_SERVER_URL,
        }
    }
}

/// Caller's end of the bridge
#[derive(Clone)]
pub struct BridgeHandle {
    tx: mpsc::Sender<BridgeRequest>,
}

/// Create a bridge; hand the receiver to [`serve`]
pub fn channel(buffer: usize) -> (BridgeHandle, mpsc::Receiver<BridgeRequest>) {
    let (tx, rx) = mpsc::channel(buffer);
    (BridgeHandle { tx }, rx)
}

impl BridgeHandle {
    pub async fn get_sensor_status(&self) -> Result<Option<SensorStatusReport>, BridgeError> {
        self.invoke(GET_SENSOR_STATUS, BridgeRequest::GetSensorStatus).await
    }

    pub async fn get_sensor_id(&self) -> Result<Option<String>, BridgeError> {
        self.invoke(GET_SENSOR_ID, BridgeRequest::GetSensorId).await
    }

    pub async fn get_hq_server_url(&self) -> Result<Option<String>, BridgeError> {
        self.invoke(GET_HQ_SERVER_URL, BridgeRequest::GetHqServerUrl).await
    }

    pub async fn update_hq_server_url(&self, url: impl Into<String>) -> Result<bool, BridgeError> {
        let url = url.into();
        self.invoke(UPDATE_HQ_SERVER_URL, |reply| BridgeRequest::UpdateHqServerUrl { url, reply })
            .await
    }

    async fn invoke<T>(
        &self,
        channel: &'static str,
        request: impl FnOnce(oneshot::Sender<T>) -> BridgeRequest,
    ) -> Result<T, BridgeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(request(reply_tx))
            .await
            .map_err(|_| BridgeError::Disconnected(channel))?;
        reply_rx.await.map_err(|_| BridgeError::Disconnected(channel))
    }
}

/// Answer bridge calls until every handle is dropped.
/// Without a manager the getters reply `None` and the update replies `false`.
pub async fn serve(mut rx: mpsc::Receiver<BridgeRequest>, manager: Option<SensorManager>) {
    while let Some(request) = rx.recv().await {
        log::debug!("Bridge call: {}", request.channel());

        // a caller that gave up waiting is not an error
        match request {
            BridgeRequest::GetSensorStatus(reply) => {
                let _ = reply.send(manager.as_ref().map(|m| m.status()));
            }
            BridgeRequest::GetSensorId(reply) => {
                let _ = reply.send(manager.as_ref().and_then(|m| m.sensor_id()));
            }
            BridgeRequest::GetHqServerUrl(reply) => {
                let _ = reply.send(manager.as_ref().map(|m| m.hq_server_url()));
            }
            BridgeRequest::UpdateHqServerUrl { url, reply } => {
                let updated = match &manager {
                    Some(m) => m.update_hq_server_url(url).await,
                    None => false,
                };
                let _ = reply.send(updated);
            }
        }
    }
    log::info!("Bridge closed");
}

/// Bridge errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The serving side is gone; carries the channel that was called
    Disconnected(&'static str),
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected(channel) => write!(f, "Bridge disconnected on {}", channel),
        }
    }
}

impl std::error::Error for BridgeError {}
