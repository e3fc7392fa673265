//! The remote calls the workflow is built from.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::{Action, Droplet, DropletStatus};

/// A call DigitalOcean refused or that never reached it.
///
/// `message` is the provider's own text and travels verbatim into logs and
/// errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl ApiFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiFailure>;

/// How a droplet is powered off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopMethod {
    /// Ask the guest OS to shut down.
    #[default]
    Shutdown,
    /// Cut power, like pulling the plug.
    PowerOff,
}

impl StopMethod {
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::PowerOff => "power_off",
        }
    }
}

/// Transport for the DigitalOcean droplet API.
///
/// One method per remote call. Calls that start an action return it as
/// accepted; completion is observed by polling [`DropletApi::action`].
pub trait DropletApi {
    /// Droplet with its snapshots, newest first.
    fn droplet(&self, droplet_id: u64) -> ApiResult<Droplet>;

    fn droplets(&self) -> ApiResult<Vec<Droplet>>;

    fn power_state(&self, droplet_id: u64) -> ApiResult<DropletStatus>;

    fn power_on(&self, droplet_id: u64) -> ApiResult<Action>;

    fn power_off(&self, droplet_id: u64, method: StopMethod) -> ApiResult<Action>;

    fn snapshot(&self, droplet_id: u64, name: &str) -> ApiResult<Action>;

    fn action(&self, action_id: u64) -> ApiResult<Action>;

    /// `Ok(true)` when DigitalOcean confirmed the deletion.
    fn delete_image(&self, image_id: u64) -> ApiResult<bool>;
}
