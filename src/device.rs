use std::time::Duration;

use async_trait::async_trait;

use crate::error::Error;

/// A relay channel exposed as a switch.
pub mod switch;

/// Something reachable at `/{device_type}/{device_number}/{action}`.
///
/// Every action answers whether the box accepted it.
/// An `Err` means the action could not be attempted at all.
#[async_trait]
pub trait Device: Send + Sync {
    /// The kind of device, like "Switch".
    /// Constant per implementation.
    fn device_type(&self) -> &'static str;

    /// The number of this device within its type.
    fn device_number(&self) -> u32;

    /// Confirm the box is there. May be repeated.
    async fn initialize(&self, timeout: Duration) -> Result<bool, Error>;

    /// Switch the device on.
    async fn turn_on(&self, timeout: Duration) -> Result<bool, Error>;

    /// Switch the device off.
    async fn turn_off(&self, timeout: Duration) -> Result<bool, Error>;

    /// Whether the last initialization succeeded.
    fn is_initialized(&self) -> bool;

    /// Stop accepting actions.
    /// Any action after this fails with [`Error::DeviceUnavailable`].
    fn shutdown(&self);
}
