use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::Device;
use crate::{
    controller::{is_ack, Command, Controller},
    error::Error,
};

/// The device type switches are registered under.
pub const SWITCH: &str = "Switch";

/// One relay channel on the box.
///
/// Many switches share one [`Controller`].
#[derive(Debug)]
pub struct Switch {
    number: u32,
    controller: Arc<Controller>,

    /// Held while an action on this switch is in progress.
    guard: Mutex<()>,

    initialized: AtomicBool,
    shut_down: AtomicBool,
}

impl Switch {
    /// A switch for relay channel `number`.
    pub fn new(controller: Arc<Controller>, number: u32) -> Self {
        Self {
            number,
            controller,
            guard: Mutex::new(()),
            initialized: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    fn ensure_available(&self) -> Result<(), Error> {
        if self.shut_down.load(Ordering::Acquire) {
            Err(Error::DeviceUnavailable {
                device_type: SWITCH.into(),
                device_number: self.number,
            })
        } else {
            Ok(())
        }
    }

    /// Ping the box on behalf of this switch.
    ///
    /// Marks the switch initialized on success, the error says why it is not.
    pub async fn handshake(&self, timeout: Duration) -> Result<(), Error> {
        self.ensure_available()?;

        let _guard = self.guard.lock().await;
        // May have been shut down while waiting for the guard.
        self.ensure_available()?;
        info!(switch = self.number, "Initializing (ping)");

        let outcome = self.controller.handshake(timeout).await;
        match &outcome {
            Ok(()) => info!(switch = self.number, "Initialized"),
            Err(e) => error!(switch = self.number, cause = %e, "Ping failed, no acknowledgement"),
        }
        self.initialized.store(outcome.is_ok(), Ordering::Release);

        outcome
    }

    async fn relay(&self, command: Command, timeout: Duration) -> Result<bool, Error> {
        self.ensure_available()?;

        let _guard = self.guard.lock().await;
        self.ensure_available()?;
        info!(switch = self.number, %command, "Sending relay command");

        match self.controller.send_command(&command, timeout).await {
            Ok(response) if is_ack(&response) => {
                info!(switch = self.number, %command, "Relay command succeeded");
                Ok(true)
            }
            Ok(response) => {
                warn!(
                    switch = self.number,
                    %command,
                    response = %response.trim(),
                    "Unexpected response to relay command"
                );
                Ok(false)
            }
            Err(e) => {
                warn!(switch = self.number, %command, %e, "Relay command failed");
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl Device for Switch {
    fn device_type(&self) -> &'static str {
        SWITCH
    }

    fn device_number(&self) -> u32 {
        self.number
    }

    async fn initialize(&self, timeout: Duration) -> Result<bool, Error> {
        match self.handshake(timeout).await {
            Ok(()) => Ok(true),
            Err(e @ Error::DeviceUnavailable { .. }) => Err(e),
            Err(_) => Ok(false),
        }
    }

    async fn turn_on(&self, timeout: Duration) -> Result<bool, Error> {
        self.relay(Command::RelayOn(self.number), timeout).await
    }

    async fn turn_off(&self, timeout: Duration) -> Result<bool, Error> {
        self.relay(Command::RelayOff(self.number), timeout).await
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            info!(switch = self.number, "Shut down");
        }
    }
}
