//! Announces the gateway on the local network with mDNS/DNS-SD,
//! so Alpaca clients find it without being told the address.
//!
//! Service type: `_alpaca._tcp.local.`
//!
//! TXT records:
//! - `DeviceType`: the type of the advertised device
//! - `DeviceNumber`: its number
//! - `Manufacturer`: who made the box
//! - `Version`: gateway version

use std::collections::HashMap;

use mdns_sd::{ServiceDaemon, ServiceInfo};
use tokio::sync::RwLock;
use tracing::{info, trace, warn};

use crate::error::Error;

/// mDNS service type for Alpaca devices.
pub const SERVICE_TYPE: &str = "_alpaca._tcp.local.";

/// What the advertisement says about the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxtRecord {
    /// Like "Switch".
    pub device_type: String,

    /// The first exposed device.
    pub device_number: u32,

    /// Who made the box.
    pub manufacturer: String,
}

impl TxtRecord {
    fn properties(&self) -> HashMap<String, String> {
        HashMap::from([
            ("DeviceType".to_string(), self.device_type.clone()),
            ("DeviceNumber".to_string(), self.device_number.to_string()),
            ("Manufacturer".to_string(), self.manufacturer.clone()),
            ("Version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
        ])
    }
}

/// mDNS advertiser for the gateway.
pub struct MdnsAdvertiser {
    daemon: ServiceDaemon,

    /// Full name of the registered service, if any.
    registered_service: RwLock<Option<String>>,
}

impl MdnsAdvertiser {
    /// Start the mDNS daemon.
    pub fn new() -> Result<Self, Error> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| Error::Discovery(format!("failed to create mDNS daemon: {e}")))?;

        Ok(Self {
            daemon,
            registered_service: RwLock::new(None),
        })
    }

    /// Advertise `name` at `port` on this host.
    pub async fn start(&self, name: &str, port: u16, record: &TxtRecord) -> Result<(), Error> {
        let hostname = hostname::get()
            .map_or_else(|_| "ppba-alpaca".to_string(), |h| h.to_string_lossy().to_string());

        let service = ServiceInfo::new(
            SERVICE_TYPE,
            name,
            &format!("{hostname}.local."),
            "",
            port,
            record.properties(),
        )
        .map_err(|e| Error::Discovery(format!("failed to create service info: {e}")))?
        .enable_addr_auto();

        let fullname = service.get_fullname().to_string();

        self.daemon
            .register(service)
            .map_err(|e| Error::Discovery(format!("failed to register mDNS service: {e}")))?;

        *self.registered_service.write().await = Some(fullname);

        info!(service_type = SERVICE_TYPE, instance = name, port, "mDNS service registered");

        Ok(())
    }

    /// Withdraw the advertisement, if there is one.
    pub async fn stop(&self) {
        let fullname = self.registered_service.write().await.take();

        if let Some(name) = fullname {
            match self.daemon.unregister(&name) {
                Ok(_) => info!("mDNS service unregistered"),
                Err(e) => warn!(error = %e, "failed to unregister mDNS service"),
            }
        }
    }

    /// Check if currently advertising.
    pub async fn is_advertising(&self) -> bool {
        self.registered_service.read().await.is_some()
    }
}

impl Drop for MdnsAdvertiser {
    fn drop(&mut self) {
        if let Some(name) = self.registered_service.get_mut().take() {
            let _ = self.daemon.unregister(&name);
        }

        if let Err(e) = self.daemon.shutdown() {
            trace!(error = %e, "mDNS daemon shutdown error");
        }
    }
}
