use std::{collections::HashMap, fmt::Display, sync::Arc};

use tokio::sync::RwLock;
use tracing::info;

use crate::{device::Device, error::Error};

/// Identifies a registered device.
/// The device type is compared ignoring (ASCII) case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey {
    device_type: String,
    device_number: u32,
}

impl DeviceKey {
    /// A key for the given type and number.
    pub fn new(device_type: &str, device_number: u32) -> Self {
        Self {
            device_type: device_type.to_ascii_lowercase(),
            device_number,
        }
    }

    /// The key a device is registered under.
    pub fn of(device: &dyn Device) -> Self {
        Self::new(device.device_type(), device.device_number())
    }

    /// The normalized (lowercase) device type.
    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    /// The device number.
    pub fn device_number(&self) -> u32 {
        self.device_number
    }
}

impl Display for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.device_type, self.device_number)
    }
}

/// All devices the gateway exposes.
///
/// Clones share the same devices.
/// Devices are registered at startup, before requests are served.
#[derive(Clone, Default)]
pub struct Registry {
    devices: Arc<RwLock<HashMap<DeviceKey, Arc<dyn Device>>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a device routable.
    ///
    /// Fails if a device with the same key is registered already,
    /// in which case the existing one stays.
    pub async fn register(&self, device: Arc<dyn Device>) -> Result<(), Error> {
        let key = DeviceKey::of(device.as_ref());
        let mut devices = self.devices.write().await;

        if devices.contains_key(&key) {
            return Err(Error::AlreadyRegistered {
                device_type: device.device_type().into(),
                device_number: device.device_number(),
            });
        }

        info!(
            device_type = device.device_type(),
            device_number = device.device_number(),
            "Registered"
        );
        devices.insert(key, device);

        Ok(())
    }

    /// Find the device registered under the key.
    pub async fn get(&self, key: &DeviceKey) -> Option<Arc<dyn Device>> {
        self.devices.read().await.get(key).cloned()
    }

    /// How many devices are registered.
    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    /// True if nothing is registered.
    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }

    /// The keys of all registered devices, sorted.
    pub async fn keys(&self) -> Vec<DeviceKey> {
        let mut keys = self
            .devices
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        keys.sort();

        keys
    }

    /// Shut down every registered device.
    pub async fn shutdown_all(&self) {
        for device in self.devices.read().await.values() {
            device.shutdown();
        }
    }
}
