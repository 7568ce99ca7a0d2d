use std::sync::Arc;

use tracing::{error, info};

use crate::{
    config::Config,
    controller::Controller,
    device::{switch::Switch, Device},
    error::Error,
    registry::Registry,
    serial::Link,
};

/// The box and the devices it is exposed as.
#[derive(Debug)]
pub struct Gateway {
    controller: Arc<Controller>,
    registry: Registry,

    /// The registered switches, by relay channel.
    switches: Vec<Arc<Switch>>,
    config: Config,
}

impl Gateway {
    /// Take over the link, and register a switch per configured relay channel.
    pub async fn new<L: Link>(link: L, config: &Config) -> Result<Self, Error> {
        let controller = Arc::new(Controller::new(link, config.serial.write_timeout()));
        let registry = Registry::new();
        let mut switches = vec![];

        for number in config.device_numbers() {
            let switch = Arc::new(Switch::new(controller.clone(), number));
            registry.register(switch.clone() as Arc<dyn Device>).await?;
            switches.push(switch);
        }
        switches.sort_by_key(|switch| switch.device_number());

        Ok(Self {
            controller,
            registry,
            switches,
            config: config.clone(),
        })
    }

    /// The devices, for routing requests to.
    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    /// The controller all devices share.
    pub fn controller(&self) -> Arc<Controller> {
        self.controller.clone()
    }

    /// Initialize every switch, in channel order.
    ///
    /// Stops at the first switch whose handshake fails.
    pub async fn initialize(&self) -> Result<(), Error> {
        let timeout = self.config.serial.read_timeout();

        for switch in &self.switches {
            if let Err(e) = switch.handshake(timeout).await {
                error!(switch = switch.device_number(), cause = %e, "Initialization failed");

                return Err(Error::InitializationFailed {
                    device_type: switch.device_type().into(),
                    device_number: switch.device_number(),
                    cause: e.to_string(),
                });
            }
        }

        info!(devices = self.switches.len(), "All devices initialized");

        Ok(())
    }

    /// Stop all devices from accepting actions.
    pub async fn shutdown(&self) {
        self.registry.shutdown_all().await;
    }
}
