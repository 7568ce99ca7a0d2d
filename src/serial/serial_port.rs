use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::info;

use crate::{config::SerialConfig, error::Error};

/// Open the serial port described by the config.
///
/// The box talks 8N1 without flow control.
/// Read and write timeouts are enforced per exchange by the controller, not by the port.
pub fn open(config: &SerialConfig) -> Result<SerialStream, Error> {
    info!(path = %config.path, baud = config.baud, "Opening serial port");

    let serial_stream = tokio_serial::new(&config.path, config.baud)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| Error::OpenPort {
            path: config.path.clone(),
            problem: e.to_string(),
        })?;

    info!(path = %config.path, "Serial port opened");

    Ok(serial_stream)
}
