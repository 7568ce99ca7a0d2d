#![deny(missing_docs)]

//! This crate exposes the relay channels of a serial-attached power box over HTTP.
//!
//! Each relay channel is a switch device, reachable at
//! `/{deviceType}/{deviceNumber}/{action}` where the action is one of `init`, `on` or `off`.
//! An optional `timeout` query parameter (milliseconds) bounds the wait for the box.
//!
//! Responses are JSON: `{"Value": bool}` when the request reached the device,
//! `{"Error": "..."}` when it could not be routed or carried out.
//!
//! The box speaks a newline terminated line protocol over the serial port.
//! Only one command may be in flight at a time, so all devices share one
//! [`controller::Controller`] which serializes access to the link.

/// The actions a caller can ask of a device,
/// as well as the responses.
pub mod actions;

/// The command line interface.
pub mod cli;

/// Relates to config files.
pub mod config;

/// The line protocol spoken with the box.
pub mod controller;

/// Devices exposed by the gateway.
pub mod device;

/// Advertising the gateway on the local network.
pub mod discovery;

/// Possible errors in this library.
pub mod error;

/// Wires the box up to devices.
pub mod gateway;

/// Logging/tracing setup.
pub mod logging;

/// A simulated box.
pub mod mock;

/// The device table.
pub mod registry;

/// Turns request paths into device actions.
pub mod router;

/// Serial link to the box.
pub mod serial;

/// The HTTP server.
pub mod server;
