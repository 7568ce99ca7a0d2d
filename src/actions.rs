use std::{fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{device::Device, error::Error};

/// The actions a caller can ask of a device.
///
/// This is a closed set: the last path segment of a request
/// selects one of these, and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Confirm the box is there. Path segment `init`.
    Init,

    /// Switch on. Path segment `on`.
    On,

    /// Switch off. Path segment `off`.
    Off,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Init => write!(f, "init"),
            Action::On => write!(f, "on"),
            Action::Off => write!(f, "off"),
        }
    }
}

impl Action {
    /// Look up the action named by a path segment, ignoring case.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "init" => Some(Self::Init),
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }

    /// Perform this action on the device.
    pub async fn invoke(self, device: &dyn Device, timeout: Duration) -> Result<bool, Error> {
        match self {
            Action::Init => device.initialize(timeout).await,
            Action::On => device.turn_on(timeout).await,
            Action::Off => device.turn_off(timeout).await,
        }
    }
}

/// The JSON body of every HTTP response.
///
/// Serializes as `{"Value": true}` or `{"Error": "Device not found"}`.
/// A `Value` means the request reached the device, and tells whether the box accepted it.
/// An `Error` means it did not get that far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    /// The outcome of the action.
    Value(bool),

    /// Why the request could not be carried out.
    Error(String),
}

impl From<Result<bool, Error>> for Reply {
    fn from(result: Result<bool, Error>) -> Self {
        match result {
            Ok(value) => Self::Value(value),
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

impl Reply {
    /// An example of a successful action.
    pub fn example_value() -> Self {
        Self::Value(true)
    }

    /// An example of a request which could not be routed.
    pub fn example_error() -> Self {
        Self::Error(Error::InvalidPath.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn segments_are_case_insensitive() {
        assert_eq!(Action::from_segment("on"), Some(Action::On));
        assert_eq!(Action::from_segment("OFF"), Some(Action::Off));
        assert_eq!(Action::from_segment("Init"), Some(Action::Init));
    }

    #[test]
    fn only_known_segments() {
        for segment in ["TurnOn", "initialize", "delete", "", "dispose", "on "] {
            assert_eq!(Action::from_segment(segment), None, "{segment}");
        }
    }

    #[test]
    fn reply_shapes() {
        assert_eq!(
            serde_json::to_string(&Reply::Value(true)).unwrap(),
            r#"{"Value":true}"#
        );
        assert_eq!(
            serde_json::to_string(&Reply::Error("Unknown action".into())).unwrap(),
            r#"{"Error":"Unknown action"}"#
        );
    }

    #[test]
    fn reply_from_result() {
        assert_eq!(Reply::from(Ok(false)), Reply::Value(false));
        assert_eq!(
            Reply::from(Err(Error::InvalidPath)),
            Reply::Error("Invalid path format".into())
        );
    }
}
