use std::time::Duration;

use axum::http::StatusCode;
use tracing::{debug, error};

use crate::{
    actions::{Action, Reply},
    error::Error,
    registry::{DeviceKey, Registry},
};

/// Used when a request does not say how long to wait for the box.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// A request path taken apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedRequest {
    /// First segment.
    pub device_type: String,

    /// Second segment.
    pub device_number: u32,

    /// Third segment, not yet looked up.
    pub action: String,

    /// From the `timeout` query parameter, else [`DEFAULT_TIMEOUT`].
    pub timeout: Duration,
}

impl RoutedRequest {
    /// Parse `/{device_type}/{device_number}/{action}`.
    ///
    /// Empty segments are ignored, so leading, trailing and doubled slashes are fine.
    /// A `timeout` (milliseconds) which is not a non-negative integer is ignored.
    pub fn parse(path: &str, timeout: Option<&str>) -> Result<Self, Error> {
        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>();

        let [device_type, device_number, action] = segments[..] else {
            return Err(Error::InvalidPath);
        };

        let device_number = device_number
            .parse::<u32>()
            .map_err(|_| Error::InvalidDeviceNumber(device_number.into()))?;

        let timeout = timeout
            .and_then(|ms| ms.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);

        Ok(Self {
            device_type: device_type.into(),
            device_number,
            action: action.into(),
            timeout,
        })
    }

    /// The registry key of the targeted device.
    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(&self.device_type, self.device_number)
    }
}

/// Carry out the request at `path` against the registry.
///
/// Always produces a status code and a [`Reply`]:
/// malformed requests are a 400, unknown devices and actions a 404,
/// and anything going wrong past that point a 500.
pub async fn route(registry: &Registry, path: &str, timeout: Option<&str>) -> (StatusCode, Reply) {
    match dispatch(registry, path, timeout).await {
        Ok(value) => (StatusCode::OK, Reply::Value(value)),
        Err(e) => {
            if e.is_client_error() {
                debug!(%path, ?e, "Could not route request");
            } else {
                error!(%path, %e, "Request failed");
            }

            (e.status_code(), Reply::Error(e.to_string()))
        }
    }
}

async fn dispatch(registry: &Registry, path: &str, timeout: Option<&str>) -> Result<bool, Error> {
    let request = RoutedRequest::parse(path, timeout)?;

    let device = registry
        .get(&request.key())
        .await
        .ok_or_else(|| Error::DeviceNotFound {
            device_type: request.device_type.clone(),
            device_number: request.device_number,
        })?;

    let action =
        Action::from_segment(&request.action).ok_or_else(|| Error::UnknownAction(request.action.clone()))?;

    debug!(device = %request.key(), %action, timeout = ?request.timeout, "Invoking");

    action.invoke(device.as_ref(), request.timeout).await
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_three_segments() {
        let request = RoutedRequest::parse("/Switch/2/on", None).unwrap();

        assert_eq!(
            request,
            RoutedRequest {
                device_type: "Switch".into(),
                device_number: 2,
                action: "on".into(),
                timeout: DEFAULT_TIMEOUT,
            }
        );
        assert_eq!(request.key(), DeviceKey::new("switch", 2));
    }

    #[test]
    fn parse_ignores_empty_segments() {
        for path in ["switch/0/off", "/switch/0/off/", "//switch//0/off//"] {
            let request = RoutedRequest::parse(path, None).unwrap();

            assert_eq!(request.action, "off", "{path}");
        }
    }

    #[test]
    fn parse_wrong_segment_count() {
        for path in ["", "/", "/switch", "/switch/0", "/switch/0/on/now", "/a/b/c/d/e"] {
            assert_eq!(
                RoutedRequest::parse(path, None),
                Err(Error::InvalidPath),
                "{path}"
            );
        }
    }

    #[test]
    fn parse_bad_device_number() {
        for number in ["abc", "-1", "1.5", "0x1", "99999999999"] {
            let path = format!("/switch/{number}/on");

            assert_eq!(
                RoutedRequest::parse(&path, None),
                Err(Error::InvalidDeviceNumber(number.into())),
                "{path}"
            );
        }
    }

    #[test]
    fn parse_timeout() {
        let timeout_of = |param| RoutedRequest::parse("/switch/0/on", param).unwrap().timeout;

        assert_eq!(timeout_of(Some("250")), Duration::from_millis(250));
        assert_eq!(timeout_of(Some("0")), Duration::ZERO);
        assert_eq!(timeout_of(Some("soon")), DEFAULT_TIMEOUT);
        assert_eq!(timeout_of(Some("-5")), DEFAULT_TIMEOUT);
        assert_eq!(timeout_of(None), DEFAULT_TIMEOUT);
    }

    #[tokio::test]
    async fn route_on_empty_registry() {
        let registry = Registry::new();

        assert_eq!(
            route(&registry, "/switch/0/on", None).await,
            (StatusCode::NOT_FOUND, Reply::Error("Device not found".into()))
        );
        assert_eq!(
            route(&registry, "/switch/zero/on", None).await,
            (
                StatusCode::BAD_REQUEST,
                Reply::Error("Invalid device number".into())
            )
        );
        assert_eq!(
            route(&registry, "/switch/on", None).await,
            (StatusCode::BAD_REQUEST, Reply::Error("Invalid path format".into()))
        );
    }
}
