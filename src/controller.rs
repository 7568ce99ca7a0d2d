use std::{fmt::Display, time::Duration};

use futures::{FutureExt, SinkExt, StreamExt};
use tokio::{sync::Mutex, time};
use tracing::{debug, trace, warn};

use crate::{
    error::{Error, Phase},
    serial::{self, FramedLink, Link},
};

/// What the box answers with when it accepted a command.
pub const ACK: &str = "PPBA_OK";

/// A message to the box.
///
/// Each renders to a single `#`-terminated ASCII line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Checks the link is alive.
    Ping,

    /// Close the given relay.
    RelayOn(u32),

    /// Open the given relay.
    RelayOff(u32),
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Ping => write!(f, "P#"),
            Command::RelayOn(n) => write!(f, "O{n}#"),
            Command::RelayOff(n) => write!(f, "F{n}#"),
        }
    }
}

/// Is the reply the acknowledgement?
/// Surrounding whitespace is ignored, everything else must match exactly.
pub fn is_ack(response: &str) -> bool {
    response.trim() == ACK
}

/// Owns the serial link and speaks the box's line protocol over it.
///
/// The box handles one command at a time and replies are not tagged,
/// so only one write+read exchange may be in flight.
/// The link lock is held for the whole exchange.
pub struct Controller {
    link: Mutex<FramedLink>,
    write_timeout: Duration,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Take ownership of a link.
    /// Writing a command may take at most `write_timeout`.
    pub fn new<L: Link>(link: L, write_timeout: Duration) -> Self {
        Self {
            link: Mutex::new(serial::framed(link)),
            write_timeout,
        }
    }

    /// Ping the box, and check it answers with [`ACK`].
    ///
    /// On failure the error says why, for the caller to decide whether that is fatal.
    pub async fn handshake(&self, timeout: Duration) -> Result<(), Error> {
        let outcome = match self.send_command(&Command::Ping, timeout).await {
            Ok(response) if is_ack(&response) => Ok(()),
            Ok(response) => Err(Error::UnexpectedResponse {
                command: Command::Ping.to_string(),
                response: response.trim().to_string(),
            }),
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(()) => debug!("Handshake ok"),
            Err(e) => warn!(%e, "Handshake failed"),
        }

        outcome
    }

    /// Write a command, then wait at most `timeout` for a reply line.
    ///
    /// The reply is returned as received, minus the newline.
    /// Concurrent callers are served one at a time.
    pub async fn send_command(&self, command: &Command, timeout: Duration) -> Result<String, Error> {
        let mut link = self.link.lock().await;

        discard_stale_lines(&mut link);

        let line = command.to_string();
        trace!(%line, "Putting on wire");

        match time::timeout(self.write_timeout, link.send(line.as_str())).await {
            Err(_) => {
                // Whatever did not make it out should not precede the next command.
                link.write_buffer_mut().clear();

                return Err(Error::Timeout {
                    phase: Phase::Write,
                    after_ms: millis(self.write_timeout),
                });
            }
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(())) => {}
        }

        match time::timeout(timeout, link.next()).await {
            Err(_) => Err(Error::Timeout {
                phase: Phase::Read,
                after_ms: millis(timeout),
            }),
            Ok(None) => Err(Error::LinkClosed),
            Ok(Some(Err(e))) => Err(e.into()),
            Ok(Some(Ok(response))) => {
                trace!(%response, "Came from wire");
                Ok(response)
            }
        }
    }
}

/// Lines already waiting on the link are late replies to exchanges which timed out.
/// Left alone they would be taken as the reply to the next command.
fn discard_stale_lines(link: &mut FramedLink) {
    while let Some(Some(stale)) = link.next().now_or_never() {
        match stale {
            Ok(line) => debug!(%line, "Discarding stale line"),
            Err(e) => {
                warn!(%e, "Problem while discarding stale lines");
                break;
            }
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBoxBuilder, MockReply};

    #[test]
    fn commands_render() {
        assert_eq!(Command::Ping.to_string(), "P#");
        assert_eq!(Command::RelayOn(3).to_string(), "O3#");
        assert_eq!(Command::RelayOff(12).to_string(), "F12#");
    }

    #[test]
    fn ack_is_exact_apart_from_whitespace() {
        assert!(is_ack("PPBA_OK"));
        assert!(is_ack("PPBA_OK\r"));
        assert!(is_ack("  PPBA_OK \r"));

        assert!(!is_ack("ppba_ok"));
        assert!(!is_ack("PPBA_OK!"));
        assert!(!is_ack("PPBA_ERR"));
        assert!(!is_ack(""));
    }

    #[tokio::test]
    async fn handshake_reports_its_own_failure() {
        let (link, _mock) = MockBoxBuilder::new()
            .on("P#", MockReply::line("HELLO\r"))
            .build();
        let controller = Controller::new(link, Duration::from_millis(200));

        assert_eq!(
            controller.handshake(Duration::from_millis(200)).await,
            Err(Error::UnexpectedResponse {
                command: "P#".into(),
                response: "HELLO".into(),
            })
        );
    }

    #[tokio::test]
    async fn handshake_timeout_names_the_read() {
        let (link, _mock) = MockBoxBuilder::new().on("P#", MockReply::silent()).build();
        let controller = Controller::new(link, Duration::from_millis(200));

        assert_eq!(
            controller.handshake(Duration::from_millis(50)).await,
            Err(Error::Timeout {
                phase: Phase::Read,
                after_ms: 50,
            })
        );
    }
}
