//! A mock box, useful to test the gateway without the actual hardware.
//!
//! The mock reads command lines from an in-memory stream and answers them
//! according to a script.
//! Everything crossing the wire is recorded, in order.

use std::{collections::HashMap, fmt::Display, sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use tokio::{
    io::{duplex, DuplexStream},
    sync::Mutex,
};
use tokio_util::codec::Decoder;
use tracing::{debug, info, info_span, trace, warn, Instrument};

use crate::{controller::ACK, serial::codecs::lines::LinesCodec};

/// How the mock answers a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockReply {
    line: Option<String>,
    delay: Duration,
}

impl MockReply {
    /// Answer with the acknowledgement.
    pub fn ack() -> Self {
        Self::line(ACK)
    }

    /// Answer with the given line.
    pub fn line(line: &str) -> Self {
        Self {
            line: Some(line.into()),
            delay: Duration::ZERO,
        }
    }

    /// Never answer.
    pub fn silent() -> Self {
        Self {
            line: None,
            delay: Duration::ZERO,
        }
    }

    /// Wait this long before answering.
    /// The mock handles nothing else meanwhile, like the real box.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Something which crossed the wire between the gateway and the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    /// A line the mock received.
    ToBox(String),

    /// A line the mock answered with.
    FromBox(String),
}

impl Display for WireEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireEvent::ToBox(line) => write!(f, "ToBox: {line}"),
            WireEvent::FromBox(line) => write!(f, "FromBox: {line}"),
        }
    }
}

/// Builder for a [`MockBoxHandle`].
#[derive(Debug)]
pub struct MockBoxBuilder {
    replies: HashMap<String, MockReply>,
    fallback: MockReply,
}

impl Default for MockBoxBuilder {
    fn default() -> Self {
        Self {
            replies: HashMap::new(),
            fallback: MockReply::ack(),
        }
    }
}

impl MockBoxBuilder {
    /// A mock which acknowledges everything, unless told otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer this exact command line like so.
    pub fn on(mut self, command: &str, reply: MockReply) -> Self {
        self.replies.insert(command.into(), reply);
        self
    }

    /// Answer any command without a specific reply like so.
    pub fn otherwise(mut self, reply: MockReply) -> Self {
        self.fallback = reply;
        self
    }

    /// Run the mock.
    ///
    /// Returns the gateway's end of the link, and a handle for inspecting the traffic.
    #[must_use]
    pub fn build(self) -> (DuplexStream, MockBoxHandle) {
        let (gateway_side, box_side) = duplex(1024);
        let events = Arc::new(Mutex::new(vec![]));
        let events_task = events.clone();

        info!(scripted = self.replies.len(), "Running mock box");

        tokio::spawn(
            async move {
                let mut wire = LinesCodec::default().framed(box_side);

                while let Some(line) = wire.next().await {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            warn!(%e, "Mock box could not read");
                            break;
                        }
                    };
                    trace!(%line, "Mock box received");
                    events_task.lock().await.push(WireEvent::ToBox(line.clone()));

                    let reply = self.replies.get(&line).unwrap_or(&self.fallback).clone();

                    if !reply.delay.is_zero() {
                        tokio::time::sleep(reply.delay).await;
                    }

                    if let Some(answer) = reply.line {
                        events_task
                            .lock()
                            .await
                            .push(WireEvent::FromBox(answer.clone()));

                        if let Err(e) = wire.send(answer).await {
                            warn!(%e, "Mock box could not answer");
                            break;
                        }
                    }
                }

                debug!("Mock box stopped");
            }
            .instrument(info_span!("mock-box")),
        );

        (gateway_side, MockBoxHandle { events })
    }
}

/// Inspects a running mock box.
#[derive(Debug, Clone)]
pub struct MockBoxHandle {
    events: Arc<Mutex<Vec<WireEvent>>>,
}

impl MockBoxHandle {
    /// Everything which crossed the wire so far, in order.
    pub async fn events(&self) -> Vec<WireEvent> {
        self.events.lock().await.clone()
    }

    /// The command lines the mock received so far, in order.
    pub async fn received(&self) -> Vec<String> {
        self.events()
            .await
            .into_iter()
            .filter_map(|event| match event {
                WireEvent::ToBox(line) => Some(line),
                WireEvent::FromBox(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::time::timeout;

    use super::*;

    async fn send_receive(
        wire: &mut tokio_util::codec::Framed<DuplexStream, LinesCodec>,
        line: &str,
    ) -> Option<String> {
        wire.send(line).await.unwrap();

        match timeout(Duration::from_millis(200), wire.next()).await {
            Ok(Some(reply)) => Some(reply.unwrap()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn acknowledges_by_default() {
        let (link, mock) = MockBoxBuilder::new().build();
        let mut wire = LinesCodec::default().framed(link);

        assert_eq!(send_receive(&mut wire, "P#").await.as_deref(), Some(ACK));
        assert_eq!(
            mock.events().await,
            vec![
                WireEvent::ToBox("P#".into()),
                WireEvent::FromBox(ACK.into())
            ]
        );
    }

    #[tokio::test]
    async fn scripted_replies() {
        let (link, mock) = MockBoxBuilder::new()
            .on("O1#", MockReply::line("NOPE"))
            .on("F1#", MockReply::silent())
            .build();
        let mut wire = LinesCodec::default().framed(link);

        assert_eq!(send_receive(&mut wire, "O1#").await.as_deref(), Some("NOPE"));
        assert_eq!(send_receive(&mut wire, "F1#").await, None);
        assert_eq!(send_receive(&mut wire, "O2#").await.as_deref(), Some(ACK));

        assert_eq!(mock.received().await, vec!["O1#", "F1#", "O2#"]);
    }
}
