use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Framed};

use crate::serial::codecs::lines::LinesCodec;

/// Serial link related errors.
pub mod error;

/// Opening the physical serial port.
pub mod serial_port;

/// Codecs for encoding/decoding messages to/from wire.
pub mod codecs;

/// A byte stream we can talk to the box over.
///
/// Implemented for anything which is readable, writable and movable across tasks:
/// a real serial port, or an in-memory stream in tests.
pub trait Link: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> Link for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

/// A link framed into lines.
pub type FramedLink = Framed<Box<dyn Link>, LinesCodec>;

/// Frame a link with the line codec used by the box.
pub fn framed<L: Link>(link: L) -> FramedLink {
    let link: Box<dyn Link> = Box::new(link);

    LinesCodec::default().framed(link)
}
