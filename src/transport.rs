//! The byte pipe between host and adapter.
//!
//! The Arduiggler protocol assumes a reliable, in-order byte stream: there is no framing and no
//! retransmission.  Anything that can move bytes that way can carry it.  Timeouts are the
//! business of the implementation, the protocol layer simply blocks in `read_byte`.
use alloc::boxed::Box;

use crate::error::TransportError;

pub mod fake;
#[cfg(feature = "std")]
pub mod ft232r;

pub use fake::FakeAdapter;
#[cfg(feature = "std")]
pub use ft232r::Ft232Link;

pub trait Transport {
    /// Make sure the device behind the link exists.  Called once, when a cable session is
    /// created.  Nothing is opened yet.
    fn acquire(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Open the link.  Opening an already open link is not an error.
    fn open(&mut self) -> Result<(), TransportError>;

    /// Close the link.  Closing a link that is not open does nothing.
    fn close(&mut self);

    /// Set the symbol rate of the link.  Only valid on an open link.
    fn configure_speed(&mut self, baud: u32) -> Result<(), TransportError>;

    /// Write all of `bytes` or fail.
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Block until one byte arrives.
    fn read_byte(&mut self) -> Result<u8, TransportError>;

    /// Fill `buf` completely, one byte at a time.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        for byte in buf.iter_mut() {
            *byte = self.read_byte()?;
        }
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn acquire(&mut self) -> Result<(), TransportError> {
        (**self).acquire()
    }

    fn open(&mut self) -> Result<(), TransportError> {
        (**self).open()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn configure_speed(&mut self, baud: u32) -> Result<(), TransportError> {
        (**self).configure_speed(baud)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        (**self).read_byte()
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        (**self).read_exact(buf)
    }
}
