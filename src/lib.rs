//! This crate drives the Arduiggler, a JTAG cable built from an Arduino sitting behind an FT232
//! USB-serial bridge.  The Arduino firmware speaks a tiny command/response protocol: every
//! command is an opcode byte plus a fixed number of parameter bytes, and every command is
//! acknowledged with a two-byte status word.
//!
//! The lowest level is the `protocol` module, which knows how commands are laid out on the wire,
//! how status words decode, and how a long run of clock pulses is split into chunks the one-byte
//! count field can carry.
//!
//! The `Transport` trait is the byte pipe underneath.  With the `std` feature the crate provides
//! `Ft232Link`, which talks to the real FT232 through the D2XX driver.  `FakeAdapter` plays the
//! firmware's side in memory, which is useful for tests and dry runs.
//!
//! `Arduiggler` ties the two together.  It owns the link, tracks whether the adapter has been
//! brought up, and implements the `Cable` trait with the primitives a JTAG layer needs: clocking
//! TMS/TDI, sampling TDO and forcing the control lines.
//!
//! # Example
//! ```no_run
//! use arduiggler::cable::{Arduiggler, Cable};
//! use arduiggler::transport::Ft232Link;
//!
//! let link = Ft232Link::new("FT232R USB UART");
//! let mut cable = Arduiggler::connect(link)?;
//! cable.init()?;
//! println!("firmware {}", cable.version().expect("recorded by init"));
//!
//! // Five clocks with TMS high put every TAP into Test-Logic-Reset
//! cable.clock(true, false, 5)?;
//! let tdo = cable.sample_tdo()?;
//! println!("tdo: {}", tdo as u8);
//! cable.disconnect();
//! # Ok::<(), arduiggler::Error>(())
//! ```

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod cable;
pub mod error;
pub mod protocol;
pub mod transport;

pub use cable::{Arduiggler, Cable, SessionState, Signals};
pub use error::{Error, ProtocolError, TransportError};
pub use transport::Transport;
