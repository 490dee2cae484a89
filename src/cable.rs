//! The `Cable` trait is the set of primitives a JTAG layer needs from an adapter: clock TCK with
//! a given TMS/TDI, sample TDO, and force the control lines directly.  `Arduiggler` implements
//! it on top of the command protocol.
use alloc::vec;
use alloc::vec::Vec;

use bitflags::bitflags;

use crate::error::{Error, ProtocolError};

pub mod arduiggler;

pub use arduiggler::{Arduiggler, SessionState};

bitflags! {
    /// Control lines of a JTAG pod.  These are the only lines the Arduiggler drives, any other
    /// bit is masked off before it reaches the wire.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Signals: u8 {
        const TDI = 1 << 0;
        const TCK = 1 << 1;
        const TMS = 1 << 2;
        const TRST = 1 << 3;
        const RESET = 1 << 4;
    }
}

pub trait Cable {
    /// Bring the adapter up.  Has to succeed before anything else is used.
    fn init(&mut self) -> Result<(), Error>;

    /// Set the TCK frequency in hertz.
    fn set_frequency(&mut self, hz: u32) -> Result<(), Error>;

    /// Give `n` TCK pulses with TMS and TDI held at the given levels.  Returns how many pulses
    /// the adapter acknowledged, which is less than `n` if it refused part of the run.
    fn clock(&mut self, tms: bool, tdi: bool, n: u32) -> Result<u32, Error>;

    /// Sample the TDO line.
    fn sample_tdo(&mut self) -> Result<bool, Error>;

    /// Drive the lines in `mask` to the levels in `value`.  Returns the line state that was
    /// sent to the adapter.
    fn set_signals(&mut self, mask: Signals, value: Signals) -> Result<Signals, Error>;

    /// Whether any of the lines in `signal` was left high by the last `set_signals`.
    fn signal(&self, signal: Signals) -> bool;

    /// Shift `bits` bits of `tdi` out with TMS low, least significant bit of the first byte
    /// first.  Missing bytes in `tdi` shift zeros.  With `capture`, TDO is sampled before each
    /// clock and the captured bits are returned packed the same way, otherwise the result is
    /// empty.
    fn transfer(&mut self, tdi: &[u8], bits: usize, capture: bool) -> Result<Vec<u8>, Error> {
        let mut tdo = if capture {
            vec![0; bits.div_ceil(8)]
        } else {
            Vec::new()
        };

        for bit in 0..bits {
            let byte = bit / 8;
            let mask = 1 << (bit % 8);

            if capture && self.sample_tdo()? {
                tdo[byte] |= mask;
            }

            let level = tdi.get(byte).is_some_and(|x| x & mask != 0);
            if self.clock(false, level, 1)? != 1 {
                return Err(ProtocolError::Truncated {
                    requested: bits as u32,
                    completed: bit as u32,
                }
                .into());
            }
        }
        Ok(tdo)
    }
}
