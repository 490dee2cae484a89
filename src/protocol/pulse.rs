//! Splitting clock pulse runs into SEND_PULSES commands.
//!
//! The count parameter of SEND_PULSES is one byte, so a run longer than 255 pulses goes out as
//! several commands.  Each one has to be acknowledged before the next is sent.
use crate::cable::Signals;

use super::Command;

pub const MAX_PULSES_PER_CHUNK: u32 = u8::MAX as u32;

/// One `clock()` call: which of TMS/TDI to hold and how many TCK pulses to give.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseRequest {
    signals: u8,
    total: u32,
}

impl PulseRequest {
    pub fn new(tms: bool, tdi: bool, total: u32) -> Self {
        let mut signals = Signals::empty();
        signals.set(Signals::TMS, tms);
        signals.set(Signals::TDI, tdi);
        Self {
            signals: signals.bits(),
            total,
        }
    }

    /// The signal byte carried by every chunk.
    pub fn signals(&self) -> u8 {
        self.signals
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn chunks(&self) -> Chunks {
        Chunks {
            signals: self.signals,
            remaining: self.total,
        }
    }
}

/// SEND_PULSES commands for a `PulseRequest`, full 255 pulse chunks first.
#[derive(Debug, Clone)]
pub struct Chunks {
    signals: u8,
    remaining: u32,
}

impl Iterator for Chunks {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        if self.remaining == 0 {
            return None;
        }
        let count = self.remaining.min(MAX_PULSES_PER_CHUNK);
        self.remaining -= count;
        Some(Command::SendPulses {
            signals: self.signals,
            count: count as u8,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let chunks = self.remaining.div_ceil(MAX_PULSES_PER_CHUNK) as usize;
        (chunks, Some(chunks))
    }
}

impl ExactSizeIterator for Chunks {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use pretty_assertions::assert_eq;

    fn counts(total: u32) -> Vec<u8> {
        PulseRequest::new(false, false, total)
            .chunks()
            .map(|c| match c {
                Command::SendPulses { count, .. } => count,
                other => panic!("unexpected {}", other),
            })
            .collect()
    }

    #[test]
    fn chunk_sizes_add_up() {
        for total in 0..=10_000 {
            let counts = counts(total);
            let sum: u32 = counts.iter().map(|&c| c as u32).sum();
            assert_eq!(sum, total);
            assert_eq!(counts.len() as u32, total.div_ceil(255));
            assert!(counts.iter().all(|&c| c != 0));
            assert_eq!(
                PulseRequest::new(false, false, total).chunks().len(),
                counts.len()
            );
        }
    }

    #[test]
    fn full_chunks_come_first() {
        assert_eq!(counts(0), vec![]);
        assert_eq!(counts(1), vec![1]);
        assert_eq!(counts(255), vec![255]);
        assert_eq!(counts(256), vec![255, 1]);
        assert_eq!(counts(300), vec![255, 45]);
        assert_eq!(counts(765), vec![255, 255, 255]);
    }

    #[test]
    fn signal_byte_carries_tms_and_tdi() {
        assert_eq!(PulseRequest::new(false, false, 1).signals(), 0);
        assert_eq!(PulseRequest::new(false, true, 1).signals(), Signals::TDI.bits());
        assert_eq!(PulseRequest::new(true, false, 1).signals(), Signals::TMS.bits());
        assert_eq!(
            PulseRequest::new(true, true, 1).signals(),
            (Signals::TMS | Signals::TDI).bits()
        );

        let request = PulseRequest::new(true, true, 600);
        assert!(request.chunks().all(|c| matches!(
            c,
            Command::SendPulses { signals, .. } if signals == request.signals()
        )));
    }
}
