//! The two-byte acknowledgement that ends every reply.
//!
//! The firmware answers with ASCII: `"ok"`, `"e1"` or `"e2"`, high byte first.  Anything else
//! means the two sides have lost sync or the cable is not an Arduiggler.
use core::fmt;

use crate::error::{ProtocolError, TransportError};
use crate::transport::Transport;

pub const STATUS_OK: u16 = 0x6F6B;
pub const STATUS_ERR1: u16 = 0x6531;
pub const STATUS_ERR2: u16 = 0x6532;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// `"ok"`
    Ok,
    /// `"e1"`
    Error1,
    /// `"e2"`
    Error2,
    Unrecognized(u16),
}

impl Status {
    pub const fn from_word(word: u16) -> Self {
        match word {
            STATUS_OK => Status::Ok,
            STATUS_ERR1 => Status::Error1,
            STATUS_ERR2 => Status::Error2,
            other => Status::Unrecognized(other),
        }
    }

    pub const fn from_bytes(high: u8, low: u8) -> Self {
        Self::from_word(u16::from_be_bytes([high, low]))
    }

    pub const fn word(&self) -> u16 {
        match *self {
            Status::Ok => STATUS_OK,
            Status::Error1 => STATUS_ERR1,
            Status::Error2 => STATUS_ERR2,
            Status::Unrecognized(word) => word,
        }
    }

    pub const fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }

    /// Anything but `Ok` becomes a `ProtocolError`.
    pub fn into_result(self) -> Result<(), ProtocolError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(ProtocolError::Status(self))
        }
    }
}

impl From<u16> for Status {
    fn from(word: u16) -> Self {
        Self::from_word(word)
    }
}

impl From<Status> for u16 {
    fn from(status: Status) -> Self {
        status.word()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "ok"),
            Status::Error1 => write!(f, "error 1 ({:#06X})", STATUS_ERR1),
            Status::Error2 => write!(f, "error 2 ({:#06X})", STATUS_ERR2),
            Status::Unrecognized(word) => write!(f, "unrecognized status {:#06X}", word),
        }
    }
}

/// Read the status word that closes a reply.  No retry: a transport failure is returned as is.
pub fn read_status<T: Transport + ?Sized>(link: &mut T) -> Result<Status, TransportError> {
    let high = link.read_byte()?;
    let low = link.read_byte()?;
    Ok(Status::from_bytes(high, low))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0x6f, 0x6b, Status::Ok; "ok")]
    #[test_case(0x65, 0x31, Status::Error1; "e1")]
    #[test_case(0x65, 0x32, Status::Error2; "e2")]
    #[test_case(0x6b, 0x6f, Status::Unrecognized(0x6b6f); "ok byte swapped")]
    #[test_case(0x65, 0x33, Status::Unrecognized(0x6533); "e3")]
    #[test_case(0x00, 0x00, Status::Unrecognized(0x0000); "zero")]
    fn decodes_high_byte_first(high: u8, low: u8, expected: Status) {
        assert_eq!(Status::from_bytes(high, low), expected);
    }

    #[test]
    fn every_other_word_is_unrecognized() {
        for word in 0..=u16::MAX {
            let status = Status::from_word(word);
            assert_eq!(status.word(), word);
            match word {
                STATUS_OK | STATUS_ERR1 | STATUS_ERR2 => {
                    assert!(!matches!(status, Status::Unrecognized(_)))
                }
                _ => assert_eq!(status, Status::Unrecognized(word)),
            }
        }
    }

    #[test]
    fn only_ok_is_success() {
        assert_eq!(Status::Ok.into_result(), Ok(()));
        assert_eq!(
            Status::Error2.into_result(),
            Err(ProtocolError::Status(Status::Error2))
        );
        assert_eq!(
            Status::Unrecognized(0x1234).into_result(),
            Err(ProtocolError::Status(Status::Unrecognized(0x1234)))
        );
    }

    #[test]
    fn reads_two_bytes_from_the_link() {
        let mut fake = crate::transport::FakeAdapter::new();
        fake.open().unwrap();
        fake.inject(&[0x65, 0x31, 0xaa]);
        assert_eq!(read_status(&mut fake), Ok(Status::Error1));
        assert_eq!(fake.read_byte(), Ok(0xaa));
        assert_eq!(read_status(&mut fake), Err(TransportError::Timeout));
    }
}
