//! The wire format spoken by the Arduiggler firmware.
//!
//! Every exchange is one command (an opcode followed by a fixed number of parameter bytes) and
//! one reply.  The reply is zero or more data bytes followed by a two-byte status word, see
//! `status`.  Only one command is ever outstanding.
use alloc::vec::Vec;
use core::fmt;

use crate::error::{ProtocolError, TransportError};
use crate::transport::Transport;

pub mod pulse;
pub mod status;

pub use pulse::{Chunks, PulseRequest};
pub use status::{read_status, Status};

/// The firmware's UART runs at this rate and nothing else.
pub const BAUD_RATE: u32 = 115_200;

pub const CMD_RESET: u8 = 0x74;
pub const CMD_STATUS: u8 = 0x3F;
pub const CMD_GETVER: u8 = 0x61;
pub const CMD_SEND: u8 = 0x73;
pub const CMD_READ: u8 = 0x72;
pub const CMD_FORCE: u8 = 0x66;

/// Opcode plus the largest parameter list (SEND_PULSES).
pub const MAX_COMMAND_LEN: usize = 3;

/// Length of the version text that precedes the status in a GET_VERSION reply.
pub const VERSION_LEN: usize = 4;

/// Longest data part of any reply.
pub const MAX_REPLY_LEN: usize = VERSION_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Reset,
    Status,
    GetVersion,
    /// Clock TCK `count` times with TMS/TDI taken from `signals`.
    SendPulses { signals: u8, count: u8 },
    ReadTdo,
    /// Drive the control lines to `value`.  Callers mask this to the legal lines.
    ForceSignals(u8),
}

impl Command {
    pub const fn opcode(&self) -> u8 {
        match self {
            Command::Reset => CMD_RESET,
            Command::Status => CMD_STATUS,
            Command::GetVersion => CMD_GETVER,
            Command::SendPulses { .. } => CMD_SEND,
            Command::ReadTdo => CMD_READ,
            Command::ForceSignals(_) => CMD_FORCE,
        }
    }

    /// Number of data bytes the adapter sends back before the status word.
    pub const fn reply_len(&self) -> usize {
        match self {
            Command::GetVersion => VERSION_LEN,
            Command::ReadTdo => 1,
            _ => 0,
        }
    }

    /// Number of parameter bytes following `opcode` on the wire, or `None` for an opcode the
    /// firmware doesn't know.
    pub const fn param_len(opcode: u8) -> Option<usize> {
        match opcode {
            CMD_RESET | CMD_STATUS | CMD_GETVER | CMD_READ => Some(0),
            CMD_FORCE => Some(1),
            CMD_SEND => Some(2),
            _ => None,
        }
    }

    /// Append this command to `buffer`, opcode first.
    pub fn encode(&self, buffer: &mut CommandBuffer) {
        buffer.push(self.opcode());
        match *self {
            Command::SendPulses { signals, count } => {
                buffer.push(signals);
                buffer.push(count);
            }
            Command::ForceSignals(value) => buffer.push(value),
            _ => {}
        }
    }

    /// Decode the command at the start of `bytes`, returning it with the remaining bytes.
    /// Returns `None` for an unknown opcode or a truncated parameter list.
    pub fn decode(bytes: &[u8]) -> Option<(Command, &[u8])> {
        let (&opcode, rest) = bytes.split_first()?;
        let len = Self::param_len(opcode)?;
        if rest.len() < len {
            return None;
        }
        let (params, rest) = rest.split_at(len);

        let command = match opcode {
            CMD_RESET => Command::Reset,
            CMD_STATUS => Command::Status,
            CMD_GETVER => Command::GetVersion,
            CMD_SEND => Command::SendPulses {
                signals: params[0],
                count: params[1],
            },
            CMD_READ => Command::ReadTdo,
            _ => Command::ForceSignals(params[0]),
        };
        Some((command, rest))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Reset => write!(f, "RESET"),
            Command::Status => write!(f, "STATUS"),
            Command::GetVersion => write!(f, "GET_VERSION"),
            Command::SendPulses { signals, count } => {
                write!(f, "SEND_PULSES {{ signals: {:#04x}, count: {} }}", signals, count)
            }
            Command::ReadTdo => write!(f, "READ_TDO"),
            Command::ForceSignals(value) => write!(f, "FORCE_SIGNALS {:#04x}", value),
        }
    }
}

/// Collects the bytes of one command so it goes out in a single write.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    bytes: Vec<u8>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Allocate room for the longest command up front, so queuing never allocates.
    pub fn try_reserve(&mut self) -> Result<(), alloc::collections::TryReserveError> {
        self.bytes.try_reserve(MAX_COMMAND_LEN)
    }

    /// Drop anything pending and start a new command.
    pub fn begin(&mut self) {
        self.bytes.clear();
    }

    pub fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Start over with `command` as the only content.
    pub fn queue(&mut self, command: Command) {
        self.begin();
        command.encode(self);
    }

    /// The bytes that the next `flush` will send.
    pub fn pending(&self) -> &[u8] {
        &self.bytes
    }

    /// Hand the pending bytes to `link` in one write.  The buffer is empty afterwards, whether
    /// or not the write went through, so a failed command can't leak into the next one.
    pub fn flush<T: Transport + ?Sized>(&mut self, link: &mut T) -> Result<(), TransportError> {
        let result = link.write(&self.bytes);
        self.bytes.clear();
        result
    }
}

/// The four characters the firmware reports for GET_VERSION, e.g. `"1.2 "`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FirmwareVersion([u8; VERSION_LEN]);

impl FirmwareVersion {
    pub fn as_bytes(&self) -> &[u8; VERSION_LEN] {
        &self.0
    }

    /// The version as text, padding included.
    pub fn as_str(&self) -> &str {
        // Printable ASCII is checked on construction
        core::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl TryFrom<[u8; VERSION_LEN]> for FirmwareVersion {
    type Error = ProtocolError;

    fn try_from(bytes: [u8; VERSION_LEN]) -> Result<Self, Self::Error> {
        if bytes.iter().all(|b| (0x20..=0x7e).contains(b)) {
            Ok(Self(bytes))
        } else {
            Err(ProtocolError::MalformedVersion(bytes))
        }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FakeAdapter;
    use alloc::vec;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(Command::Reset, &[0x74]; "reset")]
    #[test_case(Command::Status, &[0x3f]; "status")]
    #[test_case(Command::GetVersion, &[0x61]; "get version")]
    #[test_case(Command::SendPulses { signals: 0x05, count: 0xff }, &[0x73, 0x05, 0xff]; "send pulses")]
    #[test_case(Command::ReadTdo, &[0x72]; "read tdo")]
    #[test_case(Command::ForceSignals(0x1f), &[0x66, 0x1f]; "force signals")]
    fn encodes_opcode_then_parameters(command: Command, wire: &[u8]) {
        let mut buffer = CommandBuffer::new();
        buffer.queue(command);
        assert_eq!(buffer.pending(), wire);
        assert_eq!(Command::decode(wire), Some((command, &[][..])));
    }

    #[test]
    fn queue_discards_previous_command() {
        let mut buffer = CommandBuffer::new();
        buffer.push(0xaa);
        buffer.push(0xbb);
        buffer.queue(Command::ReadTdo);
        assert_eq!(buffer.pending(), &[CMD_READ]);
    }

    #[test]
    fn flush_clears_even_when_the_write_fails() {
        let mut link = FakeAdapter::new();
        let mut buffer = CommandBuffer::new();
        buffer.push(CMD_RESET);
        assert_eq!(buffer.flush(&mut link), Err(TransportError::NotOpen));
        assert_eq!(buffer.pending(), &[] as &[u8]);
        assert!(link.writes().is_empty());
    }

    #[test]
    fn flush_is_one_write() {
        let mut link = FakeAdapter::new();
        link.open().unwrap();
        let mut buffer = CommandBuffer::new();
        buffer.queue(Command::SendPulses {
            signals: 0x04,
            count: 0x10,
        });
        assert_eq!(buffer.flush(&mut link), Ok(()));
        assert_eq!(link.writes(), vec![vec![CMD_SEND, 0x04, 0x10]]);
        assert_eq!(buffer.pending(), &[] as &[u8]);
    }

    #[test]
    fn decode_rejects_unknown_and_truncated() {
        assert_eq!(Command::decode(&[]), None);
        assert_eq!(Command::decode(&[0x00]), None);
        assert_eq!(Command::decode(&[CMD_SEND, 0x01]), None);
        assert_eq!(Command::decode(&[CMD_FORCE]), None);
    }

    #[test]
    fn decode_leaves_following_bytes() {
        let wire = vec![CMD_FORCE, 0x04, CMD_READ];
        let (first, rest) = Command::decode(&wire).unwrap();
        assert_eq!(first, Command::ForceSignals(0x04));
        assert_eq!(rest, &[CMD_READ]);
    }

    #[test]
    fn reply_lengths() {
        assert_eq!(Command::GetVersion.reply_len(), VERSION_LEN);
        assert_eq!(Command::ReadTdo.reply_len(), 1);
        assert_eq!(Command::Reset.reply_len(), 0);
        assert_eq!(Command::ForceSignals(0).reply_len(), 0);
        assert_eq!(Command::GetVersion.reply_len(), MAX_REPLY_LEN);
    }

    #[test]
    fn version_must_be_printable() {
        let version = FirmwareVersion::try_from(*b"1.2 ").unwrap();
        assert_eq!(version.as_str(), "1.2 ");
        assert_eq!(alloc::format!("{}", version), "1.2 ");

        assert_eq!(
            FirmwareVersion::try_from([b'1', 0x00, b'2', 0xff]),
            Err(ProtocolError::MalformedVersion([b'1', 0x00, b'2', 0xff]))
        );
    }
}
