//! Implement the `Cable` trait for the Arduiggler, an Arduino running JTAG firmware behind an
//! FT232 USB-serial bridge.
//!
//! Every command is written in one go and its reply is read completely before the next command
//! goes out.  Nothing is retried here: when the adapter refuses something the caller decides
//! whether to try again.
use core::fmt;

use tracing::{debug, info, warn};

use crate::cable::{Cable, Signals};
use crate::error::{Error, TransportError};
use crate::protocol::{
    read_status, Command, CommandBuffer, FirmwareVersion, PulseRequest, Status, BAUD_RATE,
    MAX_REPLY_LEN,
};
use crate::transport::Transport;

/// Where a session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// The link is held but the adapter has not been brought up.
    Connected,
    /// `init` succeeded, commands may be sent.
    Ready,
    /// A command is in flight.
    Busy,
    /// The link has been released.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connected => "connected",
            SessionState::Ready => "ready",
            SessionState::Busy => "busy",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

pub struct Arduiggler<T: Transport> {
    link: T,
    buffer: CommandBuffer,
    state: SessionState,
    version: Option<FirmwareVersion>,
    // Line state sent by the last FORCE_SIGNALS
    signals: Signals,
}

impl<T: Transport> fmt::Debug for Arduiggler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arduiggler")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("signals", &self.signals)
            .finish()
    }
}

impl<T: Transport> Arduiggler<T> {
    /// Take hold of `link` and set up a session for it.  The link is not opened yet, that is
    /// part of `init`.  If this fails the link is closed again before the error is returned.
    pub fn connect(mut link: T) -> Result<Self, Error> {
        if let Err(e) = link.acquire() {
            link.close();
            return Err(Error::Connect(e));
        }

        let mut buffer = CommandBuffer::new();
        if buffer.try_reserve().is_err() {
            link.close();
            return Err(Error::OutOfMemory);
        }

        debug!("Arduiggler connected");
        Ok(Self {
            link,
            buffer,
            state: SessionState::Connected,
            version: None,
            signals: Signals::empty(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The firmware version recorded by `init`.
    pub fn version(&self) -> Option<FirmwareVersion> {
        self.version
    }

    pub fn link(&self) -> &T {
        &self.link
    }

    /// Open the link, set the fixed baud rate, reset the adapter and read its firmware version.
    /// On failure the link is closed and the session stays `Connected`, so the whole sequence
    /// can be tried again.
    pub fn init(&mut self) -> Result<(), Error> {
        if self.state != SessionState::Connected {
            return Err(Error::InvalidState {
                current: self.state,
                required: SessionState::Connected,
            });
        }

        match self.bring_up() {
            Ok(version) => {
                info!("Arduiggler firmware: {}", version);
                self.version = Some(version);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!("cable not initialized properly: {}", e);
                self.link.close();
                Err(e)
            }
        }
    }

    fn bring_up(&mut self) -> Result<FirmwareVersion, Error> {
        self.link.open()?;
        self.link
            .configure_speed(BAUD_RATE)
            .map_err(|source| Error::LinkSpeed {
                baud: BAUD_RATE,
                source,
            })?;

        self.reset_adapter()?;
        self.read_version()
    }

    /// Release the link.  Dropping the session does the same.
    pub fn disconnect(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.state != SessionState::Closed {
            self.link.close();
            self.state = SessionState::Closed;
            debug!("Arduiggler disconnected");
        }
    }

    /// Run `op` with the session marked busy.  Only a ready session takes commands.
    fn operate<R>(&mut self, op: impl FnOnce(&mut Self) -> Result<R, Error>) -> Result<R, Error> {
        if self.state != SessionState::Ready {
            return Err(Error::InvalidState {
                current: self.state,
                required: SessionState::Ready,
            });
        }
        self.state = SessionState::Busy;
        let result = op(self);
        self.state = SessionState::Ready;
        result
    }

    fn send(&mut self, command: Command) -> Result<(), TransportError> {
        debug!("sending {}", command);
        self.buffer.queue(command);
        self.buffer.flush(&mut self.link)
    }

    fn status(&mut self) -> Result<Status, TransportError> {
        let status = read_status(&mut self.link)?;
        debug!("status {}", status);
        Ok(status)
    }

    /// Send `command` and read its whole reply.  The data bytes land at the front of the
    /// returned array, `command.reply_len()` of them.
    fn request(&mut self, command: Command) -> Result<([u8; MAX_REPLY_LEN], Status), Error> {
        self.send(command)?;
        let mut data = [0; MAX_REPLY_LEN];
        self.link.read_exact(&mut data[..command.reply_len()])?;
        let status = self.status()?;
        Ok((data, status))
    }

    /// Send a command without reply data and return its status.
    fn execute(&mut self, command: Command) -> Result<Status, Error> {
        Ok(self.request(command)?.1)
    }

    fn reset_adapter(&mut self) -> Result<(), Error> {
        self.execute(Command::Reset)?.into_result()?;
        Ok(())
    }

    fn read_version(&mut self) -> Result<FirmwareVersion, Error> {
        let (raw, status) = self.request(Command::GetVersion)?;
        // The status goes first, so a refused command isn't reported as garbage text
        status.into_result()?;
        Ok(FirmwareVersion::try_from(raw)?)
    }

    /// Send RESET to the adapter.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.operate(|cable| cable.reset_adapter())
    }

    /// Ask the adapter for its status.  A non-ok answer is returned, not turned into an error.
    pub fn query_status(&mut self) -> Result<Status, Error> {
        self.operate(|cable| cable.execute(Command::Status))
    }

    /// Ask the adapter for its firmware version again.
    pub fn firmware_version(&mut self) -> Result<FirmwareVersion, Error> {
        self.operate(|cable| cable.read_version())
    }

    fn send_pulses(&mut self, request: PulseRequest) -> Result<u32, Error> {
        let mut sent = 0;
        for chunk in request.chunks() {
            let status = self.execute(chunk)?;
            if !status.is_ok() {
                warn!(
                    "clock stopped after {} of {} pulses, status {}",
                    sent,
                    request.total(),
                    status
                );
                return Ok(sent);
            }
            if let Command::SendPulses { count, .. } = chunk {
                sent += count as u32;
            }
        }
        Ok(sent)
    }
}

impl<T: Transport> Cable for Arduiggler<T> {
    fn init(&mut self) -> Result<(), Error> {
        Arduiggler::init(self)
    }

    /// The firmware runs TCK at whatever pace it manages, there is no frequency command.
    fn set_frequency(&mut self, hz: u32) -> Result<(), Error> {
        warn!("Arduiggler does not support configurable frequency ({} Hz requested)", hz);
        Err(Error::Unsupported("frequency control"))
    }

    fn clock(&mut self, tms: bool, tdi: bool, n: u32) -> Result<u32, Error> {
        let request = PulseRequest::new(tms, tdi, n);
        self.operate(|cable| cable.send_pulses(request))
    }

    fn sample_tdo(&mut self) -> Result<bool, Error> {
        self.operate(|cable| {
            let (data, status) = cable.request(Command::ReadTdo)?;
            // The status is read to keep the stream in sync, but a refusal doesn't change the
            // sampled bit.
            if !status.is_ok() {
                warn!("ignoring status {} after reading TDO", status);
            }
            Ok(data[0] & 0x01 != 0)
        })
    }

    fn set_signals(&mut self, mask: Signals, value: Signals) -> Result<Signals, Error> {
        let mask = mask & Signals::all();
        let value = value & mask;

        self.operate(|cable| {
            cable.send(Command::ForceSignals(value.bits()))?;
            // Same as for TDO: read, log, move on
            let status = cable.status()?;
            if !status.is_ok() {
                warn!("ignoring status {} after forcing signals", status);
            }
            cable.signals = value;
            Ok(value)
        })
    }

    fn signal(&self, signal: Signals) -> bool {
        self.signals.intersects(signal)
    }
}

impl<T: Transport> Drop for Arduiggler<T> {
    fn drop(&mut self) {
        self.release();
    }
}
