//! Implement the `Transport` trait for FTDI FT232R USB-serial bridges, which is what sits in
//! front of the Arduino on an Arduiggler.
use alloc::format;
use alloc::string::{String, ToString};
use std::time::Duration;

use libftd2xx::{BitMode, BitsPerWord, Ftdi, FtdiCommon, Parity, StopBits};
use tracing::debug;

use crate::error::TransportError;
use crate::transport::Transport;

pub const VID: u16 = 0x0403;
pub const PID: u16 = 0x6001;

/// What an FT232R reports as its description unless the EEPROM was reprogrammed.
pub const DEFAULT_DESCRIPTION: &str = "FT232R USB UART";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

pub struct Ft232Link {
    description: String,
    timeout: Duration,
    ft: Option<Ftdi>,
}

impl Ft232Link {
    /// Create a new Ft232Link.  `description` is the value passed to `Ftdi::with_description`
    /// to select which hardware to use.  Nothing is opened until `open`.
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            timeout: DEFAULT_TIMEOUT,
            ft: None,
        }
    }

    /// How long reads and writes may block before they fail with `TransportError::Timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    fn ft(&mut self) -> Result<&mut Ftdi, TransportError> {
        self.ft.as_mut().ok_or(TransportError::NotOpen)
    }
}

impl Default for Ft232Link {
    fn default() -> Self {
        Self::new(DEFAULT_DESCRIPTION)
    }
}

fn io_error(e: libftd2xx::FtStatus) -> TransportError {
    TransportError::Io(format!("{}", e))
}

impl Transport for Ft232Link {
    fn acquire(&mut self) -> Result<(), TransportError> {
        let devices = libftd2xx::list_devices().map_err(io_error)?;
        let device = devices
            .iter()
            .find(|d| d.description == self.description)
            .ok_or(TransportError::NotFound)?;

        if (device.vendor_id, device.product_id) != (VID, PID) {
            debug!(
                "\"{}\" is {:04x}:{:04x}, not a stock FT232R",
                self.description, device.vendor_id, device.product_id
            );
        }
        Ok(())
    }

    fn open(&mut self) -> Result<(), TransportError> {
        if self.ft.is_some() {
            return Ok(());
        }

        let mut ft = Ftdi::with_description(&self.description)
            .map_err(|e| TransportError::Open(format!("{}", e)))?;
        // Another driver may have left the chip in bitbang mode
        ft.set_bit_mode(0, BitMode::Reset).map_err(io_error)?;
        ft.set_data_characteristics(BitsPerWord::Bits8, StopBits::Bits1, Parity::No)
            .map_err(io_error)?;
        ft.set_timeouts(self.timeout, self.timeout).map_err(io_error)?;
        ft.purge_all().map_err(io_error)?;

        self.ft = Some(ft);
        Ok(())
    }

    fn close(&mut self) {
        // Dropping the handle closes the device
        if self.ft.take().is_some() {
            debug!("closed FT232 \"{}\"", self.description);
        }
    }

    fn configure_speed(&mut self, baud: u32) -> Result<(), TransportError> {
        self.ft()?
            .set_baud_rate(baud)
            .map_err(|_| TransportError::Speed(baud))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let written = self.ft()?.write(bytes).map_err(io_error)?;
        if written != bytes.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: bytes.len(),
            });
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        let mut buf = [0; 1];
        // A read that runs into the timeout returns what it got, which here is nothing
        match self.ft()?.read(&mut buf).map_err(io_error)? {
            0 => Err(TransportError::Timeout),
            _ => Ok(buf[0]),
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        let ft = self.ft()?;
        let mut got = 0;
        while got < buf.len() {
            match ft.read(&mut buf[got..]).map_err(io_error)? {
                0 => return Err(TransportError::Timeout),
                n => got += n,
            }
        }
        Ok(())
    }
}
