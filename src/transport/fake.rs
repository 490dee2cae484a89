//! An Arduiggler that lives in memory.
//!
//! `FakeAdapter` answers commands the way the firmware does, and records everything the host
//! sends so tests can look at the wire traffic afterwards.  Clones share the same state, so one
//! clone can be handed to `Arduiggler::connect` while another is kept for inspection.
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::error::TransportError;
use crate::protocol::{status, Command, VERSION_LEN};
use crate::transport::Transport;

#[derive(Debug)]
struct State {
    open: bool,
    acquired: bool,
    opened: usize,
    closed: usize,
    close_requests: usize,
    baud: Option<u32>,

    version: [u8; VERSION_LEN],
    tdo: u8,
    statuses: VecDeque<u16>,

    writes: Vec<Vec<u8>>,
    rx: VecDeque<u8>,

    missing: bool,
    refuse_open: bool,
    refuse_speed: bool,
    fail_write_after: Option<usize>,
    silent: bool,
}

/// A simulated adapter.  Every command is answered with `"ok"` unless told otherwise.
#[derive(Debug, Clone)]
pub struct FakeAdapter {
    state: Rc<RefCell<State>>,
}

impl Default for FakeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                open: false,
                acquired: false,
                opened: 0,
                closed: 0,
                close_requests: 0,
                baud: None,
                version: *b"1.0 ",
                tdo: 0,
                statuses: VecDeque::new(),
                writes: Vec::new(),
                rx: VecDeque::new(),
                missing: false,
                refuse_open: false,
                refuse_speed: false,
                fail_write_after: None,
                silent: false,
            })),
        }
    }

    /// The four bytes GET_VERSION answers with.
    pub fn with_version(self, version: [u8; VERSION_LEN]) -> Self {
        self.state.borrow_mut().version = version;
        self
    }

    /// The byte READ_TDO answers with.
    pub fn set_tdo(&self, tdo: u8) {
        self.state.borrow_mut().tdo = tdo;
    }

    /// Status words for the next commands, in order.  Once they run out every command gets
    /// `"ok"` again.
    pub fn queue_statuses<I>(&self, statuses: I)
    where
        I: IntoIterator,
        I::Item: Into<u16>,
    {
        let mut state = self.state.borrow_mut();
        state.statuses.extend(statuses.into_iter().map(Into::into));
    }

    /// Put raw bytes on the receive side, ahead of any reply.
    pub fn inject(&self, bytes: &[u8]) {
        self.state.borrow_mut().rx.extend(bytes.iter().copied());
    }

    /// Pretend no adapter is plugged in.
    pub fn unplugged(self) -> Self {
        self.state.borrow_mut().missing = true;
        self
    }

    pub fn refuse_open(self) -> Self {
        self.state.borrow_mut().refuse_open = true;
        self
    }

    pub fn refuse_speed(self) -> Self {
        self.state.borrow_mut().refuse_speed = true;
        self
    }

    /// Let `writes` more writes through, then fail every write.
    pub fn fail_write_after(&self, writes: usize) {
        self.state.borrow_mut().fail_write_after = Some(writes);
    }

    /// Swallow commands without answering, so reads time out.
    pub fn set_silent(&self, silent: bool) {
        self.state.borrow_mut().silent = silent;
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    pub fn is_acquired(&self) -> bool {
        self.state.borrow().acquired
    }

    /// How often the link was opened and closed.
    pub fn open_count(&self) -> usize {
        self.state.borrow().opened
    }

    pub fn close_count(&self) -> usize {
        self.state.borrow().closed
    }

    /// Every `close` call, including those on a link that was never opened.
    pub fn close_requests(&self) -> usize {
        self.state.borrow().close_requests
    }

    pub fn baud(&self) -> Option<u32> {
        self.state.borrow().baud
    }

    /// Every write, as it was handed over.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.borrow().writes.clone()
    }

    /// Every command the host sent, decoded.
    pub fn commands(&self) -> Vec<Command> {
        let state = self.state.borrow();
        let mut commands = Vec::new();
        for write in &state.writes {
            let mut bytes = &write[..];
            while let Some((command, rest)) = Command::decode(bytes) {
                commands.push(command);
                bytes = rest;
            }
        }
        commands
    }

    /// Bytes not yet read by the host.
    pub fn unread(&self) -> usize {
        self.state.borrow().rx.len()
    }

    pub fn clear_log(&self) {
        self.state.borrow_mut().writes.clear();
    }
}

impl State {
    fn answer(&mut self, command: Command) {
        match command {
            Command::GetVersion => {
                let version = self.version;
                self.rx.extend(version);
            }
            Command::ReadTdo => {
                let tdo = self.tdo;
                self.rx.push_back(tdo);
            }
            _ => {}
        }
        let word = self.statuses.pop_front().unwrap_or(status::STATUS_OK);
        self.rx.extend(word.to_be_bytes());
    }
}

impl Transport for FakeAdapter {
    fn acquire(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if state.missing {
            return Err(TransportError::NotFound);
        }
        state.acquired = true;
        Ok(())
    }

    fn open(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if state.refuse_open {
            return Err(TransportError::Open("refused by fake adapter".into()));
        }
        if !state.open {
            state.open = true;
            state.opened += 1;
        }
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.borrow_mut();
        state.close_requests += 1;
        if state.open {
            state.closed += 1;
        }
        state.open = false;
        state.acquired = false;
        state.baud = None;
        state.rx.clear();
    }

    fn configure_speed(&mut self, baud: u32) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        if state.refuse_speed {
            return Err(TransportError::Speed(baud));
        }
        state.baud = Some(baud);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        match state.fail_write_after {
            Some(0) => return Err(TransportError::Io("write failed".into())),
            Some(ref mut n) => *n -= 1,
            None => {}
        }
        state.writes.push(bytes.to_vec());

        if state.silent {
            return Ok(());
        }
        let mut rest = bytes;
        while !rest.is_empty() {
            match Command::decode(rest) {
                Some((command, tail)) => {
                    state.answer(command);
                    rest = tail;
                }
                None => {
                    // Unknown opcode: the firmware drops the byte and complains
                    state.rx.extend(status::STATUS_ERR1.to_be_bytes());
                    rest = &rest[1..];
                }
            }
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        let mut state = self.state.borrow_mut();
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        state.rx.pop_front().ok_or(TransportError::Timeout)
    }
}
