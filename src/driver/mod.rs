//! The pad grid output side: commands, sinks and the shared grid lock.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{trace, warn};

use crate::topology::Note;

pub mod midi;

#[derive(Debug, Error)]
pub enum Error {
    #[error("pad command queue is full")]
    Full,
    #[error("pad output has been disconnected")]
    Disconnected,
    #[error("failed to send midi message")]
    Midi(#[from] midir::SendError),
}

/// One light update for one pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadCommand {
    pub note: Note,
    pub lit: bool,
    pub velocity: u8,
}

impl PadCommand {
    pub const fn on(note: Note, velocity: u8) -> Self {
        Self {
            note,
            lit: true,
            velocity,
        }
    }

    pub const fn off(note: Note) -> Self {
        Self {
            note,
            lit: false,
            velocity: 0,
        }
    }

    /// Encodes as a note-on (velocity selects the pad color) or note-off on
    /// the given zero-based MIDI channel.
    pub fn to_midi(self, channel: u8) -> [u8; 3] {
        let channel = channel & 0x0F;
        if self.lit {
            [0x90 | channel, self.note & 0x7F, self.velocity & 0x7F]
        } else {
            [0x80 | channel, self.note & 0x7F, 0]
        }
    }
}

/// Anything that can physically display pad commands.
pub trait PadSink: Send {
    fn send(&mut self, cmd: PadCommand) -> Result<(), Error>;
}

/// Forwards commands to the output thread without blocking.
pub struct ChannelSink {
    tx: flume::Sender<PadCommand>,
}

impl ChannelSink {
    pub fn new(tx: flume::Sender<PadCommand>) -> Self {
        Self { tx }
    }
}

impl PadSink for ChannelSink {
    fn send(&mut self, cmd: PadCommand) -> Result<(), Error> {
        self.tx.try_send(cmd).map_err(|err| match err {
            flume::TrySendError::Full(_) => Error::Full,
            flume::TrySendError::Disconnected(_) => Error::Disconnected,
        })
    }
}

/// The shared pad grid. Whoever holds the lock owns the grid.
#[derive(Clone)]
pub struct PadGrid(Arc<Mutex<Box<dyn PadSink>>>);

impl PadGrid {
    pub fn new(sink: impl PadSink + 'static) -> Self {
        Self(Arc::new(Mutex::new(Box::new(sink))))
    }

    pub fn lock(&self) -> GridWriter<'_> {
        GridWriter(self.0.lock())
    }
}

pub struct GridWriter<'a>(MutexGuard<'a, Box<dyn PadSink>>);

impl GridWriter<'_> {
    /// Sends one command. A failed send is logged and dropped; the next
    /// update that touches the pad corrects it.
    pub fn send(&mut self, cmd: PadCommand) {
        trace!("pad command {cmd:?}");

        if let Err(err) = self.0.send(cmd) {
            warn!("dropped pad command {cmd:?}: {err}");
        }
    }

    pub fn clear_all(&mut self, notes: &[Note]) {
        for &note in notes {
            self.send(PadCommand::off(note));
        }
    }
}

/// Records every command and the resulting grid state.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MemorySink(Arc<Mutex<MemoryState>>);

#[cfg(test)]
#[derive(Default)]
pub struct MemoryState {
    pub log: Vec<PadCommand>,
    pub lit: std::collections::BTreeMap<Note, u8>,
}

#[cfg(test)]
impl MemorySink {
    pub fn take_log(&self) -> Vec<PadCommand> {
        std::mem::take(&mut self.0.lock().log)
    }

    pub fn lit(&self) -> std::collections::BTreeMap<Note, u8> {
        self.0.lock().lit.clone()
    }
}

#[cfg(test)]
impl PadSink for MemorySink {
    fn send(&mut self, cmd: PadCommand) -> Result<(), Error> {
        let mut state = self.0.lock();
        state.log.push(cmd);
        if cmd.lit {
            state.lit.insert(cmd.note, cmd.velocity);
        } else {
            state.lit.remove(&cmd.note);
        }
        Ok(())
    }
}
