//! Warning/error side-channel.
//!
//! Subtasks run detached from the host context, so non-fatal diagnostics are
//! queued here and forwarded to the context, in emission order, once every
//! subtask has settled.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// A non-fatal diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    Warning(String),
    Error(String),
}

/// Sending half, cloned into each subtask.
#[derive(Debug, Clone)]
pub struct Emitter {
    tx: UnboundedSender<Emission>,
}

/// Receiving half, owned by the request.
#[derive(Debug)]
pub struct EmissionQueue {
    rx: UnboundedReceiver<Emission>,
}

impl Emitter {
    pub fn channel() -> (Self, EmissionQueue) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, EmissionQueue { rx })
    }

    pub fn warning(&self, message: impl Into<String>) {
        // Receiver gone means the request already finished; nothing to report to
        let _ = self.tx.send(Emission::Warning(message.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        let _ = self.tx.send(Emission::Error(message.into()));
    }
}

impl EmissionQueue {
    /// Take everything emitted so far.
    pub fn drain(&mut self) -> Vec<Emission> {
        let mut out = Vec::new();
        while let Ok(emission) = self.rx.try_recv() {
            out.push(emission);
        }
        out
    }
}
