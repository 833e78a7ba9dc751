use std::{io, sync::mpsc, thread};
use termion::{event::Key, input::TermRead};
use tracing::warn;

pub(crate) enum Event {
    Input(Key),
    Interrupt,
}

/// Merges keyboard input and interrupt signals onto a single `Receiver`.
///
/// Keys are read on their own thread; SIGINT is delivered through a `ctrlc`
/// handler.
pub(crate) struct Events {
    rx: mpsc::Receiver<Event>,
    _input_handle: thread::JoinHandle<()>,
}

impl Events {
    pub(crate) fn new() -> Result<Self, ctrlc::Error> {
        let (tx, rx) = mpsc::channel();

        let interrupt_tx = tx.clone();
        ctrlc::set_handler(move || {
            if interrupt_tx.send(Event::Interrupt).is_err() {
                warn!("interrupt received after event loop exited");
            }
        })?;

        Ok(Self {
            rx,
            _input_handle: thread::spawn(move || {
                let stdin = io::stdin();
                for key in stdin.keys().flatten() {
                    if tx.send(Event::Input(key)).is_err() {
                        return;
                    }
                }
            }),
        })
    }

    pub(crate) fn next(&self) -> Result<Event, mpsc::RecvError> {
        self.rx.recv()
    }
}
