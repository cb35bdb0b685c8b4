// src/system/console/posix.rs

use super::{ConsoleHandle, ConsoleHost, ControlSignal, ControlSink, SignalDisposition};
use signal_hook::consts::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError, Weak};
use std::thread;

const STDIN_FD: isize = 0;

/// Maps a POSIX signal onto the console control class it stands for.
fn classify(signal: i32) -> ControlSignal {
    match signal {
        SIGINT => ControlSignal::CtrlC,
        SIGQUIT => ControlSignal::Break,
        SIGHUP => ControlSignal::Close,
        SIGTERM => ControlSignal::Shutdown,
        other => ControlSignal::Other(u32::try_from(other).unwrap_or(u32::MAX)),
    }
}

/// A terminal on a POSIX system.
///
/// Signals are received on a dedicated helper thread, which is how a Win32
/// console delivers control events too. A signal the sink leaves unhandled is
/// re-raised with its default action. There is no console input mode, so the
/// mode is only mirrored in memory.
#[derive(Debug, Default)]
pub struct PosixConsole {
    listener: Mutex<Option<Handle>>,
    inheritable_ignore: AtomicBool,
    mode: AtomicU32,
}

impl PosixConsole {
    /// A host with no listener thread yet.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsoleHost for PosixConsole {
    fn register_handler(&self, sink: Weak<dyn ControlSink>) -> io::Result<()> {
        let mut listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if listener.is_some() {
            return Ok(());
        }

        let mut signals = Signals::new([SIGINT, SIGQUIT, SIGHUP, SIGTERM])?;
        let handle = signals.handle();
        thread::Builder::new()
            .name("console-control".to_string())
            .spawn(move || {
                for raw in signals.forever() {
                    let Some(sink) = sink.upgrade() else {
                        break;
                    };
                    let signal = classify(raw);
                    log::debug!("Received signal {} ({:?}).", raw, signal);
                    if sink.deliver(signal) == SignalDisposition::Unhandled {
                        if let Err(e) = signal_hook::low_level::emulate_default_handler(raw) {
                            log::warn!("Could not apply default action for signal {}: {}", raw, e);
                        }
                    }
                }
            })?;

        *listener = Some(handle);
        Ok(())
    }

    fn unregister_handler(&self) -> io::Result<()> {
        if let Some(handle) = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.close();
        }
        Ok(())
    }

    fn set_inheritable_ignore(&self, ignore: bool) -> io::Result<()> {
        self.inheritable_ignore.store(ignore, Ordering::SeqCst);
        Ok(())
    }

    fn input_handle(&self) -> ConsoleHandle {
        ConsoleHandle(STDIN_FD)
    }

    fn input_mode(&self, _handle: ConsoleHandle) -> io::Result<u32> {
        Ok(self.mode.load(Ordering::SeqCst))
    }

    fn set_input_mode(&self, _handle: ConsoleHandle, mode: u32) -> io::Result<()> {
        self.mode.store(mode, Ordering::SeqCst);
        Ok(())
    }
}
