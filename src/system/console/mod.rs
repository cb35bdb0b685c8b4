// src/system/console/mod.rs

//! The operating system side of console control: handler registration,
//! the inheritable "ignore Ctrl+C" attribute and the console input mode.
//!
//! [`ConsoleHost`] is the seam. [`platform_console`] picks the host for the
//! current OS; [`DetachedConsole`] is attached to nothing and lets callers
//! raise control signals themselves.

use crate::constants::{
    CTRL_BREAK_EVENT, CTRL_C_EVENT, CTRL_CLOSE_EVENT, CTRL_LOGOFF_EVENT, CTRL_SHUTDOWN_EVENT,
};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

#[cfg(unix)]
mod posix;
#[cfg(windows)]
mod win32;

#[cfg(unix)]
pub use posix::PosixConsole;
#[cfg(windows)]
pub use win32::Win32Console;

/// The console control classes the OS can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlSignal {
    /// Ctrl+C, or SIGINT.
    CtrlC,
    /// Ctrl+Break, or SIGQUIT.
    Break,
    /// The console window is closing, or SIGHUP.
    Close,
    /// The user is logging off.
    Logoff,
    /// The system is shutting down, or SIGTERM.
    Shutdown,
    /// Any code outside the five known classes.
    Other(u32),
}

impl ControlSignal {
    /// Classifies a raw Win32 control code.
    pub fn from_raw(code: u32) -> Self {
        match code {
            CTRL_C_EVENT => Self::CtrlC,
            CTRL_BREAK_EVENT => Self::Break,
            CTRL_CLOSE_EVENT => Self::Close,
            CTRL_LOGOFF_EVENT => Self::Logoff,
            CTRL_SHUTDOWN_EVENT => Self::Shutdown,
            other => Self::Other(other),
        }
    }

    /// Ctrl+C and Break: the user asked to interrupt.
    pub fn is_user_interrupt(self) -> bool {
        matches!(self, Self::CtrlC | Self::Break)
    }

    /// Close, Logoff and Shutdown: the terminal is going away.
    pub fn is_terminal_closure(self) -> bool {
        matches!(self, Self::Close | Self::Logoff | Self::Shutdown)
    }
}

/// What a control handler tells the OS after seeing a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDisposition {
    /// The signal was consumed; the process keeps running.
    Handled,
    /// Let the OS apply its default action (normally termination).
    Unhandled,
}

/// Receives control signals from a [`ConsoleHost`], on whatever thread the OS uses.
pub trait ControlSink: Send + Sync {
    /// Handles `signal` and tells the OS whether to apply its default action.
    fn deliver(&self, signal: ControlSignal) -> SignalDisposition;
}

/// An opaque console handle, as the OS hands it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsoleHandle(pub isize);

/// The console operations the cancellation service needs from the OS.
pub trait ConsoleHost: Send + Sync {
    /// Installs the control handler. Signals go to `sink` for as long as it lives.
    fn register_handler(&self, sink: Weak<dyn ControlSink>) -> io::Result<()>;

    /// Removes the control handler installed by `register_handler`.
    fn unregister_handler(&self) -> io::Result<()>;

    /// Sets whether this process, and children created from now on, ignore Ctrl+C.
    fn set_inheritable_ignore(&self, ignore: bool) -> io::Result<()>;

    /// The handle of the console input.
    fn input_handle(&self) -> ConsoleHandle;

    /// Reads the input mode bits of `handle`.
    fn input_mode(&self, handle: ConsoleHandle) -> io::Result<u32>;

    /// Replaces the input mode bits of `handle`.
    fn set_input_mode(&self, handle: ConsoleHandle, mode: u32) -> io::Result<()>;
}

/// The host for the current platform.
pub fn platform_console() -> Arc<dyn ConsoleHost> {
    #[cfg(windows)]
    {
        Arc::new(Win32Console::new())
    }
    #[cfg(unix)]
    {
        Arc::new(PosixConsole::new())
    }
    #[cfg(not(any(windows, unix)))]
    {
        Arc::new(DetachedConsole::new())
    }
}

/// A console host not attached to any OS console.
///
/// It remembers what it was asked to do, and [`DetachedConsole::raise`] plays
/// the part of the OS by delivering a signal to the registered sink.
#[derive(Default)]
pub struct DetachedConsole {
    sink: Mutex<Option<Weak<dyn ControlSink>>>,
    registrations: AtomicUsize,
    inheritable_ignore: AtomicBool,
    mode: AtomicU32,
}

impl DetachedConsole {
    /// A host with no handler and input mode 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `signal` the way the OS would. Returns `None` if no handler is
    /// registered (the OS would apply its default action).
    pub fn raise(&self, signal: ControlSignal) -> Option<SignalDisposition> {
        let sink = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)?;
        Some(sink.deliver(signal))
    }

    /// True while a handler is installed.
    pub fn is_registered(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// How many times a handler has been installed.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    /// The last value given to `set_inheritable_ignore`.
    pub fn inheritable_ignore(&self) -> bool {
        self.inheritable_ignore.load(Ordering::SeqCst)
    }

    /// The current input mode bits.
    pub fn mode(&self) -> u32 {
        self.mode.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for DetachedConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetachedConsole")
            .field("registered", &self.is_registered())
            .field("registrations", &self.registrations())
            .field("inheritable_ignore", &self.inheritable_ignore())
            .field("mode", &self.mode())
            .finish()
    }
}

impl ConsoleHost for DetachedConsole {
    fn register_handler(&self, sink: Weak<dyn ControlSink>) -> io::Result<()> {
        *self.sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
        self.registrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unregister_handler(&self) -> io::Result<()> {
        *self.sink.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn set_inheritable_ignore(&self, ignore: bool) -> io::Result<()> {
        self.inheritable_ignore.store(ignore, Ordering::SeqCst);
        Ok(())
    }

    fn input_handle(&self) -> ConsoleHandle {
        ConsoleHandle::default()
    }

    fn input_mode(&self, _handle: ConsoleHandle) -> io::Result<u32> {
        Ok(self.mode())
    }

    fn set_input_mode(&self, _handle: ConsoleHandle, mode: u32) -> io::Result<()> {
        self.mode.store(mode, Ordering::SeqCst);
        Ok(())
    }
}
