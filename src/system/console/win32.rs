// src/system/console/win32.rs
#![allow(unsafe_code)]

use super::{ConsoleHandle, ConsoleHost, ControlSignal, ControlSink, SignalDisposition};
use std::io;
use std::sync::{Mutex, PoisonError, Weak};
use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::System::Console::{
    CONSOLE_MODE, GetConsoleMode, GetStdHandle, STD_INPUT_HANDLE, SetConsoleCtrlHandler,
    SetConsoleMode,
};

const TRUE: i32 = 1;
const FALSE: i32 = 0;

/// The sink the OS callback forwards to. There is one handler routine per
/// process, so there is one slot.
static SINK: Mutex<Option<Weak<dyn ControlSink>>> = Mutex::new(None);

/// Called by the OS on its own helper thread.
unsafe extern "system" fn control_handler(ctrl_type: u32) -> i32 {
    let sink = SINK
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .and_then(Weak::upgrade);
    let Some(sink) = sink else {
        return FALSE;
    };
    match sink.deliver(ControlSignal::from_raw(ctrl_type)) {
        SignalDisposition::Handled => TRUE,
        SignalDisposition::Unhandled => FALSE,
    }
}

fn check(result: i32) -> io::Result<()> {
    if result == FALSE {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// The console of the current process, driven through the Win32 console API.
#[derive(Debug, Default)]
pub struct Win32Console;

impl Win32Console {
    /// The console attached to this process.
    pub fn new() -> Self {
        Self
    }
}

impl ConsoleHost for Win32Console {
    fn register_handler(&self, sink: Weak<dyn ControlSink>) -> io::Result<()> {
        *SINK.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
        // SAFETY: `control_handler` matches PHANDLER_ROUTINE and lives for the
        // whole program.
        check(unsafe { SetConsoleCtrlHandler(Some(control_handler), TRUE) })
    }

    fn unregister_handler(&self) -> io::Result<()> {
        // SAFETY: removes the routine installed by `register_handler`.
        check(unsafe { SetConsoleCtrlHandler(Some(control_handler), FALSE) })?;
        // Only forget the sink once the OS has stopped calling the handler.
        *SINK.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn set_inheritable_ignore(&self, ignore: bool) -> io::Result<()> {
        // SAFETY: a null routine toggles the process-wide (and inherited)
        // "ignore Ctrl+C" attribute.
        check(unsafe { SetConsoleCtrlHandler(None, i32::from(ignore)) })
    }

    fn input_handle(&self) -> ConsoleHandle {
        // SAFETY: GetStdHandle has no preconditions.
        let handle = unsafe { GetStdHandle(STD_INPUT_HANDLE) };
        ConsoleHandle(handle as isize)
    }

    fn input_mode(&self, handle: ConsoleHandle) -> io::Result<u32> {
        let mut mode: CONSOLE_MODE = 0;
        // SAFETY: `mode` is a valid out pointer; an invalid handle fails the call.
        check(unsafe { GetConsoleMode(handle.0 as HANDLE, &mut mode) })?;
        Ok(mode)
    }

    fn set_input_mode(&self, handle: ConsoleHandle, mode: u32) -> io::Result<()> {
        // SAFETY: an invalid handle fails the call.
        check(unsafe { SetConsoleMode(handle.0 as HANDLE, mode) })
    }
}
