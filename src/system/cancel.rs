// src/system/cancel.rs

//! The process-wide "operation cancelled" signal.
//!
//! A [`Cancellation`] owns a manual-reset [`CancelEvent`] and keeps the OS
//! console control handler, the inherited "ignore Ctrl+C" attribute and the
//! console input mode in step with it:
//!
//! | State                | Ctrl+C / Break            | Close / Logoff / Shutdown |
//! |----------------------|---------------------------|---------------------------|
//! | enabled, not ignoring| set event, handled        | set event, unhandled      |
//! | enabled, ignoring    | handled                   | set event, unhandled      |
//!
//! Terminal closure always sets the event, then lets the OS terminate the
//! process, so in-flight work sees the cancellation without holding up shutdown.
//!
//! `enable`, `disable` and `ignore` belong to the main thread. `set`,
//! `is_cancelled`, `get_event` and `reset` may be called from any thread, but a
//! signal arriving while `reset` runs can be lost; reset between operations.

use crate::constants::{ENABLE_PROCESSED_INPUT, INTERACTIVE_INPUT_MODE};
use crate::system::console::{
    ConsoleHandle, ConsoleHost, ControlSignal, ControlSink, SignalDisposition, platform_console,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::Duration;
use thiserror::Error;

#[cfg(debug_assertions)]
use crate::constants::TRANSITION_HISTORY_LEN;
#[cfg(debug_assertions)]
use std::{backtrace::Backtrace, collections::VecDeque};

/// Errors raised by the cancellation service.
#[derive(Error, Debug)]
pub enum CancelError {
    /// The operation needs a registered handler.
    #[error("Cancellation is not enabled: no console control handler is registered.")]
    NotEnabled,
    /// The OS refused the control handler.
    #[error("Could not register the console control handler: {0}")]
    HandlerRegistration(#[source] std::io::Error),
    /// A console call failed.
    #[error("Console operation failed: {0}")]
    Console(#[from] std::io::Error),
    /// The cancellation event is set.
    #[error("Operation was cancelled by the user.")]
    Cancelled,
}

// --- Manual-reset event ---

#[derive(Debug, Default)]
struct EventInner {
    signalled: Mutex<bool>,
    changed: Condvar,
}

/// A manual-reset event: once set it stays set until reset, and every waiter
/// is released. Clones refer to the same event.
///
/// Setting happens under a lock, so a thread that observes the event set also
/// observes everything the setter wrote before calling [`CancelEvent::set`].
#[derive(Debug, Clone, Default)]
pub struct CancelEvent {
    inner: Arc<EventInner>,
}

impl CancelEvent {
    /// A new, unsignalled event.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.inner
            .signalled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Signals the event and wakes every waiter.
    pub fn set(&self) {
        *self.lock() = true;
        self.inner.changed.notify_all();
    }

    /// Returns the event to unsignalled.
    pub fn reset(&self) {
        *self.lock() = false;
    }

    /// Polls the event without blocking.
    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    /// Blocks until the event is set.
    pub fn wait(&self) {
        let guard = self.lock();
        drop(
            self.inner
                .changed
                .wait_while(guard, |signalled| !*signalled)
                .unwrap_or_else(PoisonError::into_inner),
        );
    }

    /// Blocks until the event is set or `timeout` passes. Returns whether it is set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .inner
            .changed
            .wait_timeout_while(guard, timeout, |signalled| !*signalled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

// --- Cancellation state ---

/// A point-in-time copy of the cancellation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CancelSnapshot {
    /// The OS control handler is installed.
    pub handler_registered: bool,
    /// Ctrl+C and Break are being swallowed.
    pub ignore: bool,
    /// Children created now would ignore Ctrl+C.
    pub inherited_ignore: bool,
    /// The console turns Ctrl+C into a signal.
    pub processed_input: bool,
}

#[cfg(debug_assertions)]
#[derive(Debug)]
struct Transition {
    operation: &'static str,
    #[allow(dead_code)]
    backtrace: Backtrace,
}

#[derive(Debug, Default)]
struct CancelState {
    handler_registered: bool,
    inherited_ignore: bool,
    processed_input: bool,
    #[cfg(debug_assertions)]
    history: VecDeque<Transition>,
}

impl CancelState {
    #[cfg(debug_assertions)]
    fn record(&mut self, operation: &'static str) {
        if self.history.len() == TRANSITION_HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(Transition {
            operation,
            backtrace: Backtrace::capture(),
        });
    }

    #[cfg(not(debug_assertions))]
    fn record(&mut self, _operation: &'static str) {}
}

/// The part the OS handler can reach. Only the event and the ignore flag are
/// touched from the signal thread.
#[derive(Debug, Default)]
struct Shared {
    event: OnceLock<CancelEvent>,
    ignore: AtomicBool,
}

impl Shared {
    fn event(&self) -> &CancelEvent {
        self.event.get_or_init(CancelEvent::new)
    }
}

impl ControlSink for Shared {
    fn deliver(&self, signal: ControlSignal) -> SignalDisposition {
        log::debug!("Console control signal received: {:?}", signal);
        if signal.is_user_interrupt() {
            if !self.ignore.load(Ordering::Acquire) {
                self.event().set();
            }
            SignalDisposition::Handled
        } else if signal.is_terminal_closure() {
            self.event().set();
            SignalDisposition::Unhandled
        } else {
            SignalDisposition::Handled
        }
    }
}

/// The cancellation service. A process normally uses exactly one, see [`global`].
pub struct Cancellation {
    shared: Arc<Shared>,
    state: Mutex<CancelState>,
    host: Arc<dyn ConsoleHost>,
}

impl std::fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cancellation")
            .field("state", &self.snapshot())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Cancellation {
    /// A disabled service bound to `host`. Nothing is registered until [`Cancellation::enable`].
    pub fn new(host: Arc<dyn ConsoleHost>) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            state: Mutex::new(CancelState::default()),
            host,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CancelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts delivering interrupts to this service.
    ///
    /// Creates the event if needed, sets the ignore flag to `ignore_initially`,
    /// lets child processes receive Ctrl+C again, installs the OS handler once,
    /// and turns processed, line and echo input on for the console. Calling it
    /// again only updates the ignore flag.
    ///
    /// Console input that is not a console (redirected stdin) is left alone.
    pub fn enable(&self, ignore_initially: bool) -> Result<(), CancelError> {
        self.shared.event();
        let previous_ignore = self
            .shared
            .ignore
            .swap(ignore_initially, Ordering::AcqRel);
        let previous_inherited = self.lock_state().inherited_ignore;

        if let Err(e) = self.inherited_process() {
            log::warn!("Could not let child processes receive Ctrl+C: {}", e);
        }

        let registered = {
            let mut state = self.lock_state();
            let result = if state.handler_registered {
                Ok(())
            } else {
                let sink: Weak<dyn ControlSink> = Arc::downgrade(&self.shared) as Weak<dyn ControlSink>;
                self.host.register_handler(sink)
            };
            if result.is_ok() {
                state.handler_registered = true;
                state.record("enable");
            }
            result
        };

        if let Err(e) = registered {
            // Leave the state as it was before the call.
            self.shared.ignore.store(previous_ignore, Ordering::Release);
            if previous_inherited {
                if let Err(restore) = self.inherited_ignore() {
                    log::warn!("Could not restore inherited Ctrl+C handling: {}", restore);
                }
            }
            return Err(CancelError::HandlerRegistration(e));
        }
        log::debug!("Cancellation enabled (ignore = {}).", ignore_initially);

        let handle = self.host.input_handle();
        match self.host.input_mode(handle) {
            Ok(mode) => {
                if let Err(e) = self.set_input_console_mode(handle, mode | INTERACTIVE_INPUT_MODE) {
                    log::warn!("Could not enable processed console input: {}", e);
                }
            }
            Err(e) => log::debug!("Console input mode unavailable, leaving it alone: {}", e),
        }
        Ok(())
    }

    /// Removes the OS handler and makes child processes inherit "ignore Ctrl+C".
    /// The event keeps its state and can still be queried and reset.
    pub fn disable(&self) -> Result<(), CancelError> {
        {
            let state = self.lock_state();
            if !state.handler_registered {
                return Err(CancelError::NotEnabled);
            }
        }
        self.host.unregister_handler()?;
        if let Err(e) = self.inherited_ignore() {
            log::warn!("Could not make child processes ignore Ctrl+C: {}", e);
        }

        let mut state = self.lock_state();
        state.handler_registered = false;
        self.shared.ignore.store(false, Ordering::Release);
        state.record("disable");
        log::debug!("Cancellation disabled.");
        Ok(())
    }

    /// Stops user interrupts from setting the event. Terminal closure still does.
    pub fn ignore(&self) -> Result<(), CancelError> {
        let mut state = self.lock_state();
        if !state.handler_registered {
            return Err(CancelError::NotEnabled);
        }
        self.shared.ignore.store(true, Ordering::Release);
        state.record("ignore");
        log::debug!("Cancellation now ignoring user interrupts.");
        Ok(())
    }

    /// Makes child processes created from now on ignore Ctrl+C.
    pub fn inherited_ignore(&self) -> Result<(), CancelError> {
        self.set_inherited(true)
    }

    /// Makes child processes created from now on receive Ctrl+C.
    pub fn inherited_process(&self) -> Result<(), CancelError> {
        self.set_inherited(false)
    }

    fn set_inherited(&self, ignore: bool) -> Result<(), CancelError> {
        let mut state = self.lock_state();
        self.host.set_inheritable_ignore(ignore)?;
        state.inherited_ignore = ignore;
        state.record(if ignore {
            "inherited_ignore"
        } else {
            "inherited_process"
        });
        Ok(())
    }

    /// Cancels programmatically, as if the user had pressed Ctrl+C.
    pub fn set(&self) {
        self.shared.event().set();
    }

    /// Clears the event. Races with a signal arriving at the same moment.
    pub fn reset(&self) {
        if let Some(event) = self.shared.event.get() {
            event.reset();
        }
    }

    /// Non-blocking poll of the event.
    pub fn is_cancelled(&self) -> bool {
        self.shared.event.get().is_some_and(CancelEvent::is_set)
    }

    /// `Err(Cancelled)` once the event is set, for use with `?`.
    pub fn check(&self) -> Result<(), CancelError> {
        if self.is_cancelled() {
            Err(CancelError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// The event itself, to wait on alongside other work.
    pub fn get_event(&self) -> CancelEvent {
        self.shared.event().clone()
    }

    /// The single place the console input mode is changed, so the
    /// processed-input mirror stays truthful.
    pub fn set_input_console_mode(&self, handle: ConsoleHandle, mode: u32) -> Result<(), CancelError> {
        let mut state = self.lock_state();
        self.host.set_input_mode(handle, mode)?;
        state.processed_input = mode & ENABLE_PROCESSED_INPUT != 0;
        state.record("set_input_console_mode");
        Ok(())
    }

    /// Copies the current state.
    pub fn snapshot(&self) -> CancelSnapshot {
        let state = self.lock_state();
        CancelSnapshot {
            handler_registered: state.handler_registered,
            ignore: self.shared.ignore.load(Ordering::Acquire),
            inherited_ignore: state.inherited_ignore,
            processed_input: state.processed_input,
        }
    }

    /// True while the OS handler is registered.
    pub fn is_enabled(&self) -> bool {
        self.lock_state().handler_registered
    }

    /// Names of the most recent state transitions, oldest first. Their call
    /// stacks are kept alongside for a debugger.
    #[cfg(debug_assertions)]
    pub fn transition_history(&self) -> Vec<&'static str> {
        self.lock_state()
            .history
            .iter()
            .map(|transition| transition.operation)
            .collect()
    }
}

impl Drop for Cancellation {
    fn drop(&mut self) {
        let registered = self
            .state
            .get_mut()
            .map(|state| state.handler_registered)
            .unwrap_or_else(|poisoned| poisoned.into_inner().handler_registered);
        if registered {
            if let Err(e) = self.host.unregister_handler() {
                log::warn!("Could not unregister console control handler: {}", e);
            }
        }
    }
}

static GLOBAL: OnceLock<Cancellation> = OnceLock::new();

/// The process-wide cancellation service, bound to the platform console.
pub fn global() -> &'static Cancellation {
    GLOBAL.get_or_init(|| Cancellation::new(platform_console()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ENABLE_ECHO_INPUT, ENABLE_LINE_INPUT};
    use crate::system::console::DetachedConsole;
    use std::thread;

    fn detached() -> (Arc<DetachedConsole>, Cancellation) {
        let host = Arc::new(DetachedConsole::new());
        let cancellation = Cancellation::new(host.clone());
        (host, cancellation)
    }

    #[test]
    fn test_ctrl_c_is_edge_triggered_until_reset() {
        let (host, cancel) = detached();
        cancel.enable(false).unwrap();

        assert_eq!(
            host.raise(ControlSignal::CtrlC),
            Some(SignalDisposition::Handled)
        );
        assert!(cancel.is_cancelled());

        host.raise(ControlSignal::CtrlC);
        assert!(cancel.is_cancelled());

        cancel.reset();
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_ignore_swallows_interrupts_but_not_closure() {
        let (host, cancel) = detached();
        cancel.enable(true).unwrap();

        assert_eq!(
            host.raise(ControlSignal::CtrlC),
            Some(SignalDisposition::Handled)
        );
        assert!(!cancel.is_cancelled());

        assert_eq!(
            host.raise(ControlSignal::Close),
            Some(SignalDisposition::Unhandled)
        );
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_signal_classification_table() {
        let cases = [
            (ControlSignal::CtrlC, false, SignalDisposition::Handled, true),
            (ControlSignal::Break, false, SignalDisposition::Handled, true),
            (ControlSignal::Close, false, SignalDisposition::Unhandled, true),
            (ControlSignal::Logoff, false, SignalDisposition::Unhandled, true),
            (ControlSignal::Shutdown, false, SignalDisposition::Unhandled, true),
            (ControlSignal::CtrlC, true, SignalDisposition::Handled, false),
            (ControlSignal::Break, true, SignalDisposition::Handled, false),
            (ControlSignal::Close, true, SignalDisposition::Unhandled, true),
            (ControlSignal::Logoff, true, SignalDisposition::Unhandled, true),
            (ControlSignal::Shutdown, true, SignalDisposition::Unhandled, true),
            (ControlSignal::Other(9), false, SignalDisposition::Handled, false),
        ];
        for (signal, ignoring, disposition, sets_event) in cases {
            let (host, cancel) = detached();
            cancel.enable(ignoring).unwrap();
            assert_eq!(host.raise(signal), Some(disposition), "{signal:?}");
            assert_eq!(cancel.is_cancelled(), sets_event, "{signal:?} ignoring={ignoring}");
        }
    }

    #[test]
    fn test_enable_twice_is_same_as_once() {
        let (host, cancel) = detached();
        cancel.enable(false).unwrap();
        let once = cancel.snapshot();
        let event = cancel.get_event();

        cancel.enable(false).unwrap();
        assert_eq!(cancel.snapshot(), once);
        assert_eq!(host.registrations(), 1);

        // Still the same event.
        cancel.set();
        assert!(event.is_set());
    }

    #[test]
    fn test_enable_sets_interactive_console_mode() {
        let (host, cancel) = detached();
        host.set_input_mode(ConsoleHandle::default(), 0x0200).unwrap();

        cancel.enable(false).unwrap();

        let expected = 0x0200 | ENABLE_PROCESSED_INPUT | ENABLE_LINE_INPUT | ENABLE_ECHO_INPUT;
        assert_eq!(host.mode(), expected);
        let snapshot = cancel.snapshot();
        assert!(snapshot.handler_registered);
        assert!(snapshot.processed_input);
        assert!(!snapshot.inherited_ignore);
        assert!(!host.inheritable_ignore());
    }

    #[test]
    fn test_set_input_console_mode_mirrors_processed_bit() {
        let (host, cancel) = detached();
        cancel.set_input_console_mode(ConsoleHandle::default(), ENABLE_LINE_INPUT).unwrap();
        assert!(!cancel.snapshot().processed_input);
        assert_eq!(host.mode(), ENABLE_LINE_INPUT);

        cancel.set_input_console_mode(ConsoleHandle::default(), ENABLE_PROCESSED_INPUT).unwrap();
        assert!(cancel.snapshot().processed_input);
    }

    #[test]
    fn test_disable_and_ignore_require_enable() {
        let (_host, cancel) = detached();
        assert!(matches!(cancel.disable(), Err(CancelError::NotEnabled)));
        assert!(matches!(cancel.ignore(), Err(CancelError::NotEnabled)));
    }

    #[test]
    fn test_disable_unregisters_and_inherits_ignore() {
        let (host, cancel) = detached();
        cancel.enable(false).unwrap();
        cancel.set();

        cancel.disable().unwrap();

        assert!(!host.is_registered());
        assert!(host.inheritable_ignore());
        let snapshot = cancel.snapshot();
        assert!(!snapshot.handler_registered);
        assert!(snapshot.inherited_ignore);
        assert!(!snapshot.ignore);

        // The event outlives the handler.
        assert!(cancel.is_cancelled());
        cancel.reset();
        assert!(!cancel.is_cancelled());
        assert_eq!(host.raise(ControlSignal::CtrlC), None);
    }

    #[test]
    fn test_disable_clears_ignore() {
        let (_host, cancel) = detached();
        cancel.enable(true).unwrap();
        assert!(cancel.snapshot().ignore);

        cancel.disable().unwrap();

        let snapshot = cancel.snapshot();
        assert!(!snapshot.handler_registered);
        assert!(!snapshot.ignore);
    }

    /// A host whose handler registration always fails.
    #[derive(Debug, Default)]
    struct RefusingConsole {
        inner: DetachedConsole,
    }

    impl ConsoleHost for RefusingConsole {
        fn register_handler(&self, _sink: Weak<dyn ControlSink>) -> std::io::Result<()> {
            Err(std::io::Error::other("handler table full"))
        }

        fn unregister_handler(&self) -> std::io::Result<()> {
            self.inner.unregister_handler()
        }

        fn set_inheritable_ignore(&self, ignore: bool) -> std::io::Result<()> {
            self.inner.set_inheritable_ignore(ignore)
        }

        fn input_handle(&self) -> ConsoleHandle {
            self.inner.input_handle()
        }

        fn input_mode(&self, handle: ConsoleHandle) -> std::io::Result<u32> {
            self.inner.input_mode(handle)
        }

        fn set_input_mode(&self, handle: ConsoleHandle, mode: u32) -> std::io::Result<()> {
            self.inner.set_input_mode(handle, mode)
        }
    }

    #[test]
    fn test_failed_enable_leaves_state_unchanged() {
        // --- Setup ---
        let host = Arc::new(RefusingConsole::default());
        let cancel = Cancellation::new(host.clone());
        cancel.inherited_ignore().unwrap();
        let before = cancel.snapshot();

        // --- Execute ---
        let result = cancel.enable(true);

        // --- Assert ---
        assert!(matches!(result, Err(CancelError::HandlerRegistration(_))));
        assert_eq!(cancel.snapshot(), before);
        assert!(!cancel.snapshot().ignore);
        assert!(host.inner.inheritable_ignore());
        assert_eq!(host.inner.mode(), 0);
    }

    #[test]
    fn test_ignore_after_enable() {
        let (host, cancel) = detached();
        cancel.enable(false).unwrap();
        cancel.ignore().unwrap();
        assert!(cancel.snapshot().ignore);

        host.raise(ControlSignal::Break);
        assert!(!cancel.is_cancelled());

        // Re-enabling takes the requested ignore state.
        cancel.enable(false).unwrap();
        host.raise(ControlSignal::Break);
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_check_reports_cancellation() {
        let (_host, cancel) = detached();
        assert!(cancel.check().is_ok());
        assert!(!cancel.is_cancelled());
        cancel.set();
        assert!(matches!(cancel.check(), Err(CancelError::Cancelled)));
    }

    #[test]
    fn test_signal_from_another_thread_wakes_waiter() {
        let (host, cancel) = detached();
        cancel.enable(false).unwrap();
        let event = cancel.get_event();

        let raiser = thread::spawn(move || {
            host.raise(ControlSignal::CtrlC);
        });
        assert!(event.wait_timeout(Duration::from_secs(5)));
        raiser.join().unwrap();
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_wait_timeout_expires_when_unsignalled() {
        let event = CancelEvent::new();
        assert!(!event.wait_timeout(Duration::from_millis(10)));
        event.set();
        event.wait();
        assert!(event.is_set());
    }

    #[test]
    fn test_drop_unregisters_handler() {
        let (host, cancel) = detached();
        cancel.enable(false).unwrap();
        assert!(host.is_registered());
        drop(cancel);
        assert!(!host.is_registered());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_transitions_are_recorded() {
        let (_host, cancel) = detached();
        cancel.enable(false).unwrap();
        cancel.disable().unwrap();
        let history = cancel.transition_history();
        assert!(history.contains(&"enable"));
        assert_eq!(history.last(), Some(&"disable"));
    }
}
