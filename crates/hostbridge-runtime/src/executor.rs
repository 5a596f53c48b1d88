//! Executor globals
//!
//! Per-thread state of the currently running request: the list of notices and
//! warnings reported so far, and the exception (or fatal error) raised from a
//! place that has no caller to return it to, such as an object destructor that
//! runs when the last reference is dropped.

use std::cell::RefCell;

use crate::error::{ErrorLevel, HostError};

/// A notice, warning or error reported through the host channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    /// Severity
    pub level: ErrorLevel,
    /// Message text
    pub message: String,
}

#[derive(Default)]
struct ExecutorGlobals {
    reported: Vec<ReportedError>,
    pending: Option<HostError>,
}

thread_local! {
    static GLOBALS: RefCell<ExecutorGlobals> = RefCell::new(ExecutorGlobals::default());
}

/// Report a notice, warning or error
pub fn report(level: ErrorLevel, message: impl Into<String>) {
    let message = message.into();
    match level {
        ErrorLevel::Notice | ErrorLevel::Deprecated => log::info!("{}: {}", level, message),
        ErrorLevel::Warning => log::warn!("{}: {}", level, message),
        ErrorLevel::Error | ErrorLevel::CoreError => log::error!("{}: {}", level, message),
    }
    GLOBALS.with(|g| g.borrow_mut().reported.push(ReportedError { level, message }));
}

/// Raise an error that cannot be returned to a caller.
///
/// The first pending error wins; later ones are reported as warnings so they
/// are not lost.
pub fn raise(error: HostError) {
    GLOBALS.with(|g| {
        let mut g = g.borrow_mut();
        if g.pending.is_none() {
            g.pending = Some(error);
        } else {
            let message = error.to_string();
            drop(g);
            report(ErrorLevel::Warning, message);
        }
    });
}

/// Take the pending error, if any
pub fn take_pending() -> Option<HostError> {
    GLOBALS.with(|g| g.borrow_mut().pending.take())
}

/// Snapshot of everything reported on this thread
pub fn reported() -> Vec<ReportedError> {
    GLOBALS.with(|g| g.borrow().reported.clone())
}

/// Drain everything reported on this thread
pub fn take_reported() -> Vec<ReportedError> {
    GLOBALS.with(|g| std::mem::take(&mut g.borrow_mut().reported))
}

/// Clear the executor globals (request shutdown)
pub fn reset() {
    GLOBALS.with(|g| *g.borrow_mut() = ExecutorGlobals::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_and_take() {
        reset();
        report(ErrorLevel::Notice, "Undefined property: Foo::$bar");
        report(ErrorLevel::Warning, "count(): Parameter must be countable");

        let reported = take_reported();
        assert_eq!(reported.len(), 2);
        assert_eq!(reported[0].level, ErrorLevel::Notice);
        assert!(take_reported().is_empty());
    }

    #[test]
    fn test_first_pending_error_wins() {
        reset();
        raise(HostError::fatal("first"));
        raise(HostError::fatal("second"));

        assert_eq!(take_pending(), Some(HostError::fatal("first")));
        assert_eq!(take_pending(), None);
        let reported = take_reported();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].message, "Fatal error: second");
    }
}
