use parking_lot::{const_mutex, Mutex};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Process-wide execution settings read by numerical code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMode {
    /// Compiled (fused) execution is allowed.
    pub jit_enabled: bool,
    /// Network outputs are checked for NaN and infinity.
    pub debug_nans: bool,
}

static ACTIVE_MODE: Mutex<ExecutionMode> = const_mutex(ExecutionMode::DEFAULT);

// The mode is process-wide; tests that touch it take turns.
#[cfg(test)]
pub(crate) static TEST_LOCK: Mutex<()> = const_mutex(());

impl ExecutionMode {
    pub const DEFAULT: ExecutionMode = ExecutionMode {
        jit_enabled: true,
        debug_nans: false,
    };

    /// The mode a run asks for. Any debug flag turns compilation off.
    pub fn from_flags(nan_debug: bool, disable_jit: bool) -> Self {
        if nan_debug || disable_jit {
            ExecutionMode {
                jit_enabled: false,
                debug_nans: nan_debug,
            }
        } else {
            ExecutionMode::DEFAULT
        }
    }

    pub fn is_debug(&self) -> bool {
        !self.jit_enabled || self.debug_nans
    }

    /// The currently active process-wide mode.
    pub fn current() -> Self {
        *ACTIVE_MODE.lock()
    }
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::DEFAULT
    }
}

/// Switches the process-wide mode for as long as it lives.
///
/// The previous mode comes back when the guard is dropped, including while
/// unwinding from a panic.
#[must_use = "the mode is restored as soon as the guard is dropped"]
pub struct ExecutionModeGuard {
    previous: ExecutionMode,
}

impl ExecutionModeGuard {
    pub fn enter(mode: ExecutionMode) -> Self {
        let previous = std::mem::replace(&mut *ACTIVE_MODE.lock(), mode);
        debug!(?mode, ?previous, "execution mode entered");
        ExecutionModeGuard { previous }
    }
}

impl Drop for ExecutionModeGuard {
    fn drop(&mut self) {
        *ACTIVE_MODE.lock() = self.previous;
    }
}

/// Run `f` under the mode selected by the debug flags.
///
/// Without either flag `f` runs directly in whatever mode is active.
pub fn with_mode<T>(nan_debug: bool, disable_jit: bool, f: impl FnOnce() -> T) -> T {
    let mode = ExecutionMode::from_flags(nan_debug, disable_jit);
    if !mode.is_debug() {
        return f();
    }
    let _guard = ExecutionModeGuard::enter(mode);
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_from_flags() {
        assert_eq!(ExecutionMode::from_flags(false, false), ExecutionMode::DEFAULT);
        assert_eq!(
            ExecutionMode::from_flags(true, false),
            ExecutionMode {
                jit_enabled: false,
                debug_nans: true
            }
        );
        assert_eq!(
            ExecutionMode::from_flags(false, true),
            ExecutionMode {
                jit_enabled: false,
                debug_nans: false
            }
        );
        assert!(!ExecutionMode::DEFAULT.is_debug());
    }

    #[test]
    fn test_with_mode_without_flags_leaves_mode_alone() {
        let _lock = TEST_LOCK.lock();
        let seen = with_mode(false, false, ExecutionMode::current);
        assert_eq!(seen, ExecutionMode::DEFAULT);
        assert_eq!(ExecutionMode::current(), ExecutionMode::DEFAULT);
    }

    #[test]
    fn test_with_mode_switches_and_restores() {
        let _lock = TEST_LOCK.lock();
        let seen = with_mode(true, false, ExecutionMode::current);
        assert!(!seen.jit_enabled);
        assert!(seen.debug_nans);

        let seen = with_mode(false, true, ExecutionMode::current);
        assert!(!seen.jit_enabled);
        assert!(!seen.debug_nans);

        assert_eq!(ExecutionMode::current(), ExecutionMode::DEFAULT);
    }

    #[test]
    fn test_with_mode_returns_value() {
        let _lock = TEST_LOCK.lock();
        assert_eq!(with_mode(true, true, || 7), 7);
    }

    #[test]
    fn test_mode_restored_after_panic() {
        let _lock = TEST_LOCK.lock();
        let result = catch_unwind(AssertUnwindSafe(|| {
            with_mode::<()>(true, false, || panic!("training blew up"))
        }));
        assert!(result.is_err());
        assert_eq!(ExecutionMode::current(), ExecutionMode::DEFAULT);
    }

    #[test]
    fn test_nested_guards_restore_in_order() {
        let _lock = TEST_LOCK.lock();
        let outer = ExecutionModeGuard::enter(ExecutionMode::from_flags(false, true));
        {
            let _inner = ExecutionModeGuard::enter(ExecutionMode::from_flags(true, false));
            assert!(ExecutionMode::current().debug_nans);
        }
        assert_eq!(
            ExecutionMode::current(),
            ExecutionMode::from_flags(false, true)
        );
        drop(outer);
        assert_eq!(ExecutionMode::current(), ExecutionMode::DEFAULT);
    }
}
