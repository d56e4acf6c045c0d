//! Process-wide liveness flag, the guarded-thread helper that flips it on
//! any worker panic or error, and the plain observer list used by the
//! proof-tree model to announce mutations.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "is the process still running" flag. Read by every worker's loop
/// condition and flipped exactly once by whichever thread first observes a
/// terminal condition (engine exit, fatal protocol error, unhandled panic).
#[derive(Clone, Default)]
pub struct Life {
    alive: Arc<AtomicBool>,
}

impl Life {
    pub fn new() -> Self {
        Life {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn die(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

/// Runs `body` and, if it panics or returns an `Err`, captures the failure
/// text, flips `life`, and returns it instead of propagating the panic.
/// Every long-running worker loop in the workspace is started through this
/// so that one thread's failure terminates the process cleanly rather than
/// leaving siblings blocked forever on a queue nobody will ever fill again.
pub fn run_guarded<F, E>(life: &Life, thread_name: &str, body: F) -> Result<(), String>
where
    F: FnOnce() -> Result<(), E>,
    E: std::fmt::Display,
{
    let result = panic::catch_unwind(AssertUnwindSafe(body));
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            let message = format!("[{thread_name}] {e}");
            tracing::error!(thread = thread_name, error = %e, "worker thread failed");
            life.die();
            Err(message)
        }
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            let message = format!("[{thread_name}] panicked: {reason}");
            tracing::error!(thread = thread_name, %reason, "worker thread panicked");
            life.die();
            Err(message)
        }
    }
}

/// A plain, payload-free observer list. Owners hold one of these and call
/// [`Listeners::notify`] after every mutation; the proof tree never reaches
/// back into whatever is listening, so there is no risk of a re-entrant
/// callback running mid-mutation.
#[derive(Default)]
pub struct Listeners {
    callbacks: Vec<Box<dyn Fn() + Send + Sync>>,
}

impl Listeners {
    pub fn new() -> Self {
        Listeners {
            callbacks: Vec::new(),
        }
    }

    pub fn add<F: Fn() + Send + Sync + 'static>(&mut self, callback: F) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn notify(&self) {
        for callback in &self.callbacks {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn life_starts_alive_and_dies_once() {
        let life = Life::new();
        assert!(life.is_alive());
        life.die();
        assert!(!life.is_alive());
    }

    #[test]
    fn run_guarded_flips_life_on_error() {
        let life = Life::new();
        let result: Result<(), String> =
            run_guarded(&life, "test", || Err::<(), _>("boom".to_string()));
        assert!(result.is_err());
        assert!(!life.is_alive());
    }

    #[test]
    fn run_guarded_flips_life_on_panic() {
        let life = Life::new();
        let result = run_guarded(&life, "test", || -> Result<(), String> {
            panic!("kaboom");
        });
        assert!(result.is_err());
        assert!(!life.is_alive());
    }

    #[test]
    fn listeners_are_all_invoked() {
        let mut listeners = Listeners::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c1 = count.clone();
        listeners.add(move || {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = count.clone();
        listeners.add(move || {
            c2.fetch_add(1, Ordering::SeqCst);
        });
        listeners.notify();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
