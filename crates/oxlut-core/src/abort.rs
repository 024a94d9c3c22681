//! Cooperative cancellation
//!
//! An [`AbortSignal`] wraps a shared flag. Interrupt handlers raise it;
//! long-running stages poll it at chunk boundaries and stop with
//! [`Error::Aborted`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// Shared abort flag
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing flag, e.g. one registered with a signal handler
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    /// The underlying flag, for handing to a signal handler
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    pub fn raise(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// `Err(Error::Aborted)` once raised
    pub fn check(&self) -> Result<()> {
        if self.is_raised() {
            Err(Error::Aborted)
        } else {
            Ok(())
        }
    }
}
