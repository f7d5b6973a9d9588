//! Recording output pin.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Result, TransportError};
use crate::traits::{OutputPin, PinLevel};

/// Output pin that records every level it is driven to.
///
/// Clones share the same record, so a test keeps one clone and hands the
/// other to the code under test.
///
/// ```
/// use loragate_hardware::mock::MockPin;
/// use loragate_hardware::traits::{OutputPin, PinLevel};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> loragate_hardware::Result<()> {
/// let pin = MockPin::new();
/// let mut driven = pin.clone();
///
/// driven.set_level(PinLevel::High).await?;
/// assert_eq!(pin.level(), Some(PinLevel::High));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockPin {
    levels: Arc<Mutex<Vec<PinLevel>>>,
    fail_next: Arc<AtomicBool>,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every level driven so far, oldest first.
    pub fn levels(&self) -> Vec<PinLevel> {
        self.record().clone()
    }

    /// Current level, `None` if never driven.
    pub fn level(&self) -> Option<PinLevel> {
        self.record().last().copied()
    }

    /// Make the next `set_level` call fail.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn record(&self) -> std::sync::MutexGuard<'_, Vec<PinLevel>> {
        // A panicking test thread must not hide the record from the others
        self.levels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl OutputPin for MockPin {
    async fn set_level(&mut self, level: PinLevel) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TransportError::other("Mock pin write failure"));
        }

        self.record().push(level);
        Ok(())
    }
}
