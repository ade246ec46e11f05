//! [`SafetySession`] read model definition.
//!
//! [`SafetySession`]: crate::domain::SafetySession

#[cfg(doc)]
use crate::domain::SafetySession;

/// Wrapper around a [`SafetySession`] indicating that its scheduled end (plus
/// the watchdog grace period) has already passed, while it's still active.
#[derive(Clone, Debug)]
pub struct Overdue<T>(pub T);
