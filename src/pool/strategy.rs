//! Credential selection strategies

use crate::models::Credential;

/// Strategy for choosing among the currently active credentials
///
/// Implementations receive the active credentials in insertion order
/// and pick one of them.
pub trait SelectionStrategy: Send + Sync {
    /// Pick a credential from the given active set
    ///
    /// Returns None when the set is empty.
    fn select<'a>(&self, active: &'a [Credential]) -> Option<&'a Credential>;
}

/// Picks the first active credential in insertion order
///
/// This is the default strategy. Repeated runs keep using the same
/// credential until it leaves the active set.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAvailable;

impl SelectionStrategy for FirstAvailable {
    fn select<'a>(&self, active: &'a [Credential]) -> Option<&'a Credential> {
        active.first()
    }
}
