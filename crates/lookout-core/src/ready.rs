//! One-shot "page has finished loading" latch.

/// Guards the ready notification so it fires at most once per page
/// lifetime.
///
/// Both arming paths race at startup (the document may already be
/// complete when the bridge installs, and the `load` event may still
/// fire afterwards); the latch makes whichever comes second a no-op.
/// It is reset only at the full-page teardown boundary, so soft
/// navigations never re-arm it.
#[derive(Debug, Default)]
pub struct ReadyLatch {
    sent: bool,
}

impl ReadyLatch {
    /// Creates an unfired latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true exactly once; every later call returns false.
    pub fn fire(&mut self) -> bool {
        if self.sent {
            return false;
        }
        self.sent = true;
        true
    }

    /// Whether the latch has fired.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Re-arms the latch. Called only from the teardown reset.
    pub fn reset(&mut self) {
        self.sent = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_exactly_once() {
        let mut latch = ReadyLatch::new();
        assert!(latch.fire());
        assert!(!latch.fire());
        assert!(!latch.fire());
        assert!(latch.is_sent());
    }

    #[test]
    fn reset_rearms() {
        let mut latch = ReadyLatch::new();
        assert!(latch.fire());
        latch.reset();
        assert!(latch.fire());
    }
}
