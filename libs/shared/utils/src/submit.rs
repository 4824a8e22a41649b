use std::sync::atomic::{AtomicBool, Ordering};

/// Blocks a second submission of the same form while one is in flight.
/// Client-side only; the backend receives no idempotency key.
#[derive(Debug, Default)]
pub struct SubmitGuard {
    in_flight: AtomicBool,
}

impl SubmitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another submission holds the guard.
    pub fn try_begin(&self) -> Option<SubmitTicket<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitTicket {
                flag: &self.in_flight,
            })
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the guard when dropped, whichever way the request ended.
#[derive(Debug)]
pub struct SubmitTicket<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SubmitTicket<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
