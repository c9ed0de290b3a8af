use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Coalesces bursts of requests: only the latest payload survives, and it is
/// released once `window` has passed without a newer request.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace any pending payload and restart the window.
    pub fn request(&mut self, payload: T, now: Instant) {
        self.pending = Some((now, payload));
    }

    /// The pending payload, if its window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((at, _)) if now.duration_since(*at) >= self.window => {
                self.pending.take().map(|(_, payload)| payload)
            }
            _ => None,
        }
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, payload)| payload)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_request_wins() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(100));
        d.request(1, start);
        d.request(2, start + Duration::from_millis(50));

        assert_eq!(d.poll(start + Duration::from_millis(120)), None);
        assert_eq!(d.poll(start + Duration::from_millis(150)), Some(2));
        assert!(!d.is_pending());
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut d: Debouncer<&str> = Debouncer::default();
        d.request("a", start);
        assert_eq!(d.cancel(), Some("a"));
        assert_eq!(d.poll(start + Duration::from_secs(1)), None);
    }
}
