use std::time::{Duration, Instant};

/// Holds back a value until it has been left alone for a quiet interval.
///
/// There is at most one pending value at any time. Scheduling a new one drops
/// the previous one together with its deadline. The owner is expected to call
/// `poll` from its event loop; a pending value is handed out exactly once.
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet_interval: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(quiet_interval: Duration) -> Self {
        Self {
            quiet_interval,
            pending: None,
        }
    }

    pub fn quiet_interval(&self) -> Duration {
        self.quiet_interval
    }

    /// (Re)starts the timer for `value`, replacing whatever was pending.
    pub fn schedule(&mut self, value: T, now: Instant) {
        if self.pending.is_some() {
            log::trace!("Replacing pending debounce timer.");
        }
        self.pending = Some((now + self.quiet_interval, value));
    }

    /// Drops the pending value, if any, so it never fires.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The instant at which the pending value fires.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    /// Returns the pending value once its quiet interval has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.cancel(),
            _ => None,
        }
    }
}

#[test]
fn fires_once_after_quiet_interval() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(Duration::from_millis(500));
    debouncer.schedule("Paris", start);

    assert_eq!(debouncer.poll(start + Duration::from_millis(499)), None);
    assert_eq!(debouncer.poll(start + Duration::from_millis(500)), Some("Paris"));
    assert_eq!(debouncer.poll(start + Duration::from_millis(2000)), None);
    assert!(!debouncer.is_pending());
}

#[test]
fn rescheduling_restarts_the_timer() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(Duration::from_millis(500));
    debouncer.schedule("Par", start);
    debouncer.schedule("Pari", start + Duration::from_millis(200));
    debouncer.schedule("Paris", start + Duration::from_millis(400));

    assert_eq!(debouncer.poll(start + Duration::from_millis(600)), None);
    assert_eq!(
        debouncer.deadline(),
        Some(start + Duration::from_millis(900))
    );
    assert_eq!(debouncer.poll(start + Duration::from_millis(900)), Some("Paris"));
}

#[test]
fn cancelled_value_never_fires() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(Duration::from_millis(500));
    debouncer.schedule(1, start);

    assert_eq!(debouncer.cancel(), Some(1));
    assert_eq!(debouncer.poll(start + Duration::from_secs(10)), None);
}
