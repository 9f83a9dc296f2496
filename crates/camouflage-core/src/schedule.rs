use std::time::Duration;

/// Identifies one scheduled run. Any cancel or restart moves to a new epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Epoch(u64);

impl Epoch {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Handed to whoever drives the ticks; every tick must present it back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickToken {
    epoch: Epoch,
    interval: Duration,
}

impl TickToken {
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Suggested delay between ticks. Only affects pacing.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Cancellable repeating task keyed by epoch.
///
/// Starting or cancelling bumps the epoch, so tokens from an earlier run no
/// longer match and their ticks are ignored.
#[derive(Clone, Debug)]
pub struct TickScheduler {
    epoch: Epoch,
    active: bool,
    interval: Duration,
}

impl TickScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            epoch: Epoch::default(),
            active: false,
            interval,
        }
    }

    pub fn start(&mut self) -> TickToken {
        self.bump();
        self.active = true;
        TickToken {
            epoch: self.epoch,
            interval: self.interval,
        }
    }

    pub fn cancel(&mut self) {
        self.bump();
        self.active = false;
    }

    pub fn accepts(&self, token: &TickToken) -> bool {
        self.active && token.epoch == self.epoch
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    fn bump(&mut self) {
        self.epoch = Epoch(self.epoch.0.wrapping_add(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_invalidates_previous_token() {
        let mut scheduler = TickScheduler::new(Duration::from_millis(10));
        let first = scheduler.start();
        assert!(scheduler.accepts(&first));
        let second = scheduler.start();
        assert!(!scheduler.accepts(&first));
        assert!(scheduler.accepts(&second));
        assert!(second.epoch() > first.epoch());
    }

    #[test]
    fn cancel_rejects_current_token() {
        let mut scheduler = TickScheduler::new(Duration::from_millis(10));
        let token = scheduler.start();
        scheduler.cancel();
        assert!(!scheduler.is_active());
        assert!(!scheduler.accepts(&token));
    }

    #[test]
    fn token_carries_pacing() {
        let mut scheduler = TickScheduler::new(Duration::from_millis(250));
        assert_eq!(scheduler.start().interval(), Duration::from_millis(250));
    }
}
