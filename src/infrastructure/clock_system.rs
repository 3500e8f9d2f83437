use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::sleep;

use crate::Clock;

/// The real wall clock, sleeping on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait::async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        sleep(duration).await
    }
}

/// A clock that only moves when told to, recording every requested sleep.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
    sleeps: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl ManualClock {
    /// Creates a new `ManualClock` frozen at the given instant.
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
            sleeps: std::sync::Mutex::new(vec![]),
        }
    }

    /// Moves the clock forward.
    pub(crate) fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(duration).unwrap();
    }

    /// Retrieves the sleeps requested so far.
    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn system_clock_sleeps_for_duration() {
        let clock = SystemClock;
        let start = clock.now();

        clock.sleep(Duration::from_millis(20)).await;

        assert!(start + chrono::Duration::milliseconds(20) <= Utc::now());
    }

    #[tokio::test]
    async fn manual_clock_advances_on_sleep() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = ManualClock::new(start);

        clock.sleep(Duration::from_secs(30)).await;
        clock.advance(Duration::from_secs(5));

        assert_eq!(clock.now(), start + chrono::Duration::seconds(35));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(30)]);
    }
}
