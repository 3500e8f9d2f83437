use std::time::Duration;

use chrono::{DateTime, Utc};

/// A source of wall-clock time that can also pause the current task.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Clock: Sync + Send {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Waits for the given duration.
    async fn sleep(&self, duration: Duration);
}
