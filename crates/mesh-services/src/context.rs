//! What domain handlers are allowed to depend on besides their arguments.

use chrono::{Local, NaiveDate, NaiveDateTime};
use mesh_core::{IdGenerator, SequentialIds};
use std::sync::Arc;

/// Source of "now" for dates printed in responses.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Local wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Identifier and time sources shared by every handler of a service.
#[derive(Clone)]
pub struct ServiceContext {
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
}

impl ServiceContext {
    pub fn new(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self { ids, clock }
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// `YYYY-MM-DD HH:MM:SS`.
    pub(crate) fn timestamp(&self) -> String {
        self.clock.now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    pub(crate) fn next_id(&self, prefix: &str) -> String {
        self.ids.next_id(prefix)
    }
}

impl Default for ServiceContext {
    fn default() -> Self {
        Self::new(Arc::new(SequentialIds::new()), Arc::new(SystemClock))
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> ServiceContext {
    let instant = NaiveDate::from_ymd_opt(2026, 3, 1)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap();
    ServiceContext::new(Arc::new(SequentialIds::new()), Arc::new(FixedClock(instant)))
}
