use chrono::{DateTime, Datelike, FixedOffset, Local, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }

    /// The calendar month containing `now()`, in the clock's own offset.
    fn current_month(&self) -> MonthWindow {
        MonthWindow::containing(self.now())
    }
}

pub type ClockBox = Box<dyn Clock>;

/// Reads the local system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// A calendar month as seen from a particular UTC offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
    pub offset: FixedOffset,
}

impl MonthWindow {
    pub fn containing(instant: DateTime<FixedOffset>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
            offset: *instant.offset(),
        }
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        let local = instant.with_timezone(&self.offset);
        local.year() == self.year && local.month() == self.month
    }
}
