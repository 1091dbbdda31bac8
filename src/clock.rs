use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Bratislava;

/// Wall clock pinned to one time zone, used for `recorded_at` and upload keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneClock {
    tz: Tz,
}

impl ZoneClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.tz).fixed_offset()
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

impl Default for ZoneClock {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}
