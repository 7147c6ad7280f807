use chrono::{DateTime, Duration, Utc};

use crate::nmea::GpsFix;


/**
 * Notices when valid fixes stop arriving. Only arrival time matters here; what the fixes say is
 * the controller's business.
 */
pub struct FixWatchdog {
    timeout: Duration,
    last_valid_fix_at: Option<DateTime<Utc>>,
}


impl FixWatchdog {
    pub fn new(timeout: Duration) -> FixWatchdog {
        FixWatchdog {
            timeout,
            last_valid_fix_at: None,
        }
    }

    pub fn feed(&mut self, fix: &GpsFix) {
        if fix.valid {
            self.last_valid_fix_at = Some(fix.received_at);
        }
    }

    /**
     * True when a valid fix has been seen before but none within the timeout. Before the first
     * valid fix there is nothing to go stale.
     */
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.since_last_fix(now) {
            Some(elapsed) => elapsed > self.timeout,
            None => false,
        }
    }

    pub fn since_last_fix(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_valid_fix_at.map(|at| now.signed_duration_since(at))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}


#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::FixWatchdog;
    use crate::nmea::GpsFix;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn fix_at(received_at: DateTime<Utc>, valid: bool) -> GpsFix {
        GpsFix {
            latitude: 1.0,
            longitude: 2.0,
            course_over_ground: None,
            speed_over_ground: None,
            utc_time: None,
            valid,
            received_at,
        }
    }

    #[test]
    fn test_not_stale_before_first_fix() {
        let watchdog = FixWatchdog::new(Duration::seconds(3));
        assert!(!watchdog.is_stale(start() + Duration::hours(1)));
        assert!(watchdog.since_last_fix(start()).is_none());
    }

    #[test]
    fn test_stale_after_timeout() {
        let mut watchdog = FixWatchdog::new(Duration::seconds(3));
        watchdog.feed(&fix_at(start(), true));
        assert!(!watchdog.is_stale(start() + Duration::seconds(3)));
        assert!(watchdog.is_stale(start() + Duration::milliseconds(3001)));

        watchdog.feed(&fix_at(start() + Duration::seconds(4), true));
        assert!(!watchdog.is_stale(start() + Duration::seconds(5)));
    }

    #[test]
    fn test_invalid_fixes_do_not_feed() {
        let mut watchdog = FixWatchdog::new(Duration::seconds(3));
        watchdog.feed(&fix_at(start(), true));
        watchdog.feed(&fix_at(start() + Duration::seconds(2), false));
        assert!(watchdog.is_stale(start() + Duration::seconds(4)));
        assert!(watchdog.since_last_fix(start() + Duration::seconds(4)) == Some(Duration::seconds(4)));
    }
}
