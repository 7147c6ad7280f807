use crate::geodesy::Degrees;
use crate::nmea::GpsFix;


/**
 * Tracks the last course over ground reported by the GPS. The boat has no compass, so the course
 * it was last seen moving along stands in for its heading.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct HeadingTracker {
    heading: Degrees,
    observed: bool,
}


impl HeadingTracker {
    pub fn new() -> HeadingTracker {
        HeadingTracker {
            heading: 0.0,
            observed: false,
        }
    }

    /**
     * Takes the course from the fix if it has one. Fixes without a course leave the last known
     * heading in place.
     */
    pub fn update(&mut self, fix: &GpsFix) {
        if let Some(course) = fix.course_over_ground {
            self.heading = course;
            self.observed = true;
        }
    }

    /// Last known heading, or north if the GPS hasn't reported a course yet.
    pub fn heading(&self) -> Degrees {
        self.heading
    }

    /// True once at least one course over ground has been seen.
    pub fn is_observed(&self) -> bool {
        self.observed
    }
}


impl Default for HeadingTracker {
    fn default() -> HeadingTracker {
        HeadingTracker::new()
    }
}


#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::HeadingTracker;
    use crate::nmea::GpsFix;

    fn fix_with_course(course: Option<f64>) -> GpsFix {
        GpsFix {
            latitude: 32.0853,
            longitude: 34.7818,
            course_over_ground: course,
            speed_over_ground: None,
            utc_time: None,
            valid: true,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_seeded_north() {
        let tracker = HeadingTracker::new();
        assert!(tracker.heading() == 0.0);
        assert!(!tracker.is_observed());
    }

    #[test]
    fn test_keeps_last_known() {
        let mut tracker = HeadingTracker::new();
        tracker.update(&fix_with_course(Some(123.4)));
        assert!(tracker.heading() == 123.4);
        assert!(tracker.is_observed());

        tracker.update(&fix_with_course(None));
        assert!(tracker.heading() == 123.4);

        tracker.update(&fix_with_course(Some(0.0)));
        assert!(tracker.heading() == 0.0);
        assert!(tracker.is_observed());
    }
}
