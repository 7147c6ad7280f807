use std::fmt;

use crate::command::{Command, CommandBatch};
use crate::config::Target;
use crate::geodesy::{distance_m, heading_error_d, initial_bearing_d, Degrees, Meters};
use crate::heading::HeadingTracker;
use crate::nmea::GpsFix;

pub const DEFAULT_TURN_THRESHOLD_D: Degrees = 20.0;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationStatus {
    AwaitingFirstFix,
    Navigating,
    Arrived,
    FixStale,
}


impl fmt::Display for NavigationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            NavigationStatus::AwaitingFirstFix => "awaiting first fix",
            NavigationStatus::Navigating => "navigating",
            NavigationStatus::Arrived => "arrived",
            NavigationStatus::FixStale => "fix stale",
        };
        write!(f, "{}", name)
    }
}


/**
 * What the controller computed while deciding, for the status line.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavigationReport {
    pub distance_m: Meters,
    pub heading_d: Degrees,
    pub bearing_d: Degrees,
    pub heading_error_d: Degrees,
    /// False while steering is withheld because no course has been seen yet.
    pub heading_known: bool,
}


#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub commands: CommandBatch,
    pub status: NavigationStatus,
    pub report: Option<NavigationReport>,
}


/**
 * Decides how to steer toward a single target. The controller never does any I/O; it only turns
 * fixes into commands, so everything it does can be replayed in tests.
 */
pub struct NavigationController {
    target: Target,
    turn_threshold_d: Degrees,
    status: NavigationStatus,
    heading: HeadingTracker,
    last_fix: Option<GpsFix>,
}


impl NavigationController {
    pub fn new(target: Target, turn_threshold_d: Degrees) -> NavigationController {
        NavigationController {
            target,
            turn_threshold_d,
            status: NavigationStatus::AwaitingFirstFix,
            heading: HeadingTracker::new(),
            last_fix: None,
        }
    }

    pub fn status(&self) -> NavigationStatus {
        self.status
    }

    pub fn heading(&self) -> &HeadingTracker {
        &self.heading
    }

    pub fn last_fix(&self) -> Option<&GpsFix> {
        self.last_fix.as_ref()
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /**
     * Runs one decision cycle for a newly decoded fix.
     */
    pub fn handle_fix(&mut self, fix: &GpsFix) -> Decision {
        // Arrived is terminal; the board was already told to stop
        if self.status == NavigationStatus::Arrived || !fix.valid {
            return self.no_decision();
        }

        self.heading.update(fix);
        self.last_fix = Some(fix.clone());
        match self.status {
            NavigationStatus::AwaitingFirstFix => {
                info!("First valid fix received, navigating");
                self.status = NavigationStatus::Navigating;
            }
            NavigationStatus::FixStale => {
                info!("Fixes resumed, navigating");
                self.status = NavigationStatus::Navigating;
            }
            NavigationStatus::Navigating | NavigationStatus::Arrived => (),
        }
        self.navigate(fix)
    }

    /**
     * Suspends navigation because fixes stopped arriving. Returns the defensive stop the first
     * time this happens while navigating, and nothing otherwise.
     */
    pub fn mark_stale(&mut self) -> Option<CommandBatch> {
        if self.status != NavigationStatus::Navigating {
            return None;
        }
        self.status = NavigationStatus::FixStale;
        Some(CommandBatch::stop())
    }

    fn navigate(&mut self, fix: &GpsFix) -> Decision {
        let position = fix.coordinate();
        let goal = self.target.coordinate();
        let distance = distance_m(&position, &goal);
        let bearing = initial_bearing_d(&position, &goal);
        let heading = self.heading.heading();
        let error = heading_error_d(bearing, heading);
        let report = NavigationReport {
            distance_m: distance,
            heading_d: heading,
            bearing_d: bearing,
            heading_error_d: error,
            heading_known: self.heading.is_observed(),
        };

        let commands = if distance < self.target.arrival_radius_m {
            self.status = NavigationStatus::Arrived;
            CommandBatch::stop()
        } else if self.heading.is_observed() {
            CommandBatch::steer(steer(error, self.turn_threshold_d))
        } else {
            // Without any course we'd be guessing which way we're pointing, so hold the rudder
            // straight until the GPS reports one
            CommandBatch::steer(Command::Center)
        };

        Decision {
            commands,
            status: self.status,
            report: Some(report),
        }
    }

    fn no_decision(&self) -> Decision {
        Decision {
            commands: CommandBatch::empty(),
            status: self.status,
            report: None,
        }
    }
}


/**
 * Picks a steering command for a heading error. Errors exactly at the threshold hold course.
 */
pub fn steer(heading_error: Degrees, threshold: Degrees) -> Command {
    if heading_error > threshold {
        Command::TurnRight
    } else if heading_error < -threshold {
        Command::TurnLeft
    } else {
        Command::Center
    }
}
