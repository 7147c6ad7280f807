use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};

use crate::command::CommandBatch;
use crate::config::NavigationConfig;
use crate::control::{Decision, NavigationController, NavigationStatus};
use crate::driver::Driver;
use crate::line_reader::{LineReader, ReadOutcome};
use crate::link::{LinkError, LinkKind};
use crate::nmea::{self, Sentence};
use crate::watchdog::FixWatchdog;

/// Pause after a failed GPS read so a dead port doesn't spin the loop.
const READ_ERROR_BACKOFF_MS: u64 = 100;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Arrived,
    Quit,
    /// The GPS source ended, e.g. the end of a replayed log.
    LinkClosed,
}


/**
 * Reads fixes, decides, and commands the boat until it arrives or is told to quit. Everything
 * happens on one thread: a read, then a decision, then the writes.
 */
pub struct Pilot<R: Read, D: Driver> {
    reader: LineReader<R>,
    driver: D,
    controller: NavigationController,
    watchdog: FixWatchdog,
    navigate_on_gga: bool,
}


impl<R: Read, D: Driver> Pilot<R, D> {
    pub fn new(
        reader: LineReader<R>,
        driver: D,
        config: &NavigationConfig,
        navigate_on_gga: bool,
    ) -> Pilot<R, D> {
        Pilot {
            reader,
            driver,
            controller: NavigationController::new(config.target, config.turn_threshold_d),
            watchdog: FixWatchdog::new(config.stale_timeout),
            navigate_on_gga,
        }
    }

    pub fn controller(&self) -> &NavigationController {
        &self.controller
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /**
     * Runs until arrival, a quit request, or the end of the GPS stream. Arrival only ends the run
     * once its stop has been delivered; any other ending sends one last stop before returning.
     */
    pub fn run(&mut self, quit: &AtomicBool) -> RunOutcome {
        let outcome = self.navigate(quit);
        if outcome == RunOutcome::Arrived {
            return outcome;
        }
        match self.driver.halt() {
            Ok(_) => info!("Motors stopped"),
            Err(e) => error!("Unable to send final stop: {}", e),
        }
        outcome
    }

    fn navigate(&mut self, quit: &AtomicBool) -> RunOutcome {
        loop {
            if quit.load(Ordering::SeqCst) {
                info!("Quit requested, shutting down");
                return RunOutcome::Quit;
            }
            if self.controller.status() == NavigationStatus::Arrived && !self.driver.has_pending() {
                return RunOutcome::Arrived;
            }

            self.retry_pending();
            match self.reader.read_line() {
                Ok(ReadOutcome::Line(line)) => {
                    self.handle_line(&line, Utc::now());
                }
                Ok(ReadOutcome::Timeout) => debug!("No GPS data before the read timeout"),
                Ok(ReadOutcome::Closed) => {
                    warn!("GPS stream ended");
                    return RunOutcome::LinkClosed;
                }
                Err(source) => {
                    let error = LinkError::Io {
                        link: LinkKind::Positioning,
                        source,
                    };
                    error!("{}", error);
                    thread::sleep(StdDuration::from_millis(READ_ERROR_BACKOFF_MS));
                }
            }
            self.check_watchdog(Utc::now());
        }
    }

    /**
     * Decodes one line and, if it carries a fix we navigate on, runs a decision cycle and sends
     * the resulting commands.
     */
    pub fn handle_line(&mut self, line: &str, now: DateTime<Utc>) -> Option<Decision> {
        let sentence = match nmea::parse(line, now) {
            Ok(sentence) => sentence,
            Err(e) => {
                warn!("Discarding '{}': {}", line.trim(), e);
                return None;
            }
        };
        let fix = match sentence {
            Sentence::Rmc(fix) => fix,
            Sentence::Gga(gga) => {
                debug!(
                    "GGA valid: {}, satellites: {:?}, HDOP: {:?}",
                    gga.fix.valid, gga.satellites_used, gga.horizontal_dilution_of_precision
                );
                if !self.navigate_on_gga {
                    return None;
                }
                gga.fix
            }
            Sentence::NotRelevant => {
                debug!("Ignoring '{}'", line.trim());
                return None;
            }
        };

        if fix.valid {
            self.watchdog.feed(&fix);
        } else {
            debug!("GPS has no fix");
        }
        let decision = self.controller.handle_fix(&fix);
        self.transmit(&decision.commands);
        log_status(&decision);
        Some(decision)
    }

    /**
     * Stops the boat if fixes have stopped arriving while navigating.
     */
    pub fn check_watchdog(&mut self, now: DateTime<Utc>) {
        if self.controller.status() != NavigationStatus::Navigating || !self.watchdog.is_stale(now)
        {
            return;
        }
        let silence_ms = match self.watchdog.since_last_fix(now) {
            Some(elapsed) => elapsed.num_milliseconds(),
            None => 0,
        };
        warn!(
            "No valid fix for {} ms (limit {} ms), stopping until fixes resume",
            silence_ms,
            self.watchdog.timeout().num_milliseconds()
        );
        if let Some(batch) = self.controller.mark_stale() {
            self.transmit(&batch);
        }
    }

    fn transmit(&mut self, batch: &CommandBatch) {
        if let Err(e) = self.driver.drive(batch) {
            error!("Unable to send {}, will retry: {}", batch, e);
        }
    }

    fn retry_pending(&mut self) {
        match self.driver.retry_pending() {
            Ok(true) => info!("Resent commands after an earlier failure"),
            Ok(false) => (),
            Err(e) => warn!("Still unable to send commands: {}", e),
        }
    }
}


fn log_status(decision: &Decision) {
    if let Some(report) = decision.report {
        info!(
            "Dist: {:.1}m | Heading: {:.0}{} | Target: {:.0} | Error: {:+.0} | Sent: {}",
            report.distance_m,
            report.heading_d,
            if report.heading_known { "" } else { " (unknown)" },
            report.bearing_d,
            report.heading_error_d,
            decision.commands
        );
    }
    if decision.status == NavigationStatus::Arrived && !decision.commands.is_empty() {
        info!("Target reached! Stopping motors.");
    }
}
