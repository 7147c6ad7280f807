/**
 * Mission configuration. Everything here is read once from the command line before the pilot
 * starts and never changes during a run.
 */
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use getopts::{Matches, Options};
use thiserror::Error;

use crate::control::DEFAULT_TURN_THRESHOLD_D;
use crate::geodesy::{Coordinate, Degrees, Meters};
use crate::termios::Speed;

pub const DEFAULT_ARRIVAL_RADIUS_M: Meters = 5.0;
pub const DEFAULT_STALE_TIMEOUT_S: f64 = 3.0;
pub const DEFAULT_GPS_PATH: &str = "/dev/ttyACM1";
pub const DEFAULT_GPS_BAUD: u32 = 9600;
pub const DEFAULT_ACTUATOR_PATH: &str = "/dev/ttyACM0";
pub const DEFAULT_ACTUATOR_BAUD: u32 = 115200;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;
// The Arduino resets when the port is opened
pub const DEFAULT_SETTLE_MS: u64 = 2000;


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub latitude: Degrees,
    pub longitude: Degrees,
    pub arrival_radius_m: Meters,
}


impl Target {
    pub fn new(latitude: Degrees, longitude: Degrees, arrival_radius_m: Meters) -> Target {
        Target {
            latitude,
            longitude,
            arrival_radius_m,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}


#[derive(Clone, Debug, PartialEq)]
pub struct NavigationConfig {
    pub target: Target,
    pub turn_threshold_d: Degrees,
    pub stale_timeout: chrono::Duration,
}


#[derive(Clone, Debug, PartialEq)]
pub struct LinkConfig {
    pub path: PathBuf,
    pub speed: Speed,
}


#[derive(Clone, Debug, PartialEq)]
pub struct PilotConfig {
    pub navigation: NavigationConfig,
    pub gps: LinkConfig,
    pub actuator: LinkConfig,
    pub read_timeout: Duration,
    pub settle: Duration,
    /// Also steer on GGA fixes, not just RMC ones.
    pub navigate_on_gga: bool,
    pub log_file: Option<PathBuf>,
    pub verbose: bool,
}


#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Options(#[from] getopts::Fail),

    #[error("Missing required option --{0}")]
    Missing(&'static str),

    #[error("Invalid value for --{option}: '{value}'")]
    Invalid {
        option: &'static str,
        value: String,
    },

    #[error("--{option} must be {expected}, got {value}")]
    OutOfRange {
        option: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("Unsupported baud rate for --{option}: {value}")]
    Baud { option: &'static str, value: u32 },
}


pub fn options() -> Options {
    let mut opts = Options::new();
    opts.optopt("", "target-lat", "Target latitude in decimal degrees.", "DEGREES");
    opts.optopt("", "target-lon", "Target longitude in decimal degrees.", "DEGREES");
    opts.optopt("", "radius", "Arrival radius in meters (default 5).", "METERS");
    opts.optopt(
        "",
        "turn-threshold",
        "Heading error before turning, in degrees (default 20).",
        "DEGREES",
    );
    opts.optopt(
        "",
        "stale-timeout",
        "Stop if no valid fix arrives for this long (default 3).",
        "SECONDS",
    );
    opts.optopt("", "gps", "GPS serial device or NMEA log file.", "PATH");
    opts.optopt("", "gps-baud", "GPS baud rate (default 9600).", "BAUD");
    opts.optopt("", "actuator", "Motor controller serial device.", "PATH");
    opts.optopt("", "actuator-baud", "Motor controller baud rate (default 115200).", "BAUD");
    opts.optopt("", "read-timeout-ms", "GPS read timeout (default 1000).", "MS");
    opts.optopt("", "settle-ms", "Wait after opening the links (default 2000).", "MS");
    opts.optflag("", "use-gga", "Also navigate on GGA sentences.");
    opts.optopt("", "log-file", "Also write logs to this file.", "PATH");
    opts.optflag("v", "verbose", "Prints extra logging.");
    opts.optflag("h", "help", "Print this help menu.");
    opts
}


pub fn usage(opts: &Options) -> String {
    let brief = "Usage: boat-pilot --target-lat DEGREES --target-lon DEGREES [options]";
    opts.usage(brief)
}


/**
 * Parses the command line, not including the program name. Returns None when help was requested.
 */
pub fn parse_args<I>(args: I) -> Result<Option<PilotConfig>, ConfigError>
where
    I: IntoIterator<Item = String>,
{
    let matches = options().parse(args)?;
    if matches.opt_present("h") {
        return Ok(None);
    }

    let latitude: f64 = required(&matches, "target-lat")?;
    check_range("target-lat", latitude, -90.0, 90.0, "within [-90, 90]")?;
    let longitude: f64 = required(&matches, "target-lon")?;
    check_range("target-lon", longitude, -180.0, 180.0, "within [-180, 180]")?;
    let radius: f64 = optional(&matches, "radius", DEFAULT_ARRIVAL_RADIUS_M)?;
    check_range("radius", radius, 0.0, f64::MAX, "non-negative")?;
    let threshold: f64 = optional(&matches, "turn-threshold", DEFAULT_TURN_THRESHOLD_D)?;
    check_range("turn-threshold", threshold, 0.0, 180.0, "within [0, 180]")?;
    let stale_s: f64 = optional(&matches, "stale-timeout", DEFAULT_STALE_TIMEOUT_S)?;
    if !(stale_s > 0.0 && stale_s < 86_400.0) {
        return Err(ConfigError::OutOfRange {
            option: "stale-timeout",
            value: stale_s,
            expected: "positive and under a day",
        });
    }

    let gps = LinkConfig {
        path: PathBuf::from(optional(&matches, "gps", DEFAULT_GPS_PATH.to_string())?),
        speed: speed(&matches, "gps-baud", DEFAULT_GPS_BAUD)?,
    };
    let actuator = LinkConfig {
        path: PathBuf::from(optional(&matches, "actuator", DEFAULT_ACTUATOR_PATH.to_string())?),
        speed: speed(&matches, "actuator-baud", DEFAULT_ACTUATOR_BAUD)?,
    };

    Ok(Some(PilotConfig {
        navigation: NavigationConfig {
            target: Target::new(latitude, longitude, radius),
            turn_threshold_d: threshold,
            stale_timeout: chrono::Duration::milliseconds((stale_s * 1000.0).round() as i64),
        },
        gps,
        actuator,
        read_timeout: Duration::from_millis(optional(
            &matches,
            "read-timeout-ms",
            DEFAULT_READ_TIMEOUT_MS,
        )?),
        settle: Duration::from_millis(optional(&matches, "settle-ms", DEFAULT_SETTLE_MS)?),
        navigate_on_gga: matches.opt_present("use-gga"),
        log_file: matches.opt_str("log-file").map(PathBuf::from),
        verbose: matches.opt_present("v"),
    }))
}


fn required<T: FromStr>(matches: &Matches, option: &'static str) -> Result<T, ConfigError> {
    match matches.opt_str(option) {
        Some(value) => parse_value(option, value),
        None => Err(ConfigError::Missing(option)),
    }
}


fn optional<T: FromStr>(
    matches: &Matches,
    option: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match matches.opt_str(option) {
        Some(value) => parse_value(option, value),
        None => Ok(default),
    }
}


fn parse_value<T: FromStr>(option: &'static str, value: String) -> Result<T, ConfigError> {
    match value.trim().parse() {
        Ok(parsed) => Ok(parsed),
        Err(_) => Err(ConfigError::Invalid { option, value }),
    }
}


fn check_range(
    option: &'static str,
    value: f64,
    low: f64,
    high: f64,
    expected: &'static str,
) -> Result<(), ConfigError> {
    // NaN fails both comparisons
    if value >= low && value <= high {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            option,
            value,
            expected,
        })
    }
}


fn speed(matches: &Matches, option: &'static str, default: u32) -> Result<Speed, ConfigError> {
    let baud: u32 = optional(matches, option, default)?;
    match Speed::from_baud(baud) {
        Some(speed) => Ok(speed),
        None => Err(ConfigError::Baud {
            option,
            value: baud,
        }),
    }
}


#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::{parse_args, ConfigError, PilotConfig};
    use crate::termios::Speed;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn parse(values: &[&str]) -> Result<Option<PilotConfig>, ConfigError> {
        parse_args(args(values))
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--target-lat", "32.0853", "--target-lon", "34.7818"])
            .unwrap()
            .unwrap();
        let target = config.navigation.target;
        assert!(target.latitude == 32.0853);
        assert!(target.longitude == 34.7818);
        assert!(target.arrival_radius_m == 5.0);
        assert!(config.navigation.turn_threshold_d == 20.0);
        assert!(config.navigation.stale_timeout == chrono::Duration::milliseconds(3000));
        assert!(config.gps.path == PathBuf::from("/dev/ttyACM1"));
        assert!(config.gps.speed == Speed::B9600);
        assert!(config.actuator.path == PathBuf::from("/dev/ttyACM0"));
        assert!(config.actuator.speed == Speed::B115200);
        assert!(config.read_timeout == Duration::from_millis(1000));
        assert!(config.settle == Duration::from_millis(2000));
        assert!(!config.navigate_on_gga);
        assert!(config.log_file.is_none());
        assert!(!config.verbose);
    }

    #[test]
    fn test_overrides() {
        let config = parse(&[
            "--target-lat=-33.85",
            "--target-lon=151.2",
            "--radius",
            "2.5",
            "--turn-threshold",
            "15",
            "--stale-timeout",
            "1.5",
            "--gps",
            "track.nmea",
            "--gps-baud",
            "4800",
            "--actuator",
            "/dev/null",
            "--settle-ms",
            "0",
            "--use-gga",
            "--log-file",
            "pilot.log",
            "-v",
        ])
        .unwrap()
        .unwrap();
        assert!(config.navigation.target.latitude == -33.85);
        assert!(config.navigation.target.arrival_radius_m == 2.5);
        assert!(config.navigation.turn_threshold_d == 15.0);
        assert!(config.navigation.stale_timeout == chrono::Duration::milliseconds(1500));
        assert!(config.gps.path == PathBuf::from("track.nmea"));
        assert!(config.gps.speed == Speed::B4800);
        assert!(config.settle == Duration::from_millis(0));
        assert!(config.navigate_on_gga);
        assert!(config.log_file == Some(PathBuf::from("pilot.log")));
        assert!(config.verbose);
    }

    #[test]
    fn test_help() {
        assert!(parse(&["-h"]).unwrap().is_none());
    }

    #[test]
    fn test_missing_target() {
        match parse(&["--target-lat", "32.0"]) {
            Err(ConfigError::Missing("target-lon")) => (),
            other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values() {
        match parse(&["--target-lat", "north", "--target-lon", "1"]) {
            Err(ConfigError::Invalid { option: "target-lat", .. }) => (),
            other => panic!("Unexpected {:?}", other),
        }
        match parse(&["--target-lat", "91", "--target-lon", "1"]) {
            Err(ConfigError::OutOfRange { option: "target-lat", .. }) => (),
            other => panic!("Unexpected {:?}", other),
        }
        match parse(&["--target-lat", "1", "--target-lon", "1", "--radius", "-1"]) {
            Err(ConfigError::OutOfRange { option: "radius", .. }) => (),
            other => panic!("Unexpected {:?}", other),
        }
        match parse(&["--target-lat", "1", "--target-lon", "1", "--stale-timeout", "0"]) {
            Err(ConfigError::OutOfRange { option: "stale-timeout", .. }) => (),
            other => panic!("Unexpected {:?}", other),
        }
        match parse(&["--target-lat", "1", "--target-lon", "1", "--gps-baud", "12345"]) {
            Err(ConfigError::Baud { value: 12345, .. }) => (),
            other => panic!("Unexpected {:?}", other),
        }
        match parse(&["--target-lat", "1", "--target-lon", "1", "--bogus"]) {
            Err(ConfigError::Options(_)) => (),
            other => panic!("Unexpected {:?}", other),
        }
    }
}
