#[macro_use]
extern crate log;

use std::fs::OpenOptions;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

use boat_pilot::config::{self, PilotConfig};
use boat_pilot::driver::SerialDriver;
use boat_pilot::line_reader::LineReader;
use boat_pilot::link::{open_actuator, open_positioning, LinkError};
use boat_pilot::pilot::{Pilot, RunOutcome};
use boat_pilot::termios::Termio;

static QUIT: AtomicBool = AtomicBool::new(false);


fn main() {
    let config = match handle_opts() {
        Some(config) => config,
        None => return,
    };
    info!("Starting up");
    install_signal_handlers();

    let status = match run(&config) {
        Ok(RunOutcome::Arrived) => {
            info!("Mission complete");
            0
        }
        Ok(outcome) => {
            info!("Stopped before reaching the target ({:?})", outcome);
            0
        }
        Err(e) => {
            error!("{}", e);
            1
        }
    };
    info!("Main thread shutting down");
    process::exit(status);
}


fn run(config: &PilotConfig) -> Result<RunOutcome, LinkError> {
    let navigation = &config.navigation;
    info!(
        "Target {:.6}, {:.6}, arrival radius {:.1} m, turn threshold {:.0} degrees",
        navigation.target.latitude,
        navigation.target.longitude,
        navigation.target.arrival_radius_m,
        navigation.turn_threshold_d
    );

    let gps = open_positioning(&config.gps, config.read_timeout)?;
    let actuator = open_actuator(&config.actuator)?;
    info!("Links open, waiting {} ms for the board to settle", config.settle.as_millis());
    thread::sleep(config.settle);

    let reader = if gps.is_tty() {
        LineReader::with_read_timeout(gps)
    } else {
        LineReader::new(gps)
    };
    let mut pilot = Pilot::new(
        reader,
        SerialDriver::new(actuator),
        navigation,
        config.navigate_on_gga,
    );
    Ok(pilot.run(&QUIT))
}


/// Ctrl + C and SIGTERM ask the pilot to stop; it sends a final stop on its way out.
fn install_signal_handlers() {
    if let Err(e) = ctrlc::set_handler(|| QUIT.store(true, Ordering::SeqCst)) {
        warn!("Unable to install quit handler: {}", e);
    }
}


fn handle_opts() -> Option<PilotConfig> {
    let mut args = std::env::args();
    args.next(); // Skip the program name
    let config = match config::parse_args(args) {
        Ok(Some(config)) => config,
        Ok(None) => {
            print!("{}", config::usage(&config::options()));
            return None;
        }
        Err(e) => {
            eprintln!("{}", e);
            eprint!("{}", config::usage(&config::options()));
            process::exit(2);
        }
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("{}", e);
        process::exit(2);
    }
    Some(config)
}


fn init_logging(config: &PilotConfig) -> Result<(), String> {
    let level = if config.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let log_config = ConfigBuilder::new()
        .set_location_level(LevelFilter::Debug)
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        level,
        log_config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));
    if let Some(path) = &config.log_file {
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => file,
            Err(e) => return Err(format!("Unable to open log file {}: {}", path.display(), e)),
        };
        loggers.push(WriteLogger::new(level, log_config, file));
    }

    match CombinedLogger::init(loggers) {
        Ok(_) => Ok(()),
        Err(e) => Err(format!("Unable to initialize logger: {}", e)),
    }
}
