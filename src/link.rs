/**
 * Opens the serial links to the GPS and to the motor controller board.
 */
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::config::LinkConfig;
use crate::termios::Termio;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    Positioning,
    Actuator,
}


impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LinkKind::Positioning => write!(f, "GPS"),
            LinkKind::Actuator => write!(f, "actuator"),
        }
    }
}


#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Unable to open {link} link {path}: {source}", path = .path.display())]
    Open {
        link: LinkKind,
        path: PathBuf,
        source: io::Error,
    },

    #[error("Unable to configure {link} link {path}: {source}", path = .path.display())]
    Configure {
        link: LinkKind,
        path: PathBuf,
        source: io::Error,
    },

    #[error("{link} link I/O failed: {source}")]
    Io { link: LinkKind, source: io::Error },
}


impl LinkError {
    pub fn link(&self) -> LinkKind {
        match self {
            LinkError::Open { link, .. } => *link,
            LinkError::Configure { link, .. } => *link,
            LinkError::Io { link, .. } => *link,
        }
    }
}


/**
 * Opens the GPS for reading. A tty gets raw mode, the configured speed and the read timeout; any
 * other file is treated as a recorded NMEA log and read as is.
 */
pub fn open_positioning(config: &LinkConfig, read_timeout: Duration) -> Result<File, LinkError> {
    let link = LinkKind::Positioning;
    let file = open(link, &config.path, OpenOptions::new().read(true))?;
    if !file.is_tty() {
        info!("{} is not a tty, replaying it as an NMEA log", config.path.display());
        return Ok(file);
    }

    let configured = file
        .make_raw()
        .and_then(|_| file.set_speed(config.speed))
        .and_then(|_| file.set_read_timeout(read_timeout))
        // Throw away whatever queued up before we were listening
        .and_then(|_| file.drop_input_output());
    match configured {
        Ok(_) => Ok(file),
        Err(source) => Err(configure_error(link, &config.path, source)),
    }
}


/**
 * Opens the motor controller board for writing.
 */
pub fn open_actuator(config: &LinkConfig) -> Result<File, LinkError> {
    let link = LinkKind::Actuator;
    let file = open(link, &config.path, OpenOptions::new().write(true))?;
    if !file.is_tty() {
        info!("{} is not a tty, writing commands to it as is", config.path.display());
        return Ok(file);
    }

    match file.make_raw().and_then(|_| file.set_speed(config.speed)) {
        Ok(_) => Ok(file),
        Err(source) => Err(configure_error(link, &config.path, source)),
    }
}


fn open(link: LinkKind, path: &Path, options: &mut OpenOptions) -> Result<File, LinkError> {
    // Don't let a serial port become our controlling terminal
    match options.custom_flags(libc::O_NOCTTY).open(path) {
        Ok(file) => {
            debug!("Opened {} link {}", link, path.display());
            Ok(file)
        }
        Err(source) => Err(LinkError::Open {
            link,
            path: path.to_path_buf(),
            source,
        }),
    }
}


fn configure_error(link: LinkKind, path: &Path, source: io::Error) -> LinkError {
    LinkError::Configure {
        link,
        path: path.to_path_buf(),
        source,
    }
}


#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::path::PathBuf;
    use std::time::Duration;

    use super::{open_actuator, open_positioning, LinkError, LinkKind};
    use crate::config::LinkConfig;
    use crate::termios::Speed;

    #[test]
    fn test_missing_device() {
        let config = LinkConfig {
            path: PathBuf::from("/dev/this-gps-does-not-exist"),
            speed: Speed::B9600,
        };
        match open_positioning(&config, Duration::from_millis(100)) {
            Err(error) => {
                assert!(error.link() == LinkKind::Positioning);
                let message = format!("{}", error);
                assert!(message.contains("GPS"), "{}", message);
                assert!(message.contains("/dev/this-gps-does-not-exist"), "{}", message);
                match error {
                    LinkError::Open { .. } => (),
                    other => panic!("Unexpected {:?}", other),
                }
            }
            Ok(_) => panic!("Opened a device that doesn't exist"),
        }

        match open_actuator(&config) {
            Err(error) => assert!(error.link() == LinkKind::Actuator),
            Ok(_) => panic!("Opened a device that doesn't exist"),
        }
    }

    #[test]
    fn test_regular_file_replays() {
        let config = LinkConfig {
            path: PathBuf::from("Cargo.toml"),
            speed: Speed::B9600,
        };
        let mut file = open_positioning(&config, Duration::from_millis(100)).unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        assert!(contents.contains("[package]"));
    }
}
