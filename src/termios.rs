/**
 * Serial port configuration through termios. The GPS and the motor controller board both show up
 * as USB serial devices that need raw 8N1 mode at a fixed speed.
 */
use std::io;
use std::mem::MaybeUninit;
use std::os::unix::prelude::AsRawFd;
use std::time::Duration;

use enum_primitive::FromPrimitive;


pub trait Termio {
    fn set_speed(&self, speed: Speed) -> io::Result<()>;
    fn make_raw(&self) -> io::Result<()>;
    fn set_read_timeout(&self, timeout: Duration) -> io::Result<()>;
    fn drop_input_output(&self) -> io::Result<()>;
    fn is_tty(&self) -> bool;
}


impl<T> Termio for T
where
    T: AsRawFd,
{
    fn set_speed(&self, speed: Speed) -> io::Result<()> {
        let mut config = get_attributes(self.as_raw_fd())?;
        check(unsafe { libc::cfsetspeed(&mut config, speed.speed_t()) })?;
        set_attributes(self.as_raw_fd(), &config)
    }

    fn make_raw(&self) -> io::Result<()> {
        let mut config = get_attributes(self.as_raw_fd())?;
        unsafe { libc::cfmakeraw(&mut config) };
        // 8N1, ignore modem control lines, enable the receiver
        config.c_cflag &= !(libc::PARENB | libc::CSTOPB | libc::CSIZE);
        config.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;
        set_attributes(self.as_raw_fd(), &config)
    }

    fn set_read_timeout(&self, timeout: Duration) -> io::Result<()> {
        let mut config = get_attributes(self.as_raw_fd())?;
        // Return as soon as anything is available, or with nothing once the timer expires
        config.c_cc[libc::VMIN] = 0;
        config.c_cc[libc::VTIME] = timeout_deciseconds(timeout);
        set_attributes(self.as_raw_fd(), &config)
    }

    fn drop_input_output(&self) -> io::Result<()> {
        check(unsafe { libc::tcflush(self.as_raw_fd(), libc::TCIOFLUSH) })
    }

    fn is_tty(&self) -> bool {
        unsafe { libc::isatty(self.as_raw_fd()) == 1 }
    }
}


enum_from_primitive! {
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speed {
    B1200 = 1200,
    B2400 = 2400,
    B4800 = 4800,
    B9600 = 9600,
    B19200 = 19200,
    B38400 = 38400,
    B57600 = 57600,
    B115200 = 115200,
    B230400 = 230400,
}
}


impl Speed {
    pub fn from_baud(baud: u32) -> Option<Speed> {
        Speed::from_u32(baud)
    }

    pub fn baud(self) -> u32 {
        self as u32
    }

    fn speed_t(self) -> libc::speed_t {
        match self {
            Speed::B1200 => libc::B1200,
            Speed::B2400 => libc::B2400,
            Speed::B4800 => libc::B4800,
            Speed::B9600 => libc::B9600,
            Speed::B19200 => libc::B19200,
            Speed::B38400 => libc::B38400,
            Speed::B57600 => libc::B57600,
            Speed::B115200 => libc::B115200,
            Speed::B230400 => libc::B230400,
        }
    }
}


/// VTIME counts tenths of a second in a single byte. Zero would mean block forever.
fn timeout_deciseconds(timeout: Duration) -> libc::cc_t {
    let deciseconds = (timeout.as_millis() + 99) / 100;
    deciseconds.clamp(1, libc::cc_t::MAX as u128) as libc::cc_t
}


fn get_attributes(fd: i32) -> io::Result<libc::termios> {
    let mut config = MaybeUninit::<libc::termios>::uninit();
    check(unsafe { libc::tcgetattr(fd, config.as_mut_ptr()) })?;
    Ok(unsafe { config.assume_init() })
}


fn set_attributes(fd: i32, config: &libc::termios) -> io::Result<()> {
    check(unsafe { libc::tcsetattr(fd, libc::TCSANOW, config) })
}


fn check(result: i32) -> io::Result<()> {
    if result < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::path::Path;
    use std::time::Duration;

    use super::{timeout_deciseconds, Speed, Termio};

    #[test]
    fn test_speed_from_baud() {
        assert!(Speed::from_baud(9600) == Some(Speed::B9600));
        assert!(Speed::from_baud(115200) == Some(Speed::B115200));
        assert!(Speed::from_baud(115201).is_none());
        assert!(Speed::B4800.baud() == 4800);
    }

    #[test]
    fn test_timeout_deciseconds() {
        assert!(timeout_deciseconds(Duration::from_millis(0)) == 1);
        assert!(timeout_deciseconds(Duration::from_millis(50)) == 1);
        assert!(timeout_deciseconds(Duration::from_millis(1000)) == 10);
        assert!(timeout_deciseconds(Duration::from_millis(1050)) == 11);
        assert!(timeout_deciseconds(Duration::from_secs(60)) == 255);
    }

    #[test]
    fn test_regular_file_is_not_tty() {
        let file = match File::open(Path::new("Cargo.toml")) {
            Ok(f) => f,
            Err(e) => panic!("Unable to open Cargo.toml: {}", e),
        };
        assert!(!file.is_tty());
        assert!(file.set_speed(Speed::B9600).is_err());
    }

    #[test]
    fn test_tty() {
        // This will fail on everything without the GPS attached, so let's just ignore it if the
        // device isn't there.
        let path = Path::new("/dev/ttyACM1");
        if !path.exists() {
            return;
        }
        let tty = match File::open(path) {
            Ok(f) => f,
            Err(_) => return,
        };
        assert!(tty.is_tty());
        tty.make_raw().unwrap();
        tty.set_speed(Speed::B9600).unwrap();
        tty.set_read_timeout(Duration::from_millis(500)).unwrap();
    }
}
