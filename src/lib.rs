#[macro_use]
extern crate enum_primitive;
#[macro_use]
extern crate log;

pub mod command;
pub mod config;
pub mod control;
pub mod driver;
pub mod geodesy;
pub mod heading;
pub mod line_reader;
pub mod link;
pub mod nmea;
pub mod pilot;
pub mod termios;
pub mod watchdog;
