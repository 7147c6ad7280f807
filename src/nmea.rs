/**
 * Decodes NMEA sentences from the GPS into position fixes.
 */
use chrono::{DateTime, NaiveTime, Utc};
use thiserror::Error;

use crate::geodesy::{wrap_degrees, Coordinate, Degrees};

pub type Knots = f64;


/**
 * One position sample reported by the GPS. Fixes are never modified after they are decoded; each
 * new sentence produces a new fix.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct GpsFix {
    pub latitude: Degrees,
    pub longitude: Degrees,
    /// Only present when the sentence type reports it and the receiver filled it in. 0.0 is a
    /// real course (north), so absence is None.
    pub course_over_ground: Option<Degrees>,
    pub speed_over_ground: Option<Knots>,
    pub utc_time: Option<NaiveTime>,
    pub valid: bool,
    pub received_at: DateTime<Utc>,
}


impl GpsFix {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}


/**
 * GGA: Global positioning system fix data.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct GgaMessage {
    pub fix: GpsFix,
    pub satellites_used: Option<u8>,
    pub horizontal_dilution_of_precision: Option<f32>,
}


#[derive(Clone, Debug, PartialEq)]
pub enum Sentence {
    /// RMC: Recommended minimum specific GNSS data.
    Rmc(GpsFix),
    Gga(GgaMessage),
    /// Any other sentence type, or a line that isn't a sentence at all.
    NotRelevant,
}


impl Sentence {
    pub fn fix(&self) -> Option<&GpsFix> {
        match self {
            Sentence::Rmc(fix) => Some(fix),
            Sentence::Gga(gga) => Some(&gga.fix),
            Sentence::NotRelevant => None,
        }
    }
}


#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("{sentence} has {found} fields, expected at least {expected}")]
    FieldCount {
        sentence: &'static str,
        found: usize,
        expected: usize,
    },

    #[error("Missing {0}")]
    MissingField(&'static str),

    #[error("Invalid {field}: '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("Invalid hemisphere indicator: '{0}'")]
    Hemisphere(String),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}


#[derive(Clone, Copy)]
enum Axis {
    Latitude,
    Longitude,
}


impl Axis {
    fn name(self) -> &'static str {
        match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
        }
    }

    fn limit(self) -> Degrees {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }

    fn max_degree_digits(self) -> usize {
        match self {
            Axis::Latitude => 2,
            Axis::Longitude => 3,
        }
    }

    fn sign(self, indicator: &str) -> Result<f64, ParseError> {
        match (self, indicator) {
            (Axis::Latitude, "N") | (Axis::Longitude, "E") => Ok(1.0),
            (Axis::Latitude, "S") | (Axis::Longitude, "W") => Ok(-1.0),
            _ => Err(ParseError::Hemisphere(indicator.to_string())),
        }
    }
}


const RMC_FIELD_COUNT: usize = 10;
const GGA_FIELD_COUNT: usize = 9;


/**
 * Parses one line from the GPS. Lines that aren't RMC or GGA sentences, from any talker, are
 * NotRelevant. The checksum is stripped but not verified.
 */
pub fn parse(line: &str, received_at: DateTime<Utc>) -> Result<Sentence, ParseError> {
    let line = line.trim();
    let body = match line.split('*').next() {
        Some(body) => body,
        None => return Ok(Sentence::NotRelevant),
    };
    let fields: Vec<&str> = body.split(',').collect();

    // $ttsss, where tt is the talker and sss the sentence type. Proprietary sentences start with
    // $P and use their own layouts.
    let id = fields[0];
    if !id.starts_with('$') || id.len() != 6 || !id.is_ascii() {
        return Ok(Sentence::NotRelevant);
    }
    let talker = &id[1..3];
    if talker.starts_with('P') || !talker.bytes().all(|byte| byte.is_ascii_uppercase()) {
        return Ok(Sentence::NotRelevant);
    }
    match &id[3..] {
        "RMC" => parse_rmc(&fields, received_at).map(Sentence::Rmc),
        "GGA" => parse_gga(&fields, received_at).map(Sentence::Gga),
        _ => Ok(Sentence::NotRelevant),
    }
}


fn parse_rmc(fields: &[&str], received_at: DateTime<Utc>) -> Result<GpsFix, ParseError> {
    // $GPRMC,hhmmss.sss,A,ddmm.mmmm,N,dddmm.mmmm,E,x.x,x.x,ddmmyy,x.x,a,a*hh
    check_field_count("RMC", fields, RMC_FIELD_COUNT)?;

    let valid = match fields[2] {
        "A" => true,
        "V" => false,
        other => {
            return Err(ParseError::InvalidField {
                field: "status",
                value: other.to_string(),
            })
        }
    };
    let (latitude, longitude) = parse_position(&fields[3..7], valid)?;

    Ok(GpsFix {
        latitude,
        longitude,
        course_over_ground: parse_course(fields[8])?,
        speed_over_ground: parse_optional("speed", fields[7])?,
        utc_time: parse_time(fields[1])?,
        valid,
        received_at,
    })
}


fn parse_gga(fields: &[&str], received_at: DateTime<Utc>) -> Result<GgaMessage, ParseError> {
    // $GPGGA,hhmmss.sss,ddmm.mmmm,a,dddmm.mmmm,a,x,xx,x.x,x.x,M,,,,xxxx*hh
    check_field_count("GGA", fields, GGA_FIELD_COUNT)?;

    let quality: u8 = match parse_optional("fix quality", fields[6])? {
        Some(quality) => quality,
        None => return Err(ParseError::MissingField("fix quality")),
    };
    // Quality 0 means no fix; anything else (GPS, DGPS, RTK...) is usable
    let valid = quality != 0;
    let (latitude, longitude) = parse_position(&fields[2..6], valid)?;

    Ok(GgaMessage {
        fix: GpsFix {
            latitude,
            longitude,
            course_over_ground: None,
            speed_over_ground: None,
            utc_time: parse_time(fields[1])?,
            valid,
            received_at,
        },
        satellites_used: parse_optional("satellites used", fields[7])?,
        horizontal_dilution_of_precision: parse_optional("HDOP", fields[8])?,
    })
}


fn check_field_count(
    sentence: &'static str,
    fields: &[&str],
    expected: usize,
) -> Result<(), ParseError> {
    if fields.len() < expected {
        return Err(ParseError::FieldCount {
            sentence,
            found: fields.len(),
            expected,
        });
    }
    Ok(())
}


/**
 * Parses latitude, N/S, longitude, E/W. Receivers without a fix usually leave these empty; that's
 * fine for an invalid fix, which nobody navigates with.
 */
fn parse_position(fields: &[&str], valid: bool) -> Result<(Degrees, Degrees), ParseError> {
    if !valid && fields.iter().all(|field| field.is_empty()) {
        return Ok((0.0, 0.0));
    }
    let latitude = parse_degrees_minutes(fields[0], fields[1], Axis::Latitude)?;
    let longitude = parse_degrees_minutes(fields[2], fields[3], Axis::Longitude)?;
    Ok((latitude, longitude))
}


/**
 * Converts ddmm.mmmm (or dddmm.mmmm) plus a hemisphere indicator into signed decimal degrees.
 */
fn parse_degrees_minutes(value: &str, indicator: &str, axis: Axis) -> Result<Degrees, ParseError> {
    if value.is_empty() {
        return Err(ParseError::MissingField(axis.name()));
    }
    let invalid = || ParseError::InvalidField {
        field: axis.name(),
        value: value.to_string(),
    };
    if !value.is_ascii() {
        return Err(invalid());
    }

    // The last two digits before the decimal point are whole minutes
    let integer_length = value.find('.').unwrap_or(value.len());
    if integer_length < 3 || integer_length - 2 > axis.max_degree_digits() {
        return Err(invalid());
    }
    let degree_length = integer_length - 2;
    // u32 and f64 parsing would both let a sign through
    if !value[..integer_length].bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }
    let degrees: u32 = value[..degree_length].parse().map_err(|_| invalid())?;
    let minutes: f64 = value[degree_length..].parse().map_err(|_| invalid())?;
    if !(0.0..60.0).contains(&minutes) {
        return Err(ParseError::OutOfRange {
            field: "minutes",
            value: minutes,
        });
    }

    let sign = axis.sign(indicator)?;
    let decimal = degrees as f64 + minutes / 60.0;
    if decimal > axis.limit() {
        return Err(ParseError::OutOfRange {
            field: axis.name(),
            value: decimal,
        });
    }
    Ok(sign * decimal)
}


fn parse_course(value: &str) -> Result<Option<Degrees>, ParseError> {
    match parse_optional::<Degrees>("course", value)? {
        Some(course) if (0.0..=360.0).contains(&course) => Ok(Some(wrap_degrees(course))),
        Some(course) => Err(ParseError::OutOfRange {
            field: "course",
            value: course,
        }),
        None => Ok(None),
    }
}


fn parse_time(value: &str) -> Result<Option<NaiveTime>, ParseError> {
    if value.is_empty() {
        return Ok(None);
    }
    match NaiveTime::parse_from_str(value, "%H%M%S%.f") {
        Ok(time) => Ok(Some(time)),
        Err(_) => Err(ParseError::InvalidField {
            field: "time",
            value: value.to_string(),
        }),
    }
}


fn parse_optional<T: std::str::FromStr>(
    field: &'static str,
    value: &str,
) -> Result<Option<T>, ParseError> {
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ParseError::InvalidField {
            field,
            value: value.to_string(),
        }),
    }
}
