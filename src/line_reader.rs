/**
 * Splits the GPS byte stream into lines.
 */
use std::io::{self, BufRead, BufReader, ErrorKind, Read};

/// Longest run of bytes without a newline that we'll hold on to. NMEA sentences are at most 82
/// characters, so anything this long is line noise.
const MAX_LINE_LENGTH: usize = 1024;


#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Nothing complete arrived before the read timeout.
    Timeout,
    /// The source has ended for good.
    Closed,
}


pub struct LineReader<R: Read> {
    reader: BufReader<R>,
    partial: Vec<u8>,
    zero_read_is_timeout: bool,
}


impl<R: Read> LineReader<R> {
    /**
     * Reads from a source where running out of data means it's finished, like a recorded log.
     */
    pub fn new(reader: R) -> LineReader<R> {
        LineReader {
            reader: BufReader::new(reader),
            partial: Vec::new(),
            zero_read_is_timeout: false,
        }
    }

    /**
     * Reads from a serial port configured with a read timeout, where a read that returns nothing
     * just means the timer expired.
     */
    pub fn with_read_timeout(reader: R) -> LineReader<R> {
        LineReader {
            reader: BufReader::new(reader),
            partial: Vec::new(),
            zero_read_is_timeout: true,
        }
    }

    /**
     * Returns the next complete line. A partial line is kept across timeouts and finished on a
     * later call.
     */
    pub fn read_line(&mut self) -> io::Result<ReadOutcome> {
        let mut result = self.reader.read_until(b'\n', &mut self.partial);
        while self.partial.len() > MAX_LINE_LENGTH {
            warn!("Dropping {} bytes of line noise", self.partial.len());
            let complete = self.partial.ends_with(b"\n");
            self.partial.clear();
            if !complete {
                break;
            }
            result = self.reader.read_until(b'\n', &mut self.partial);
        }
        match result {
            Ok(_) if self.partial.ends_with(b"\n") => Ok(ReadOutcome::Line(self.take_line())),
            Ok(_) if self.zero_read_is_timeout => Ok(ReadOutcome::Timeout),
            // The last line of a file may not have a line ending
            Ok(_) if !self.partial.is_empty() => Ok(ReadOutcome::Line(self.take_line())),
            Ok(_) => Ok(ReadOutcome::Closed),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(ReadOutcome::Timeout)
            }
            Err(e) => Err(e),
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.partial).into_owned();
        self.partial.clear();
        line
    }
}


#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{self, Cursor, ErrorKind, Read};

    use super::{LineReader, ReadOutcome};

    /// Hands out one scripted result per read call.
    struct ScriptedReader {
        reads: VecDeque<io::Result<Vec<u8>>>,
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(bytes)) => {
                    buffer[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    fn line(text: &str) -> ReadOutcome {
        ReadOutcome::Line(text.to_string())
    }

    #[test]
    fn test_file_lines() {
        let data = "$GPRMC,1\r\n$GPGGA,2\r\nlast";
        let mut reader = LineReader::new(Cursor::new(data.as_bytes().to_vec()));
        assert!(reader.read_line().unwrap() == line("$GPRMC,1\r\n"));
        assert!(reader.read_line().unwrap() == line("$GPGGA,2\r\n"));
        assert!(reader.read_line().unwrap() == line("last"));
        assert!(reader.read_line().unwrap() == ReadOutcome::Closed);
        assert!(reader.read_line().unwrap() == ReadOutcome::Closed);
    }

    #[test]
    fn test_partial_line_survives_timeout() {
        let reads = vec![
            Ok(b"$GPRMC,12".to_vec()),
            Ok(Vec::new()),
            Ok(b"3519,A\r\n$GP".to_vec()),
            Err(io::Error::new(ErrorKind::TimedOut, "timed out")),
            Ok(b"GGA\n".to_vec()),
        ];
        let mut reader = LineReader::with_read_timeout(ScriptedReader {
            reads: reads.into_iter().collect(),
        });
        assert!(reader.read_line().unwrap() == ReadOutcome::Timeout);
        assert!(reader.read_line().unwrap() == line("$GPRMC,123519,A\r\n"));
        assert!(reader.read_line().unwrap() == ReadOutcome::Timeout);
        assert!(reader.read_line().unwrap() == line("$GPGGA\n"));
        assert!(reader.read_line().unwrap() == ReadOutcome::Timeout);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut reader = LineReader::new(Cursor::new(b"$GP\xffRMC\n".to_vec()));
        match reader.read_line().unwrap() {
            ReadOutcome::Line(text) => assert!(text == "$GP\u{fffd}RMC\n"),
            other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn test_runaway_line_dropped() {
        let mut data = vec![b'x'; 2000];
        data.extend_from_slice(b"\n$GPRMC\n");
        let mut reader = LineReader::new(Cursor::new(data));
        // The noise line is too long and gets dropped; the next one survives
        assert!(reader.read_line().unwrap() == line("$GPRMC\n"));
        assert!(reader.read_line().unwrap() == ReadOutcome::Closed);
    }

    #[test]
    fn test_other_errors_propagate() {
        let reads = vec![Err(io::Error::new(ErrorKind::Other, "unplugged"))];
        let mut reader = LineReader::with_read_timeout(ScriptedReader {
            reads: reads.into_iter().collect(),
        });
        assert!(reader.read_line().is_err());
    }
}
