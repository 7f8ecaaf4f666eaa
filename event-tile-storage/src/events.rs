/// Text event stream reader: `timestamp x y polarity` records after a fixed header.
use crate::error::{Result, StorageError};
use constants::events::{EVENT_HEADER_LINES, ON_POLARITY, TIMESTAMP_SCALE};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// One polarity event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// Seconds since the start of the recording.
    pub timestamp: f64,
    pub x: i64,
    pub y: i64,
    /// +1 for ON, -1 for OFF.
    pub polarity: i8,
}

impl Event {
    /// Time-axis index, the timestamp in whole milliseconds (truncated).
    pub fn time_index(&self) -> i64 {
        (self.timestamp * TIMESTAMP_SCALE) as i64
    }
}

/// Parse one record; `line` is the 1-based line number used in errors.
pub fn parse_event(line: usize, text: &str) -> Result<Event> {
    let malformed = |reason: String| StorageError::MalformedEvent { line, reason };

    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(malformed(format!("expected 4 fields, found {}", fields.len())));
    }

    let timestamp: f64 = fields[0]
        .parse()
        .map_err(|_| malformed(format!("bad timestamp '{}'", fields[0])))?;
    let x: i64 = fields[1]
        .parse()
        .map_err(|_| malformed(format!("bad x '{}'", fields[1])))?;
    let y: i64 = fields[2]
        .parse()
        .map_err(|_| malformed(format!("bad y '{}'", fields[2])))?;
    let polarity: i32 = fields[3]
        .parse()
        .map_err(|_| malformed(format!("bad polarity '{}'", fields[3])))?;

    Ok(Event {
        timestamp,
        x,
        y,
        polarity: if polarity == ON_POLARITY { 1 } else { -1 },
    })
}

/// Iterator over the events of a text stream, skipping the header and blank lines.
pub struct EventReader<R> {
    lines: Lines<R>,
    line: usize,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl EventReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| StorageError::io(path, err))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(err) => {
                    return Some(Err(StorageError::io("<event stream>", err)));
                }
            };
            self.line += 1;

            if self.line <= EVENT_HEADER_LINES || text.trim().is_empty() {
                continue;
            }
            return Some(parse_event(self.line, &text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "# events\n# width 1280\n# height 720\n# t x y p\n#\n#\n";

    #[test]
    fn parses_records_after_header() {
        let text = format!("{}0.0015 10 20 1\n0.0025 11 21 0\n\n", HEADER);
        let events: Vec<Event> = EventReader::new(Cursor::new(text))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].time_index(), 1);
        assert_eq!((events[0].x, events[0].y, events[0].polarity), (10, 20, 1));
        assert_eq!(events[1].time_index(), 2);
        assert_eq!(events[1].polarity, -1);
    }

    #[test]
    fn reports_line_of_malformed_record() {
        let text = format!("{}0.001 1 2 1\n0.002 x 2 1\n", HEADER);
        let result: Result<Vec<Event>> = EventReader::new(Cursor::new(text)).collect();

        match result {
            Err(StorageError::MalformedEvent { line, .. }) => assert_eq!(line, 8),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn short_record_is_malformed() {
        assert!(matches!(
            parse_event(9, "0.1 2 3"),
            Err(StorageError::MalformedEvent { line: 9, .. })
        ));
    }
}
