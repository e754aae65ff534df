use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;

use super::{ExtractError, SpectrumSource};
use crate::spectrum::{Metadata, Peak, SpectrumRecord};

/// Header key (case-insensitive) that switches the parser into peak mode
const NUM_PEAKS_KEY: &str = "num peaks";

/// Parser state within one library entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseState {
    /// Reading `Key: value` header lines
    #[default]
    ReadingMetadata,
    /// Reading whitespace-separated `mz intensity` lines
    ReadingPeaks,
}

/// Accumulator for the entry currently being parsed
#[derive(Debug, Default)]
struct RecordBuffer {
    metadata: Metadata,
    peaks: Vec<Peak>,
}

impl RecordBuffer {
    fn is_empty(&self) -> bool {
        self.metadata.is_empty() && self.peaks.is_empty()
    }

    fn take(&mut self) -> SpectrumRecord {
        let buffer = std::mem::take(self);
        SpectrumRecord {
            id: None,
            peaks: buffer.peaks,
            metadata: buffer.metadata,
        }
    }
}

/// Streaming reader for text spectral libraries (NIST MSP style).
///
/// ```text
/// NAME: Caffeine
/// PRECURSORMZ: 195.0877
/// Num Peaks: 2
/// 138.0662 100
/// 195.0877 45.2
///
/// NAME: ...
/// ```
///
/// Entries are separated by blank lines; a final entry without a trailing
/// blank line is still emitted. Lines that fit neither state are ignored.
pub struct MspReader<R: BufRead> {
    reader: R,
    state: ParseState,
    buffer: RecordBuffer,
    line: Vec<u8>,
    line_number: usize,
    exhausted: bool,
}

impl MspReader<BufReader<File>> {
    /// Open an MSP file for streaming
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ExtractError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> MspReader<R> {
    /// Create a reader over any buffered source
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            state: ParseState::ReadingMetadata,
            buffer: RecordBuffer::default(),
            line: Vec::with_capacity(256),
            line_number: 0,
            exhausted: false,
        }
    }

    /// Current parser state
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Number of lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Feed one line into the state machine, returning a record when the line
    /// completes one.
    pub fn feed_line(&mut self, raw: &str) -> Option<SpectrumRecord> {
        let line = raw.trim();

        if line.is_empty() {
            if self.buffer.is_empty() {
                return None;
            }
            self.state = ParseState::ReadingMetadata;
            return Some(self.buffer.take());
        }

        match self.state {
            ParseState::ReadingMetadata => {
                if let Some((key, value)) = line.split_once(':') {
                    let key = key.trim();
                    if key.eq_ignore_ascii_case(NUM_PEAKS_KEY) {
                        self.state = ParseState::ReadingPeaks;
                    } else {
                        self.buffer
                            .metadata
                            .insert(key.to_string(), value.trim().to_string());
                    }
                }
            }
            ParseState::ReadingPeaks => match parse_peak_line(line) {
                Some(peak) => self.buffer.peaks.push(peak),
                None => debug!("Skipping non-peak line {}: {:?}", self.line_number, line),
            },
        }

        None
    }

    /// Flush whatever is buffered at end of input.
    pub fn finish(&mut self) -> Option<SpectrumRecord> {
        self.state = ParseState::ReadingMetadata;
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.take())
        }
    }
}

/// Parse `mz intensity [annotation...]`; `None` unless the first two tokens
/// are both numbers.
fn parse_peak_line(line: &str) -> Option<Peak> {
    let mut tokens = line.split_whitespace();
    let mz = tokens.next()?.parse::<f64>().ok()?;
    let intensity = tokens.next()?.parse::<f64>().ok()?;
    Some(Peak::new(mz, intensity))
}

impl<R: BufRead> SpectrumSource for MspReader<R> {
    fn next_record(&mut self) -> Result<Option<SpectrumRecord>, ExtractError> {
        if self.exhausted {
            return Ok(None);
        }

        loop {
            self.line.clear();
            let read = self.reader.read_until(b'\n', &mut self.line)?;
            if read == 0 {
                self.exhausted = true;
                return Ok(self.finish());
            }
            self.line_number += 1;

            // Library files in the wild are not always valid UTF-8.
            let text = String::from_utf8_lossy(&self.line).into_owned();
            if let Some(record) = self.feed_line(&text) {
                return Ok(Some(record));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(text: &str) -> Vec<SpectrumRecord> {
        MspReader::new(Cursor::new(text.as_bytes().to_vec()))
            .records()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_two_records() {
        let text = "NAME: foo\nNum Peaks: 2\n1.0 5.0\n2.0 10.0\n\nNAME: bar\nNum Peaks: 1\n3.0 1.0\n";
        let records = read_all(text);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].metadata.len(), 1);
        assert_eq!(records[0].metadata["NAME"], "foo");
        assert_eq!(records[0].peaks, vec![Peak::new(1.0, 5.0), Peak::new(2.0, 10.0)]);
        assert_eq!(records[1].metadata["NAME"], "bar");
        assert_eq!(records[1].peaks, vec![Peak::new(3.0, 1.0)]);
        assert!(records.iter().all(|r| r.id.is_none()));
    }

    #[test]
    fn test_blank_line_resets_state() {
        let mut reader = MspReader::new(Cursor::new(Vec::new()));
        assert_eq!(reader.state(), ParseState::ReadingMetadata);

        assert!(reader.feed_line("Name: x").is_none());
        assert!(reader.feed_line("Num Peaks: 1").is_none());
        assert_eq!(reader.state(), ParseState::ReadingPeaks);
        assert!(reader.feed_line("10 20").is_none());

        let record = reader.feed_line("   ").unwrap();
        assert_eq!(record.peaks, vec![Peak::new(10.0, 20.0)]);
        assert_eq!(reader.state(), ParseState::ReadingMetadata);
        assert!(reader.finish().is_none());
    }

    #[test]
    fn test_repeated_blank_lines_are_noops() {
        let records = read_all("\n\n\nNAME: a\nNum Peaks: 1\n1 1\n\n\n\n");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_peak_state_never_regresses() {
        // A colon line inside the peak block is not metadata.
        let records = read_all("NAME: a\nNum Peaks: 2\n1 1\nComment: late\n2 2\n");
        assert_eq!(records.len(), 1);
        assert!(!records[0].metadata.contains_key("Comment"));
        assert_eq!(records[0].peaks.len(), 2);
    }

    #[test]
    fn test_metadata_rules() {
        let text = "Name: first\nNAME: x:y:z\nno colon here\nName: second\nnum PEAKS: 0\n";
        let records = read_all(text);
        assert_eq!(records.len(), 1);
        let meta = &records[0].metadata;
        assert_eq!(meta["Name"], "second");
        assert_eq!(meta["NAME"], "x:y:z");
        assert_eq!(meta.len(), 2);
        assert!(records[0].peaks.is_empty());
    }

    #[test]
    fn test_malformed_peak_lines_skipped() {
        let text = "Num Peaks: 4\n100.5\tabc\n101.5 12 \"y1+\"\njunk\n102.5 3e2\n";
        let records = read_all(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].peaks, vec![Peak::new(101.5, 12.0), Peak::new(102.5, 300.0)]);
    }

    #[test]
    fn test_crlf_and_invalid_utf8() {
        let mut bytes = b"NAME: caf".to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(b"\r\nNum Peaks: 1\r\n5 5\r\n\r\n");
        let records = MspReader::new(Cursor::new(bytes))
            .records()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].metadata["NAME"].starts_with("caf"));
        assert_eq!(records[0].peaks, vec![Peak::new(5.0, 5.0)]);
    }

    #[test]
    fn test_exhausted_reader_stays_empty() {
        let mut reader = MspReader::new(Cursor::new(b"NAME: a\n".to_vec()));
        assert!(reader.next_record().unwrap().is_some());
        assert!(reader.next_record().unwrap().is_none());
        assert!(reader.next_record().unwrap().is_none());
        assert_eq!(reader.line_number(), 1);
    }
}
