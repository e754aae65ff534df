use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::{ExtractError, SpectrumSource};
use crate::spectrum::{Peak, SpectrumRecord};

/// Reader for a single spectrum stored as two delimited columns:
///
/// ```text
/// mz,intensity
/// 138.0662,100
/// 195.0877,45.2
/// ```
///
/// The whole input is one record without id or metadata. Rows with fewer than
/// two fields, or whose first two fields are not numbers (headers, comments,
/// invalid UTF-8), are skipped.
pub struct PairsReader<R: Read> {
    reader: Option<csv::Reader<R>>,
    skipped: usize,
}

impl PairsReader<BufReader<File>> {
    /// Open a two-column file
    pub fn open<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self, ExtractError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), delimiter))
    }
}

impl<R: Read> PairsReader<R> {
    /// Wrap any reader
    pub fn new(reader: R, delimiter: u8) -> Self {
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        Self {
            reader: Some(reader),
            skipped: 0,
        }
    }

    /// Read every row into a peak list.
    pub fn read_peaks(mut self) -> Result<Vec<Peak>, ExtractError> {
        Ok(self.next_record()?.map(|r| r.peaks).unwrap_or_default())
    }
}

fn parse_pair(record: &csv::ByteRecord) -> Option<Peak> {
    if record.len() < 2 {
        return None;
    }
    let field = |i: usize| std::str::from_utf8(record.get(i)?).ok()?.trim().parse::<f64>().ok();
    Some(Peak::new(field(0)?, field(1)?))
}

impl<R: Read> SpectrumSource for PairsReader<R> {
    fn next_record(&mut self) -> Result<Option<SpectrumRecord>, ExtractError> {
        let mut reader = match self.reader.take() {
            Some(reader) => reader,
            None => return Ok(None),
        };

        let mut peaks = Vec::new();
        for record in reader.byte_records() {
            match parse_pair(&record?) {
                Some(peak) => peaks.push(peak),
                None => self.skipped += 1,
            }
        }

        Ok(Some(SpectrumRecord::from_peaks(peaks)))
    }

    fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_pairs_and_skips_junk() {
        let data = "mz,intensity\n100.5, 20\n\n101.5,abc\n102.5\n 103.5 , 7.5 ,extra\n";
        let mut reader = PairsReader::new(Cursor::new(data), b',');

        let record = reader.next_record().unwrap().unwrap();
        assert!(record.id.is_none());
        assert!(record.metadata.is_empty());
        assert_eq!(record.peaks, vec![Peak::new(100.5, 20.0), Peak::new(103.5, 7.5)]);
        assert_eq!(reader.skipped(), 3);

        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_invalid_utf8_row_skipped() {
        let data: &[u8] = b"100,1\n\xff\xfe,2\n200,3\n";
        let mut reader = PairsReader::new(Cursor::new(data), b',');

        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.peaks, vec![Peak::new(100.0, 1.0), Peak::new(200.0, 3.0)]);
        assert_eq!(reader.skipped(), 1);
    }

    #[test]
    fn test_tab_delimited() {
        let data = "50\t1\n60\t2\n";
        let peaks = PairsReader::new(Cursor::new(data), b'\t').read_peaks().unwrap();
        assert_eq!(peaks, vec![Peak::new(50.0, 1.0), Peak::new(60.0, 2.0)]);
    }

    #[test]
    fn test_empty_input_is_one_empty_record() {
        let mut reader = PairsReader::new(Cursor::new(""), b',');
        let record = reader.next_record().unwrap().unwrap();
        assert!(record.peaks.is_empty());
    }
}
