use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use log::warn;
use serde_json::Value;

use super::{preview, ExtractError, SpectrumSource};
use crate::spectrum::{Peak, PointId, SpectrumRecord};

/// Column names of the id, m/z array and intensity array fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularColumns {
    /// Identifier column
    pub id: String,
    /// Column holding a JSON array of m/z values
    pub mz: String,
    /// Column holding a JSON array of intensities
    pub intensity: String,
}

impl TabularColumns {
    /// Create a column mapping
    pub fn new(id: impl Into<String>, mz: impl Into<String>, intensity: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mz: mz.into(),
            intensity: intensity.into(),
        }
    }
}

impl Default for TabularColumns {
    fn default() -> Self {
        Self::new("id", "mz", "intensity")
    }
}

/// One raw row: the three selected cells, still undecoded.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularRow {
    /// Identifier cell
    pub id: Value,
    /// m/z array cell (array or JSON text)
    pub mz: Value,
    /// Intensity array cell (array or JSON text)
    pub intensity: Value,
}

/// Decode a cell into a list of numbers.
///
/// Arrays pass through, strings are parsed as JSON, null is the empty list.
/// Anything else is a [`ExtractError::Decode`] carrying a preview of the value.
pub fn decode_array(value: &Value) -> Result<Vec<f64>, ExtractError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => numbers(items).map_err(|reason| ExtractError::Decode {
            reason,
            preview: preview(&value.to_string()),
        }),
        Value::String(text) => {
            let parsed: Value = serde_json::from_str(text).map_err(|e| ExtractError::Decode {
                reason: e.to_string(),
                preview: preview(text),
            })?;
            match parsed {
                Value::Array(items) => numbers(&items).map_err(|reason| ExtractError::Decode {
                    reason,
                    preview: preview(text),
                }),
                _ => Err(ExtractError::Decode {
                    reason: "expected a JSON array".to_string(),
                    preview: preview(text),
                }),
            }
        }
        other => Err(ExtractError::Decode {
            reason: "expected an array or JSON text".to_string(),
            preview: preview(&other.to_string()),
        }),
    }
}

fn numbers(items: &[Value]) -> Result<Vec<f64>, String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Number(n) => n.as_f64().ok_or_else(|| format!("element {i} is not a float")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("element {i} is not a number: {s:?}")),
            other => Err(format!("element {i} is not a number: {other}")),
        })
        .collect()
}

impl ExtractError {
    /// Whether extraction can continue with the next row after this error.
    pub fn is_row_local(&self) -> bool {
        matches!(
            self,
            ExtractError::Decode { .. } | ExtractError::MalformedRow(_) | ExtractError::JsonError(_)
        )
    }
}

/// Rows of a delimited table with a header line.
///
/// Cells are decoded as UTF-8 lossily, so a stray invalid byte damages one
/// value instead of ending the stream.
pub struct TableRows<R: Read> {
    records: csv::ByteRecordsIntoIter<R>,
    id_idx: usize,
    mz_idx: usize,
    intensity_idx: usize,
}

impl TableRows<BufReader<File>> {
    /// Open a delimited table file
    pub fn open<P: AsRef<Path>>(
        path: P,
        delimiter: u8,
        columns: &TabularColumns,
    ) -> Result<Self, ExtractError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file), delimiter, columns)
    }
}

impl<R: Read> TableRows<R> {
    /// Read the header and locate the selected columns.
    pub fn new(reader: R, delimiter: u8, columns: &TabularColumns) -> Result<Self, ExtractError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().to_string())
            .collect();

        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ExtractError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            id_idx: find(&columns.id)?,
            mz_idx: find(&columns.mz)?,
            intensity_idx: find(&columns.intensity)?,
            records: csv_reader.into_byte_records(),
        })
    }
}

fn cell_text(cell: Option<&[u8]>) -> Option<String> {
    let text = String::from_utf8_lossy(cell?);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Id cells in canonical unsigned form (`7`, not `007` or `+7`) become
/// numbers; everything else stays text so distinct ids never merge.
fn id_cell(cell: Option<&[u8]>) -> Value {
    match cell_text(cell) {
        None => Value::Null,
        Some(text) => match text.parse::<u64>() {
            Ok(n) if n.to_string() == text => Value::from(n),
            _ => Value::String(text),
        },
    }
}

fn array_cell(cell: Option<&[u8]>) -> Value {
    cell_text(cell).map_or(Value::Null, Value::String)
}

impl<R: Read> Iterator for TableRows<R> {
    type Item = Result<TabularRow, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };

        Some(Ok(TabularRow {
            id: id_cell(record.get(self.id_idx)),
            mz: array_cell(record.get(self.mz_idx)),
            intensity: array_cell(record.get(self.intensity_idx)),
        }))
    }
}

/// Rows of a JSON Lines file, one object per line.
///
/// Lines are read as raw bytes and decoded lossily, like MSP libraries.
pub struct JsonLinesRows<R: BufRead> {
    reader: R,
    line: Vec<u8>,
    columns: TabularColumns,
}

impl JsonLinesRows<BufReader<File>> {
    /// Open a JSON Lines file
    pub fn open<P: AsRef<Path>>(path: P, columns: &TabularColumns) -> Result<Self, ExtractError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), columns))
    }
}

impl<R: BufRead> JsonLinesRows<R> {
    /// Wrap a buffered reader
    pub fn new(reader: R, columns: &TabularColumns) -> Self {
        Self {
            reader,
            line: Vec::new(),
            columns: columns.clone(),
        }
    }
}

impl<R: BufRead> Iterator for JsonLinesRows<R> {
    type Item = Result<TabularRow, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }

            let line = String::from_utf8_lossy(&self.line);
            if line.trim().is_empty() {
                continue;
            }

            let mut object = match serde_json::from_str::<Value>(&line) {
                Ok(Value::Object(object)) => object,
                Ok(_) => {
                    return Some(Err(ExtractError::MalformedRow(format!(
                        "expected a JSON object, got: {}",
                        preview(&line)
                    ))))
                }
                Err(e) => return Some(Err(e.into())),
            };

            let mut take = |name: &str| object.remove(name).unwrap_or(Value::Null);
            return Some(Ok(TabularRow {
                id: take(&self.columns.id),
                mz: take(&self.columns.mz),
                intensity: take(&self.columns.intensity),
            }));
        }
    }
}

/// Extractor over tabular rows.
///
/// Rows that fail to decode or whose arrays differ in length are logged and
/// skipped; extraction carries on with the next row.
pub struct TabularReader<I> {
    rows: I,
    limit: Option<usize>,
    rows_read: usize,
    skipped: usize,
}

impl<I> TabularReader<I>
where
    I: Iterator<Item = Result<TabularRow, ExtractError>>,
{
    /// Create an extractor over a row source
    pub fn new(rows: I) -> Self {
        Self {
            rows,
            limit: None,
            rows_read: 0,
            skipped: 0,
        }
    }

    /// Stop after reading `limit` rows (skipped rows included)
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Number of rows pulled from the source
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    fn convert(row: TabularRow) -> Result<SpectrumRecord, ExtractError> {
        let mz = decode_array(&row.mz)?;
        let intensity = decode_array(&row.intensity)?;
        if mz.len() != intensity.len() {
            return Err(ExtractError::MalformedRow(format!(
                "m/z and intensity lengths differ ({} vs {})",
                mz.len(),
                intensity.len()
            )));
        }

        Ok(SpectrumRecord {
            id: PointId::from_json(&row.id),
            peaks: mz
                .into_iter()
                .zip(intensity)
                .map(|(mz, intensity)| Peak::new(mz, intensity))
                .collect(),
            metadata: Default::default(),
        })
    }
}

impl<I> SpectrumSource for TabularReader<I>
where
    I: Iterator<Item = Result<TabularRow, ExtractError>>,
{
    fn next_record(&mut self) -> Result<Option<SpectrumRecord>, ExtractError> {
        loop {
            if self.limit.is_some_and(|limit| self.rows_read >= limit) {
                return Ok(None);
            }

            let row = match self.rows.next() {
                None => return Ok(None),
                Some(row) => row,
            };
            self.rows_read += 1;

            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_row_local() => {
                    warn!("[skip] row {}: {}", self.rows_read, e);
                    self.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let id = row.id.clone();
            match Self::convert(row) {
                Ok(record) => return Ok(Some(record)),
                Err(e) => {
                    warn!("[skip] id={} {}", id, e);
                    self.skipped += 1;
                }
            }
        }
    }

    fn skipped(&self) -> usize {
        self.skipped
    }
}
