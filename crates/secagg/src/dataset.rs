//! Transaction tables: CSV input, enrichment with revealed aggregates and CSV output.
//!
//! Rows are kept as the raw [`StringRecord`]s read from the input, so every column and cell is
//! written back unchanged. Only the sender, receiver and amount columns are interpreted.
use std::io;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::aggregate::{PairKey, Revealed, RevealedAggregates};
use crate::errors::DatasetError;

pub const SENDER_COLUMN: &str = "Sender_account";
pub const RECEIVER_COLUMN: &str = "Receiver_account";
pub const AMOUNT_COLUMN: &str = "Amount";
pub const INTERACTION_COUNT_COLUMN: &str = "interaction_count";
pub const TOTAL_AMOUNT_COLUMN: &str = "total_transaction_amount";

/// Names of the columns holding the sender, receiver and amount of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Columns {
    pub sender: String,
    pub receiver: String,
    pub amount: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            sender: SENDER_COLUMN.to_owned(),
            receiver: RECEIVER_COLUMN.to_owned(),
            amount: AMOUNT_COLUMN.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: f64,
}

impl Record {
    pub fn pair(&self) -> PairKey {
        PairKey::new(&self.sender_id, &self.receiver_id)
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    headers: StringRecord,
    rows: Vec<StringRecord>,
    records: Vec<Record>,
}

impl Table {
    pub fn read_path(path: impl AsRef<Path>, columns: &Columns) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let reader = csv::Reader::from_path(path).map_err(|source| DatasetError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_csv(reader, columns)
    }

    pub fn from_reader<R: io::Read>(reader: R, columns: &Columns) -> Result<Self, DatasetError> {
        Self::from_csv(csv::Reader::from_reader(reader), columns)
    }

    fn from_csv<R: io::Read>(
        mut reader: csv::Reader<R>,
        columns: &Columns,
    ) -> Result<Self, DatasetError> {
        let headers = reader.headers()?.clone();
        let sender = column_index(&headers, &columns.sender)?;
        let receiver = column_index(&headers, &columns.receiver)?;
        let amount = column_index(&headers, &columns.amount)?;

        let mut rows = Vec::new();
        let mut records = Vec::new();
        for (idx, row) in reader.records().enumerate() {
            let row = row?;
            let amount_text = row.get(amount).unwrap_or_default();
            let amount_value =
                amount_text
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| DatasetError::InvalidAmount {
                        row: idx + 1,
                        value: amount_text.to_owned(),
                    })?;
            records.push(Record {
                sender_id: row.get(sender).unwrap_or_default().to_owned(),
                receiver_id: row.get(receiver).unwrap_or_default().to_owned(),
                amount: amount_value,
            });
            rows.push(row);
        }
        debug!(rows = rows.len(), columns = headers.len(), "Read dataset");
        Ok(Self {
            headers,
            rows,
            records,
        })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The pair and amount of every row, in row order.
    pub fn pair_amounts(&self) -> impl Iterator<Item = (PairKey, f64)> + '_ {
        self.records
            .iter()
            .map(|record| (record.pair(), record.amount))
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize, DatasetError> {
    headers
        .iter()
        .position(|header| header.trim() == name)
        .ok_or_else(|| DatasetError::MissingColumn(name.to_owned()))
}

/// A table with the interaction count and total amount of its pair appended to every row.
#[derive(Debug, Clone)]
pub struct EnrichedTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

/// Attach the revealed aggregate of each row's pair to the row.
///
/// A pair without an aggregate gets a count of 0 and a total of 0.0. This can only happen if
/// `revealed` was not computed from `table`.
pub fn enrich(table: &Table, revealed: &RevealedAggregates) -> EnrichedTable {
    let mut headers = table.headers.clone();
    headers.push_field(INTERACTION_COUNT_COLUMN);
    headers.push_field(TOTAL_AMOUNT_COLUMN);

    let mut missing = 0_usize;
    let rows = table
        .rows
        .iter()
        .zip(&table.records)
        .map(|(row, record)| {
            let Revealed { count, sum } = match revealed.get(&record.pair()) {
                Some(aggregate) => *aggregate,
                None => {
                    missing += 1;
                    Revealed { count: 0, sum: 0.0 }
                }
            };
            let mut row = row.clone();
            row.push_field(&count.to_string());
            row.push_field(&format_amount(sum));
            row
        })
        .collect();
    if missing > 0 {
        warn!(missing, "Rows without a revealed aggregate were enriched with zeros");
    }
    EnrichedTable { headers, rows }
}

impl EnrichedTable {
    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of the column `name`, or `None` if there is no such column.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.headers.iter().position(|header| header == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).unwrap_or_default())
                .collect(),
        )
    }

    pub fn write_path(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let path = path.as_ref();
        let into_write_err = |source| DatasetError::Write {
            path: path.to_owned(),
            source,
        };
        let writer = csv::Writer::from_path(path).map_err(into_write_err)?;
        self.write_csv(writer).map_err(|err| match err {
            DatasetError::Csv(source) => into_write_err(source),
            other => other,
        })
    }

    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), DatasetError> {
        self.write_csv(csv::Writer::from_writer(writer))
    }

    fn write_csv<W: io::Write>(&self, mut writer: csv::Writer<W>) -> Result<(), DatasetError> {
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Format an amount with at least one decimal place, e.g. `30.0`.
pub fn format_amount(amount: f64) -> String {
    let text = amount.to_string();
    if amount.is_finite() && !text.contains('.') {
        format!("{text}.0")
    } else {
        text
    }
}
