use std::fmt;
use std::io::Read;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

/// A single cell value. CSV ingestion produces `Text` for every cell;
/// JSON ingestion preserves the native type. Numeric consumers go through
/// [`Scalar::as_f64`] so both sources behave identically.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl Scalar {
    /// Coerce to a number. Text is trimmed and parsed; bools and nulls
    /// never coerce.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
            Scalar::Bool(_) | Scalar::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Whole numbers print without a trailing ".0" so category
            // labels and tooltips read like the source data.
            Scalar::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{}", s),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Null => Ok(()),
        }
    }
}

/// One row of tabular data: an ordered field-name-to-value mapping.
/// Field names need not be uniform across records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Scalar)>,
}

impl Record {
    pub fn new(fields: Vec<(String, Scalar)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(field, _)| field == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(field, _)| field.as_str())
    }
}

/// An ordered sequence of records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    /// Read CSV with a header row. Every cell becomes `Scalar::Text`;
    /// a headers-only input yields an empty dataset rather than an error.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .context("Failed to read CSV header row")?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut records = Vec::new();
        for (row_idx, row) in csv_reader.records().enumerate() {
            let row = row.with_context(|| format!("Failed to read CSV row {}", row_idx + 1))?;
            let fields = headers
                .iter()
                .zip(row.iter())
                .map(|(header, cell)| (header.clone(), Scalar::Text(cell.to_string())))
                .collect();
            records.push(Record::new(fields));
        }

        Ok(Self::new(records))
    }

    /// Build a dataset from a JSON array of objects. Scalar member values
    /// keep their native type; nested arrays and objects are rejected.
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;

        let mut records = Vec::new();
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| anyhow!("Items in the data array must be objects"))?;

            let mut fields = Vec::with_capacity(obj.len());
            for (name, val) in obj {
                let scalar = match val {
                    Value::String(s) => Scalar::Text(s.clone()),
                    Value::Number(n) => Scalar::Number(
                        n.as_f64()
                            .ok_or_else(|| anyhow!("Field '{}' is not a finite number", name))?,
                    ),
                    Value::Bool(b) => Scalar::Bool(*b),
                    Value::Null => Scalar::Null,
                    Value::Array(_) | Value::Object(_) => {
                        return Err(anyhow!(
                            "Field '{}' holds a nested value; only scalars are supported",
                            name
                        ));
                    }
                };
                fields.push((name.clone(), scalar));
            }
            records.push(Record::new(fields));
        }

        Ok(Self::new(records))
    }
}
