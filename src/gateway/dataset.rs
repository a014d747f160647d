//! Reference dataset for similarity suggestions
//!
//! Columns are typed on load: a column is numeric when every non-empty cell
//! parses as a number, categorical otherwise. Empty cells are missing values.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use super::FeatureVector;

/// Relative width of the band a numeric feature matches within.
const NUMERIC_TOLERANCE: f64 = 0.2;
const MAX_NUMERIC_SUMMARIES: usize = 5;
const MAX_CATEGORY_SUMMARIES: usize = 3;
const TOP_CATEGORY_VALUES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    data: ColumnData,
}

/// Column-oriented table loaded from CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: usize,
}

impl Dataset {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open dataset: {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("Failed to read dataset: {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for (idx, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("Failed to read row {}", idx + 1))?;
            for (col, slot) in cells.iter_mut().enumerate() {
                let cell = record.get(col).map(str::trim).filter(|s| !s.is_empty());
                slot.push(cell.map(str::to_string));
            }
        }

        let rows = cells.first().map_or(0, Vec::len);
        let columns = headers
            .iter()
            .zip(cells)
            .map(|(name, values)| Column {
                name: name.to_string(),
                data: type_column(values),
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn is_numeric(&self, column: &str) -> Option<bool> {
        self.column(column)
            .map(|c| matches!(c.data, ColumnData::Numeric(_)))
    }

    fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Rows similar to the given features.
    ///
    /// Categorical columns match case-insensitively on the value's text.
    /// Numeric columns match within ±20% of the value's magnitude. Features
    /// without a column, or with a text value on a numeric column, are
    /// ignored.
    pub fn similar_rows(&self, features: &FeatureVector) -> Vec<usize> {
        let mut rows: Vec<usize> = (0..self.rows).collect();

        for (feature, value) in features {
            let Some(column) = self.column(feature) else {
                continue;
            };
            match &column.data {
                ColumnData::Categorical(cells) => {
                    let wanted = value.to_string().to_lowercase();
                    rows.retain(|&row| {
                        cells[row]
                            .as_deref()
                            .is_some_and(|cell| cell.to_lowercase() == wanted)
                    });
                }
                ColumnData::Numeric(cells) => {
                    let Some(target) = value.as_f64() else {
                        continue;
                    };
                    let tolerance = target.abs() * NUMERIC_TOLERANCE;
                    rows.retain(|&row| {
                        cells[row].is_some_and(|cell| {
                            cell >= target - tolerance && cell <= target + tolerance
                        })
                    });
                }
            }
        }

        rows
    }

    /// Summary line for the rows similar to a partial feature vector.
    pub fn suggest(&self, partial: &FeatureVector) -> String {
        let rows = self.similar_rows(partial);
        if rows.is_empty() {
            return "No similar records found in dataset".to_string();
        }

        let mut parts = Vec::new();

        let numeric = self.columns.iter().filter_map(|c| match &c.data {
            ColumnData::Numeric(cells) => Some((c.name.as_str(), cells)),
            ColumnData::Categorical(_) => None,
        });
        for (name, cells) in numeric.take(MAX_NUMERIC_SUMMARIES) {
            if let Some(mean) = mean(rows.iter().filter_map(|&row| cells[row])) {
                parts.push(format!("{}: avg {:.2}", name, mean));
            }
        }

        let categorical = self.columns.iter().filter_map(|c| match &c.data {
            ColumnData::Categorical(cells) => Some((c.name.as_str(), cells)),
            ColumnData::Numeric(_) => None,
        });
        for (name, cells) in categorical.take(MAX_CATEGORY_SUMMARIES) {
            let counts = value_counts(rows.iter().filter_map(|&row| cells[row].as_deref()));
            if !counts.is_empty() {
                let top: Vec<String> = counts
                    .iter()
                    .take(TOP_CATEGORY_VALUES)
                    .map(|(value, count)| format!("{}({})", value, count))
                    .collect();
                parts.push(format!("{}: {}", name, top.join(", ")));
            }
        }

        if parts.is_empty() {
            format!("Found {} similar records but no clear patterns", rows.len())
        } else {
            format!(
                "Based on {} similar records: {}",
                rows.len(),
                parts.join("; ")
            )
        }
    }
}

fn type_column(values: Vec<Option<String>>) -> ColumnData {
    let parsed: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(text) => text.parse::<f64>().ok().map(Some),
        })
        .collect();

    match parsed {
        Some(numbers) => ColumnData::Numeric(numbers),
        None => ColumnData::Categorical(values),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Counts per distinct value, most frequent first; ties keep first-seen order.
fn value_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
