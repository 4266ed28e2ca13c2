//! Raw abundance tables as they come off disk: lineage text plus unparsed cells.

use crate::error::{Result, TaxonError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// How taxa and samples are laid out in the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOrientation {
    /// One row per taxon: first column is the lineage, remaining headers are samples.
    #[default]
    TaxaBySamples,
    /// One row per sample: first column is the sample id, remaining headers are
    /// lineages. This is the layout of per-level barplot exports.
    SamplesByTaxa,
}

/// Field delimiter implied by a file extension.
pub fn delimiter_for<P: AsRef<Path>>(path: P) -> Result<u8> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "tsv" | "txt" => Ok(b'\t'),
        "csv" => Ok(b','),
        "xls" | "xlsx" => Err(TaxonError::MalformedInput(format!(
            "{}: spreadsheet input is not supported, export it as CSV or TSV",
            path.display()
        ))),
        _ => Err(TaxonError::MalformedInput(format!(
            "{}: unsupported file extension '{}', expected csv, tsv or txt",
            path.display(),
            ext
        ))),
    }
}

/// Read a delimited file into a header row and data rows, skipping blank lines.
pub(crate) fn read_records<R: Read>(reader: R, delimiter: u8) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let header: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok((header, rows))
}

/// One taxon row before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Lineage string, `None` when the cell was blank.
    pub lineage: Option<String>,
    /// Abundance cells as text, one per sample.
    pub cells: Vec<String>,
}

/// A taxa × samples table whose numeric cells have not been coerced yet.
#[derive(Debug, Clone)]
pub struct RawAbundanceTable {
    sample_ids: Vec<String>,
    rows: Vec<RawRow>,
}

impl RawAbundanceTable {
    /// Create a table, checking that it has at least one taxon row and one
    /// sample column, that sample ids are unique and that every row has one
    /// cell per sample.
    pub fn new(sample_ids: Vec<String>, rows: Vec<RawRow>) -> Result<Self> {
        if sample_ids.is_empty() {
            return Err(TaxonError::MalformedInput(
                "abundance table has no sample columns".to_string(),
            ));
        }
        if rows.is_empty() {
            return Err(TaxonError::MalformedInput(
                "abundance table has no taxon rows".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for sid in &sample_ids {
            if !seen.insert(sid.as_str()) {
                return Err(TaxonError::MalformedInput(format!(
                    "duplicate sample column '{}'",
                    sid
                )));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.cells.len() != sample_ids.len() {
                return Err(TaxonError::MalformedInput(format!(
                    "row {} has {} cells, expected {}",
                    i + 1,
                    row.cells.len(),
                    sample_ids.len()
                )));
            }
        }
        Ok(Self { sample_ids, rows })
    }

    /// Load from a CSV/TSV file, picking the delimiter from the extension.
    ///
    /// Columns whose header appears in `exclude_columns` are dropped before the
    /// table is built; pass the metadata header here to strip metadata columns
    /// that exports append to the abundance table.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        orientation: TableOrientation,
        exclude_columns: &[String],
    ) -> Result<Self> {
        let delimiter = delimiter_for(&path)?;
        let file = File::open(path)?;
        Self::from_reader(file, delimiter, orientation, exclude_columns)
    }

    /// Load from any reader with an explicit delimiter.
    pub fn from_reader<R: Read>(
        reader: R,
        delimiter: u8,
        orientation: TableOrientation,
        exclude_columns: &[String],
    ) -> Result<Self> {
        let (header, rows) = read_records(reader, delimiter)?;
        if header.len() < 2 {
            return Err(TaxonError::MalformedInput(
                "abundance table needs an identifier column and at least one value column"
                    .to_string(),
            ));
        }

        // The identifier column is never excluded.
        let exclude: HashSet<&str> = exclude_columns.iter().map(|c| c.trim()).collect();
        let keep: Vec<usize> = (1..header.len())
            .filter(|&i| !exclude.contains(header[i].trim()))
            .collect();
        if keep.len() + 1 < header.len() {
            debug!(
                "Dropped {} metadata column(s) from abundance table",
                header.len() - 1 - keep.len()
            );
        }

        let ids: Vec<Option<String>> = rows.iter().map(|r| non_blank(r.first())).collect();
        let values: Vec<Vec<String>> = rows
            .iter()
            .map(|r| {
                keep.iter()
                    .map(|&i| r.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        let value_headers: Vec<String> = keep.iter().map(|&i| header[i].trim().to_string()).collect();

        match orientation {
            TableOrientation::TaxaBySamples => {
                let rows = ids
                    .into_iter()
                    .zip(values)
                    .map(|(lineage, cells)| RawRow { lineage, cells })
                    .collect();
                Self::new(value_headers, rows)
            }
            TableOrientation::SamplesByTaxa => {
                let sample_ids: Vec<String> = ids
                    .into_iter()
                    .enumerate()
                    .map(|(i, id)| {
                        id.ok_or_else(|| {
                            TaxonError::MalformedInput(format!("row {} has no sample id", i + 1))
                        })
                    })
                    .collect::<Result<_>>()?;
                let rows = value_headers
                    .into_iter()
                    .enumerate()
                    .map(|(j, lineage)| RawRow {
                        lineage: non_blank(Some(&lineage)),
                        cells: values.iter().map(|v| v[j].clone()).collect(),
                    })
                    .collect();
                Self::new(sample_ids, rows)
            }
        }
    }

    /// Sample identifiers in column order.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Taxon rows in input order.
    #[inline]
    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    /// Number of taxon rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of sample columns.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Lineage strings in row order.
    pub fn lineages(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows.iter().map(|r| r.lineage.as_deref())
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
}
