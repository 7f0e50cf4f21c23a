//! CSV loading for the observation file.
//!
//! The expected format is one row per (site, year, visit) with a header
//! naming at least the columns `site`, `year`, `visit`, `co2`, `ch4`,
//! `n2o`, and optionally `missing`. Rows whose missing marker is set are
//! filtered out here, before the table is built, so the in-memory table
//! never contains them.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Error;

use super::{Observation, ObservationTable};

const REQUIRED_COLUMNS: [&str; 6] = ["site", "year", "visit", "co2", "ch4", "n2o"];

/// Load an observation table from a CSV file.
///
/// # Example file content
/// ```csv
/// site,year,visit,co2,ch4,n2o,missing
/// S01,2022,1,412.5,1893.2,334.1,0
/// S01,2022,2,405.8,1911.7,333.0,1
/// ```
///
/// # Errors
/// Returns [`Error::Io`] if the file cannot be read, [`Error::Parse`] for a
/// malformed header or row, and [`Error::InvalidInput`] if the surviving
/// rows fail table validation (empty, non-positive concentrations,
/// duplicate triples).
pub fn load_observations(path: &Path) -> Result<ObservationTable, Error> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines().enumerate();

    let header = match lines.next() {
        Some((_, line)) => line?,
        None => return Err(Error::invalid("observation file is empty")),
    };
    let columns = parse_header(&header)?;

    let mut observations = Vec::new();
    for (line_num, line_result) in lines {
        let line = line_result?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() <= columns.max_index() {
            return Err(Error::Parse {
                line: line_num + 1,
                message: format!(
                    "expected at least {} columns, got {}",
                    columns.max_index() + 1,
                    fields.len()
                ),
            });
        }

        if let Some(idx) = columns.missing {
            if is_truthy(fields[idx]) {
                continue;
            }
        }

        observations.push(Observation {
            site: fields[columns.site].to_string(),
            year: fields[columns.year].to_string(),
            visit: parse_field(fields[columns.visit], "visit", line_num + 1)?,
            co2: parse_field(fields[columns.co2], "co2", line_num + 1)?,
            ch4: parse_field(fields[columns.ch4], "ch4", line_num + 1)?,
            n2o: parse_field(fields[columns.n2o], "n2o", line_num + 1)?,
        });
    }

    ObservationTable::new(observations)
}

/// Column positions resolved from the header row.
struct Columns {
    site: usize,
    year: usize,
    visit: usize,
    co2: usize,
    ch4: usize,
    n2o: usize,
    missing: Option<usize>,
}

impl Columns {
    fn max_index(&self) -> usize {
        let required = [self.site, self.year, self.visit, self.co2, self.ch4, self.n2o];
        let max_required = required.into_iter().max().unwrap_or(0);
        self.missing.map_or(max_required, |m| max_required.max(m))
    }
}

fn parse_header(header: &str) -> Result<Columns, Error> {
    let names: Vec<String> = header
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .collect();

    let position = |name: &str| -> Result<usize, Error> {
        names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::Parse {
                line: 1,
                message: format!(
                    "missing column '{}' (found: {})",
                    name,
                    names.join(", ")
                ),
            })
    };

    // Resolve all required columns up front so the error names the first
    // absent one rather than failing mid-file.
    for name in REQUIRED_COLUMNS {
        position(name)?;
    }

    Ok(Columns {
        site: position("site")?,
        year: position("year")?,
        visit: position("visit")?,
        co2: position("co2")?,
        ch4: position("ch4")?,
        n2o: position("n2o")?,
        missing: names.iter().position(|n| n == "missing"),
    })
}

fn parse_field<T: std::str::FromStr>(value: &str, column: &str, line: usize) -> Result<T, Error> {
    value.parse().map_err(|_| Error::Parse {
        line,
        message: format!("invalid {} value '{}'", column, value),
    })
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}
