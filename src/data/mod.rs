//! Observation data model.
//!
//! One [`Observation`] per (site, year, visit) carrying all three gas
//! concentrations. Rows flagged as missing in the source file never reach
//! this module; the loader filters them before the table is built.

mod csv;

pub use csv::load_observations;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::Error;
use crate::types::Gas;

/// One field measurement: a (site, year, visit) triple with the three gas
/// concentration readings taken on that visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Site identifier.
    pub site: String,
    /// Year label (e.g. "2022").
    pub year: String,
    /// Visit index within the year, starting at 1.
    pub visit: u8,
    /// CO2 concentration (ppm), strictly positive.
    pub co2: f64,
    /// CH4 concentration (ppb), strictly positive.
    pub ch4: f64,
    /// N2O concentration (ppb), strictly positive.
    pub n2o: f64,
}

impl Observation {
    /// The reading for one gas.
    pub fn value(&self, gas: Gas) -> f64 {
        match gas {
            Gas::Co2 => self.co2,
            Gas::Ch4 => self.ch4,
            Gas::N2o => self.n2o,
        }
    }
}

/// A validated, immutable table of observations.
///
/// Construction enforces the data invariants once; everything downstream
/// (design matrices, fits, comparisons) consumes the table read-only and
/// derives new structures instead of mutating shared state.
#[derive(Debug, Clone)]
pub struct ObservationTable {
    observations: Vec<Observation>,
}

impl ObservationTable {
    /// Build a table, validating every row.
    ///
    /// Fails with [`Error::InvalidInput`] if the input is empty, any
    /// concentration is non-finite or non-positive (they are log-transformed
    /// before modeling), a visit index is zero, or the same (site, year,
    /// visit) triple appears twice.
    pub fn new(observations: Vec<Observation>) -> Result<Self, Error> {
        if observations.is_empty() {
            return Err(Error::invalid("observation table is empty"));
        }

        let mut seen = HashSet::new();
        for (row, obs) in observations.iter().enumerate() {
            if obs.site.is_empty() || obs.year.is_empty() {
                return Err(Error::invalid(format!(
                    "row {}: site and year must be non-empty",
                    row
                )));
            }
            if obs.visit == 0 {
                return Err(Error::invalid(format!(
                    "row {}: visit index must start at 1",
                    row
                )));
            }
            for gas in Gas::ALL {
                let v = obs.value(gas);
                if !v.is_finite() || v <= 0.0 {
                    return Err(Error::invalid(format!(
                        "row {}: {} concentration {} is not a positive finite number",
                        row, gas, v
                    )));
                }
            }
            if !seen.insert((obs.site.clone(), obs.year.clone(), obs.visit)) {
                return Err(Error::invalid(format!(
                    "duplicate observation for site {} year {} visit {}",
                    obs.site, obs.year, obs.visit
                )));
            }
        }

        Ok(Self { observations })
    }

    /// All observations, in table order.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the table is empty. Always false for a constructed table.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Distinct site labels in first-appearance order.
    pub fn sites(&self) -> Vec<&str> {
        distinct(self.observations.iter().map(|o| o.site.as_str()))
    }

    /// Distinct year labels in first-appearance order.
    pub fn years(&self) -> Vec<&str> {
        distinct(self.observations.iter().map(|o| o.year.as_str()))
    }

    /// Distinct visit indices in first-appearance order.
    pub fn visits(&self) -> Vec<u8> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for obs in &self.observations {
            if seen.insert(obs.visit) {
                out.push(obs.visit);
            }
        }
        out
    }

    /// Natural log of one gas's concentrations, in table order.
    pub fn log_response(&self, gas: Gas) -> Vec<f64> {
        self.observations
            .iter()
            .map(|o| o.value(gas).ln())
            .collect()
    }

    /// A new table keeping only the listed visits.
    ///
    /// Used to derive the reduced scenario from the full table. Fails with
    /// [`Error::InvalidInput`] if no observation survives the filter.
    pub fn reduced(&self, keep_visits: &[u8]) -> Result<Self, Error> {
        let kept: Vec<Observation> = self
            .observations
            .iter()
            .filter(|o| keep_visits.contains(&o.visit))
            .cloned()
            .collect();
        if kept.is_empty() {
            return Err(Error::invalid(format!(
                "no observations left after keeping visits {:?}",
                keep_visits
            )));
        }
        Ok(Self { observations: kept })
    }
}

fn distinct<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(site: &str, year: &str, visit: u8, value: f64) -> Observation {
        Observation {
            site: site.to_string(),
            year: year.to_string(),
            visit,
            co2: value,
            ch4: value,
            n2o: value,
        }
    }

    #[test]
    fn test_empty_table_rejected() {
        let result = ObservationTable::new(vec![]);
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_non_positive_concentration_rejected() {
        for bad in [0.0, -1.5, f64::NAN, f64::INFINITY] {
            let result = ObservationTable::new(vec![obs("S01", "2022", 1, bad)]);
            assert!(
                matches!(result, Err(Error::InvalidInput { .. })),
                "value {} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_duplicate_triple_rejected() {
        let rows = vec![obs("S01", "2022", 1, 400.0), obs("S01", "2022", 1, 410.0)];
        assert!(ObservationTable::new(rows).is_err());
    }

    #[test]
    fn test_distinct_labels_keep_first_appearance_order() {
        let rows = vec![
            obs("S02", "2023", 1, 400.0),
            obs("S01", "2022", 1, 400.0),
            obs("S02", "2022", 2, 400.0),
        ];
        let table = ObservationTable::new(rows).unwrap();
        assert_eq!(table.sites(), vec!["S02", "S01"]);
        assert_eq!(table.years(), vec!["2023", "2022"]);
        assert_eq!(table.visits(), vec![1, 2]);
    }

    #[test]
    fn test_log_response() {
        let table = ObservationTable::new(vec![obs("S01", "2022", 1, 400.0)]).unwrap();
        let y = table.log_response(Gas::Co2);
        assert!((y[0] - 400.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_reduced_keeps_only_listed_visits() {
        let rows = vec![
            obs("S01", "2022", 1, 400.0),
            obs("S01", "2022", 2, 400.0),
            obs("S01", "2022", 3, 400.0),
            obs("S01", "2022", 4, 400.0),
            obs("S01", "2022", 5, 400.0),
        ];
        let table = ObservationTable::new(rows).unwrap();
        let reduced = table.reduced(&[1, 3, 5]).unwrap();
        assert_eq!(reduced.visits(), vec![1, 3, 5]);
        assert_eq!(reduced.len(), 3);
    }

    #[test]
    fn test_reduced_to_nothing_is_an_error() {
        let table = ObservationTable::new(vec![obs("S01", "2022", 1, 400.0)]).unwrap();
        assert!(table.reduced(&[4]).is_err());
    }
}
