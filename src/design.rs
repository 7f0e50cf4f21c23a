//! Design-matrix builder: observation table to model specification.
//!
//! Factor codes are assigned by first appearance in table order, which
//! makes the integer-to-label correspondence deterministic and
//! reproducible across reruns of the same table. Interaction cells exist
//! only for (year, level) pairs actually observed; cells with no data get
//! no index.

use std::collections::HashMap;

use crate::data::ObservationTable;
use crate::error::Error;
use crate::model::ModelSpec;
use crate::types::{Gas, Question};

/// Build the model specification for one (gas, question) pair.
///
/// `question` selects the second factor: the visit index for
/// [`Question::VisitEffects`], the site for [`Question::SiteEffects`]. The
/// response is the natural log of the gas concentrations.
///
/// # Errors
/// Fails with [`Error::InvalidInput`] if the table is empty or any
/// concentration for the requested gas is non-finite or non-positive.
/// Tables built through [`ObservationTable::new`] already guarantee this;
/// the check here keeps the builder's contract independent of how the
/// table was produced.
pub fn design_matrix(
    table: &ObservationTable,
    gas: Gas,
    question: Question,
) -> Result<ModelSpec, Error> {
    if table.is_empty() {
        return Err(Error::invalid("observation table is empty"));
    }
    for (row, obs) in table.observations().iter().enumerate() {
        let v = obs.value(gas);
        if !v.is_finite() || v <= 0.0 {
            return Err(Error::invalid(format!(
                "row {}: {} concentration {} cannot be log-transformed",
                row, gas, v
            )));
        }
    }

    let mut factor1 = Coder::new();
    let mut factor2 = Coder::new();
    let mut cells = Coder::new();

    let mut factor1_codes = Vec::with_capacity(table.len());
    let mut factor2_codes = Vec::with_capacity(table.len());
    let mut cell_codes = Vec::with_capacity(table.len());
    let mut cell_labels: Vec<(String, String)> = Vec::new();

    for obs in table.observations() {
        let level = match question {
            Question::VisitEffects => obs.visit.to_string(),
            Question::SiteEffects => obs.site.clone(),
        };

        factor1_codes.push(factor1.code(&obs.year));
        factor2_codes.push(factor2.code(&level));

        let cell_key = format!("{}:{}", obs.year, level);
        let (code, fresh) = cells.code_with_freshness(&cell_key);
        if fresh {
            cell_labels.push((obs.year.clone(), level));
        }
        cell_codes.push(code);
    }

    Ok(ModelSpec {
        question,
        response: table.log_response(gas),
        n_factor1: factor1.len(),
        factor1: factor1_codes,
        n_factor2: factor2.len(),
        factor2: factor2_codes,
        n_cells: cells.len(),
        cells: cell_codes,
        factor1_labels: factor1.into_labels(),
        factor2_labels: factor2.into_labels(),
        cell_labels,
    })
}

/// Assigns 1-based contiguous codes in first-appearance order.
struct Coder {
    codes: HashMap<String, usize>,
    labels: Vec<String>,
}

impl Coder {
    fn new() -> Self {
        Self {
            codes: HashMap::new(),
            labels: Vec::new(),
        }
    }

    fn code(&mut self, label: &str) -> usize {
        self.code_with_freshness(label).0
    }

    fn code_with_freshness(&mut self, label: &str) -> (usize, bool) {
        if let Some(&code) = self.codes.get(label) {
            return (code, false);
        }
        self.labels.push(label.to_string());
        let code = self.labels.len();
        self.codes.insert(label.to_string(), code);
        (code, true)
    }

    fn len(&self) -> usize {
        self.labels.len()
    }

    fn into_labels(self) -> Vec<String> {
        self.labels
    }
}
