//! Crate-wide error type.
//!
//! Failure semantics follow the batch design: `InvalidInput` and
//! `MismatchedParameter` abort the single affected fit or comparison,
//! `Sampling` aborts only the fit it names. Convergence problems are not
//! errors; they are reported as [`ConvergenceWarning`]s attached to the
//! sample set.
//!
//! [`ConvergenceWarning`]: crate::model::diagnostics::ConvergenceWarning

use thiserror::Error;

use crate::posterior::ParamKey;
use crate::types::FitTag;

/// Errors produced by the analysis pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or empty observation data, or an invalid configuration.
    #[error("invalid input: {context}")]
    InvalidInput {
        /// What was wrong and where.
        context: String,
    },

    /// A sampler run could not complete (numerical instability).
    #[error("sampling failed for {tag}: {reason}")]
    Sampling {
        /// The fit that failed.
        tag: FitTag,
        /// Why the run aborted.
        reason: String,
    },

    /// A comparison requested a parameter absent from one sample set.
    #[error("parameter {key} not present in the {missing_from} sample set")]
    MismatchedParameter {
        /// The requested parameter.
        key: ParamKey,
        /// Which side of the comparison lacks it.
        missing_from: String,
    },

    /// I/O error reading the observation file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error at a specific line of the observation file.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// Line number where the error occurred (1-indexed).
        line: usize,
        /// Description of the parse error.
        message: String,
    },
}

impl Error {
    /// Shorthand for an [`Error::InvalidInput`].
    pub(crate) fn invalid(context: impl Into<String>) -> Self {
        Error::InvalidInput {
            context: context.into(),
        }
    }
}
