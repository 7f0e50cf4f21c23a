//! Core enums shared across the analysis pipeline.

use serde::{Deserialize, Serialize};

/// Greenhouse gas measured at each visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gas {
    /// Carbon dioxide.
    Co2,
    /// Methane.
    Ch4,
    /// Nitrous oxide.
    N2o,
}

impl Gas {
    /// All gases, in reporting order.
    pub const ALL: [Gas; 3] = [Gas::Co2, Gas::Ch4, Gas::N2o];
}

impl std::fmt::Display for Gas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gas::Co2 => write!(f, "CO2"),
            Gas::Ch4 => write!(f, "CH4"),
            Gas::N2o => write!(f, "N2O"),
        }
    }
}

/// Which second factor the model estimates effects for.
///
/// Year is always the first factor; the second factor is either the visit
/// index (are individual visits systematically different?) or the site
/// (do sites differ?). The interaction term pairs year with the second
/// factor in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Question {
    /// Second factor is the visit index.
    VisitEffects,
    /// Second factor is the site.
    SiteEffects,
}

impl Question {
    /// Both questions, in reporting order.
    pub const ALL: [Question; 2] = [Question::VisitEffects, Question::SiteEffects];
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Question::VisitEffects => write!(f, "visit effects"),
            Question::SiteEffects => write!(f, "site effects"),
        }
    }
}

/// Which data scenario a fit was run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    /// All five visits per site per year.
    Full,
    /// The reduced three-visit subset.
    Reduced,
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scenario::Full => write!(f, "full"),
            Scenario::Reduced => write!(f, "reduced"),
        }
    }
}

/// Identifies one model fit within the study batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FitTag {
    /// Gas whose log-concentration is the response.
    pub gas: Gas,
    /// Which second factor the fit estimates.
    pub question: Question,
    /// Full or reduced data.
    pub scenario: Scenario,
}

impl FitTag {
    /// Create a new tag.
    pub fn new(gas: Gas, question: Question, scenario: Scenario) -> Self {
        Self {
            gas,
            question,
            scenario,
        }
    }
}

impl std::fmt::Display for FitTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {} / {}", self.gas, self.question, self.scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_display() {
        let tag = FitTag::new(Gas::Ch4, Question::SiteEffects, Scenario::Reduced);
        assert_eq!(tag.to_string(), "CH4 / site effects / reduced");
    }

    #[test]
    fn test_enum_inventories() {
        assert_eq!(Gas::ALL.len(), 3);
        assert_eq!(Question::ALL.len(), 2);
    }
}
