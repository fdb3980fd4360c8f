// ********* Input data structures ***********

use std::collections::HashSet;
use std::error::Error;
use std::fmt::Display;

/// One standardized observation: a value for an indicator in a region and a
/// period.
///
/// All fields are text. The `value` field is only coerced to a number inside
/// the ranking engine; anything that does not read as a number is treated as
/// missing, never as zero.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct IndicatorRecord {
    pub region: String,
    pub year: String,
    pub indicator: String,
    pub value: String,
    pub unit: String,
    pub source: String,
}

/// The parameters of one ranking request.
#[derive(PartialEq, Debug, Clone)]
pub struct RankingOptions {
    /// The period to rank on. Records for other years are ignored.
    pub year: String,
    /// The indicators to rank on, in the order the output columns should use.
    pub indicators: Vec<String>,
    /// The subset of `indicators` where a high value is favorable. Everything
    /// else in `indicators` is treated as lower-is-better.
    pub positive: HashSet<String>,
    /// Weight in [0, 1] given to the lower-is-better indicators. The
    /// higher-is-better indicators receive `1 - negative_weight`.
    pub negative_weight: f64,
}

// ******** Output data structures *********

/// One ranked region: the raw per-indicator means (aligned with the requested
/// indicator order, `None` when no value was available) and the composite
/// score. The means are included so the basis for the ranking stays auditable.
#[derive(PartialEq, Debug, Clone)]
pub struct RegionScore {
    pub region: String,
    pub means: Vec<Option<f64>>,
    pub score: f64,
}

/// The ranking table, sorted by score descending. Ties keep the region-name
/// ordering of the aggregation index; there is no secondary tie-break key.
#[derive(PartialEq, Debug, Clone)]
pub struct RankingTable {
    pub indicators: Vec<String>,
    pub rows: Vec<RegionScore>,
}

/// Errors that prevent a ranking from being computed at all. Sparse data is
/// not an error: under-populated indicators are skipped and regions without
/// usable values score zero.
#[derive(PartialEq, Debug, Clone)]
pub enum RankingErrors {
    /// The negative-indicator weight must stay within [0, 1].
    InvalidNegativeWeight(f64),
}

impl Error for RankingErrors {}

impl Display for RankingErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankingErrors::InvalidNegativeWeight(w) => {
                write!(f, "negative weight {} is outside [0, 1]", w)
            }
        }
    }
}
