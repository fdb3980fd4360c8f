mod config;
use log::{debug, info};

use std::collections::{BTreeSet, HashMap, HashSet};

pub use crate::config::*;

/// Reads a text value as a number, accepting both `.` and `,` as the decimal
/// separator. Anything else is missing data, not zero.
pub fn coerce_value(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// Running sums per (region, indicator). A region enters the index as soon as
// it has one filtered record, even when none of its values coerce.
struct Aggregation {
    regions: Vec<String>,
    sums: HashMap<(String, String), (f64, u64)>,
}

impl Aggregation {
    fn mean(&self, region: &str, indicator: &str) -> Option<f64> {
        self.sums
            .get(&(region.to_string(), indicator.to_string()))
            .map(|(sum, count)| sum / *count as f64)
    }
}

fn aggregate(records: &[IndicatorRecord], options: &RankingOptions) -> Aggregation {
    let requested: HashSet<&str> = options.indicators.iter().map(String::as_str).collect();
    let mut regions: BTreeSet<String> = BTreeSet::new();
    let mut sums: HashMap<(String, String), (f64, u64)> = HashMap::new();
    for record in records.iter() {
        if record.year != options.year || !requested.contains(record.indicator.as_str()) {
            continue;
        }
        regions.insert(record.region.clone());
        if let Some(v) = coerce_value(&record.value) {
            let e = sums
                .entry((record.region.clone(), record.indicator.clone()))
                .or_insert((0.0, 0));
            e.0 += v;
            e.1 += 1;
        }
    }
    Aggregation {
        regions: regions.into_iter().collect(),
        sums,
    }
}

/// Computes a composite score per region from multiple indicators and returns
/// the regions sorted by score.
///
/// Each indicator is aggregated by arithmetic mean over the matching records,
/// then min-max normalized across regions so indicators with different units
/// stay comparable. Indicators with fewer than two non-missing regions are
/// skipped entirely. The contribution of every indicator is divided by the
/// number of *requested* indicators, not the number actually scored: a
/// skipped indicator lowers the attainable score instead of redistributing
/// its weight. This is a deliberate, tested choice.
pub fn run_ranking(
    records: &[IndicatorRecord],
    options: &RankingOptions,
) -> Result<RankingTable, RankingErrors> {
    if !(0.0..=1.0).contains(&options.negative_weight) {
        return Err(RankingErrors::InvalidNegativeWeight(options.negative_weight));
    }
    info!(
        "run_ranking: {} records, year {:?}, {} indicators, negative weight {}",
        records.len(),
        options.year,
        options.indicators.len(),
        options.negative_weight
    );

    let agg = aggregate(records, options);
    debug!(
        "run_ranking: {} regions in the aggregation index",
        agg.regions.len()
    );

    let mut rows: Vec<RegionScore> = agg
        .regions
        .iter()
        .map(|region| RegionScore {
            region: region.clone(),
            means: options
                .indicators
                .iter()
                .map(|indicator| agg.mean(region, indicator))
                .collect(),
            score: 0.0,
        })
        .collect();

    let num_requested = options.indicators.len().max(1) as f64;
    let w = options.negative_weight;

    for (col, indicator) in options.indicators.iter().enumerate() {
        let present: Vec<(usize, f64)> = rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| row.means[col].map(|m| (idx, m)))
            .collect();
        if present.len() < 2 {
            // Not enough data to spread the regions apart. The indicator
            // contributes nothing, and the denominator below is unchanged.
            debug!(
                "run_ranking: skipping indicator {:?}, {} region(s) with data",
                indicator,
                present.len()
            );
            continue;
        }
        let min = present.iter().map(|(_, m)| *m).fold(f64::INFINITY, f64::min);
        let max = present
            .iter()
            .map(|(_, m)| *m)
            .fold(f64::NEG_INFINITY, f64::max);
        let span = max - min;
        let higher_is_better = options.positive.contains(indicator);
        for (idx, mean) in present {
            // A constant indicator leaves every region at the minimum.
            let norm = if span > 0.0 { (mean - min) / span } else { 0.0 };
            rows[idx].score += if higher_is_better {
                (1.0 - w) * norm / num_requested
            } else {
                w * (1.0 - norm) / num_requested
            };
        }
    }

    // Stable: ties keep the region-name ordering of the index.
    rows.sort_by(|a, b| b.score.total_cmp(&a.score));

    Ok(RankingTable {
        indicators: options.indicators.clone(),
        rows,
    })
}
