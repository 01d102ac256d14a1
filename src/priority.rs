//! Derived task priority.
//!
//! Every (business value, effort) pairing of a scale gets a rank: pairs are
//! ordered by `business value / effort` descending, ties keep the order in
//! which the pairs were generated (business value outer, effort inner), and
//! rank is the 1-based position. A task's priority is the rank of the first
//! table entry whose ratio does not exceed the task's own ratio.

use crate::models::PointScale;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::OnceLock;

/// One row of the priority table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityEntry {
    pub business_value: u32,
    pub effort: u32,
    /// `business_value / effort * 100`
    pub ratio: f64,
    pub rank: u32,
}

impl PriorityEntry {
    /// Compare this entry's ratio with `bv / effort` without rounding.
    fn cmp_ratio(&self, bv: u32, effort: u32) -> Ordering {
        (u64::from(self.business_value) * u64::from(effort))
            .cmp(&(u64::from(bv) * u64::from(self.effort)))
    }
}

/// Build the ranked table for `scale`.
pub fn build_priority_table(scale: PointScale) -> Vec<PriorityEntry> {
    let values = scale.values();
    let mut pairs: Vec<(u32, u32)> = values
        .iter()
        .flat_map(|&bv| values.iter().map(move |&effort| (bv, effort)))
        .collect();

    // `sort_by` is stable, so equal ratios keep generation order.
    pairs.sort_by(|a, b| (u64::from(b.0) * u64::from(a.1)).cmp(&(u64::from(a.0) * u64::from(b.1))));

    pairs
        .into_iter()
        .enumerate()
        .map(|(i, (business_value, effort))| PriorityEntry {
            business_value,
            effort,
            ratio: f64::from(business_value) / f64::from(effort) * 100.0,
            rank: i as u32 + 1,
        })
        .collect()
}

/// Memoized table for `scale`.
pub fn priority_table(scale: PointScale) -> &'static [PriorityEntry] {
    static LINEAR: OnceLock<Vec<PriorityEntry>> = OnceLock::new();
    static FIBONACCI: OnceLock<Vec<PriorityEntry>> = OnceLock::new();
    match scale {
        PointScale::Linear => LINEAR.get_or_init(|| build_priority_table(scale)),
        PointScale::Fibonacci => FIBONACCI.get_or_init(|| build_priority_table(scale)),
    }
}

/// Priority rank for a (business value, effort) pair.
///
/// `None` when either input is missing or zero. Otherwise a rank in
/// `1..=table.len()`; ratios below every bucket get the lowest rank.
///
/// Business 5 over effort 2 on the 1-5 scale ranks 4, behind 5/1, 4/1 and 3/1.
pub fn calculate_priority(
    business_value: Option<u32>,
    effort: Option<u32>,
    scale: PointScale,
) -> Option<u32> {
    let bv = business_value.filter(|v| *v > 0)?;
    let effort = effort.filter(|v| *v > 0)?;
    let table = priority_table(scale);
    let rank = table
        .iter()
        .find(|entry| entry.cmp_ratio(bv, effort) != Ordering::Greater)
        .map(|entry| entry.rank)
        .unwrap_or(table.len() as u32);
    Some(rank)
}
