// src/coverage.rs

use crate::models::DomainRecord;

/// Number of residues in `[span_start, span_end]` that fall inside at
/// least one domain. Overlapping or adjacent domains are merged first,
/// so a residue is counted once however many domains contain it.
///
/// An inverted span (`span_start > span_end`) holds no residues and gives
/// 0. Validated [`ChainSpan`](crate::models::ChainSpan)s are never inverted.
pub fn overlap_residues(span_start: u32, span_end: u32, domains: &[DomainRecord]) -> u32 {
    if span_start > span_end {
        return 0;
    }
    let clipped = domains.iter().filter_map(|domain| {
        let start = span_start.max(domain.start());
        let end = span_end.min(domain.end());
        (start <= end).then_some((start, end))
    });
    merged_length(clipped.collect())
}

/// Residue count of the union of all domain ranges.
pub fn domain_union_length(domains: &[DomainRecord]) -> u32 {
    merged_length(domains.iter().map(|d| (d.start(), d.end())).collect())
}

/// Sort by start, sweep, and sum the lengths of the merged runs.
fn merged_length(mut intervals: Vec<(u32, u32)>) -> u32 {
    intervals.sort_unstable();

    let mut total = 0;
    let mut current: Option<(u32, u32)> = None;
    for (start, end) in intervals {
        current = match current {
            // `saturating_add` keeps a run ending at u32::MAX from wrapping
            Some((run_start, run_end)) if start <= run_end.saturating_add(1) => {
                Some((run_start, run_end.max(end)))
            }
            Some((run_start, run_end)) => {
                total += run_end - run_start + 1;
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((run_start, run_end)) = current {
        total += run_end - run_start + 1;
    }
    total
}
