use std::collections::{BTreeMap, BTreeSet};

use crate::footprint::{CarbonFootprint, Category};
use crate::recommend::{ActionProgress, Recommendation};

/// Recommendations not yet marked done, in their ranked order.
pub fn pending_recommendations(
    recommendations: &[Recommendation],
    completed_ids: &[String],
) -> Vec<Recommendation> {
    let completed = completed_ids.iter().collect::<BTreeSet<_>>();
    recommendations
        .iter()
        .filter(|rec| !completed.contains(&rec.id))
        .cloned()
        .collect()
}

/// Credits completed actions against the footprint they were generated from.
/// Completed ids that no longer match a recommendation are ignored. Overlapping
/// actions in one category never claim more than that category emits; offsets
/// are external and uncapped.
pub fn summarize_progress(
    footprint: &CarbonFootprint,
    recommendations: &[Recommendation],
    completed_ids: &[String],
) -> ActionProgress {
    let completed_set = completed_ids.iter().collect::<BTreeSet<_>>();
    let (completed, pending): (Vec<_>, Vec<_>) = recommendations
        .iter()
        .cloned()
        .partition(|rec| completed_set.contains(&rec.id));

    let mut per_category = BTreeMap::<Category, f64>::new();
    let mut offsets_kg = 0.0;
    for rec in &completed {
        match rec.category.footprint_category() {
            Some(category) => {
                *per_category.entry(category).or_default() += rec.estimated_reduction_kg;
            }
            None => offsets_kg += rec.estimated_reduction_kg,
        }
    }
    let realized_reduction_kg = per_category
        .into_iter()
        .map(|(category, kg)| kg.min(footprint.breakdown.get(category)))
        .sum::<f64>()
        + offsets_kg;

    ActionProgress {
        pending_count: pending.len(),
        realized_reduction_kg,
        baseline_total_kg: footprint.total_kg,
        projected_total_kg: (footprint.total_kg - realized_reduction_kg).max(0.0),
        completed,
    }
}
