use crate::factors::EmissionFactors;
use crate::footprint::calculator::compute_footprint_with_devices;
use crate::footprint::devices::DeviceContribution;
use crate::footprint::Category;
use crate::recommend::{CategoryDelta, WhatIfResult};
use crate::survey::{diff_surveys, SurveyAnswers, SurveyChange, SurveyError};

/// Footprint before and after applying `changes` to a copy of `survey`.
pub fn simulate_whatif(
    survey: &SurveyAnswers,
    factors: &EmissionFactors,
    devices: &[DeviceContribution],
    changes: &[SurveyChange],
) -> Result<WhatIfResult, SurveyError> {
    let mut changed = survey.clone();
    for change in changes {
        changed.apply(change);
    }
    changed.validate()?;

    let before = compute_footprint_with_devices(survey, factors, devices);
    let after = compute_footprint_with_devices(&changed, factors, devices);
    let category_deltas = Category::ALL
        .into_iter()
        .map(|category| {
            let before_kg = before.breakdown.get(category);
            let after_kg = after.breakdown.get(category);
            CategoryDelta {
                category,
                before_kg,
                after_kg,
                delta_kg: after_kg - before_kg,
            }
        })
        .collect();

    Ok(WhatIfResult {
        changes_requested: changes.to_vec(),
        changes_applied: diff_surveys(survey, &changed),
        net_change_kg: after.total_kg - before.total_kg,
        before,
        after,
        category_deltas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::{DietType, HeatingSource, VehicleType};

    #[test]
    fn going_vegan_only_moves_food() {
        let survey = SurveyAnswers::sample();
        let result = simulate_whatif(
            &survey,
            EmissionFactors::standard(),
            &[],
            &[SurveyChange::DietType(DietType::Vegan)],
        )
        .unwrap();

        assert_eq!(result.changes_applied.len(), 1);
        assert!((result.net_change_kg + 1000.0).abs() < 1e-9);
        for delta in &result.category_deltas {
            if delta.category == Category::Food {
                assert_eq!(delta.delta_kg, -1000.0);
            } else {
                assert_eq!(delta.delta_kg, 0.0);
            }
        }
    }

    #[test]
    fn no_op_changes_are_not_reported_as_applied() {
        let survey = SurveyAnswers::sample();
        let result = simulate_whatif(
            &survey,
            EmissionFactors::standard(),
            &[],
            &[SurveyChange::Occupants(2)],
        )
        .unwrap();
        assert!(result.changes_applied.is_empty());
        assert_eq!(result.changes_requested.len(), 1);
        assert_eq!(result.net_change_kg, 0.0);
    }

    #[test]
    fn combined_changes_sum_in_net_change() {
        let survey = SurveyAnswers::sample();
        let result = simulate_whatif(
            &survey,
            EmissionFactors::standard(),
            &[],
            &[
                SurveyChange::HeatingSource(HeatingSource::Electric),
                SurveyChange::VehicleType(VehicleType::Electric),
            ],
        )
        .unwrap();
        let summed: f64 = result.category_deltas.iter().map(|d| d.delta_kg).sum();
        assert!((summed - result.net_change_kg).abs() < 1e-9);
        assert_eq!(result.after.breakdown.heating, 0.0);
        assert!(result.net_change_kg < 0.0);
    }

    #[test]
    fn invalid_change_is_rejected() {
        let err = simulate_whatif(
            &SurveyAnswers::sample(),
            EmissionFactors::standard(),
            &[],
            &[SurveyChange::Occupants(0)],
        )
        .unwrap_err();
        assert_eq!(err, SurveyError::NoOccupants);
    }
}
