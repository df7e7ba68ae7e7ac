use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::footprint::{CarbonFootprint, FootprintRecord, KG_PER_TONNE};
use crate::survey::SurveyAnswers;

/// SHA-256 of the canonical JSON encoding, used to tell retakes apart.
pub fn survey_hash(survey: &SurveyAnswers) -> String {
    let canonical = serde_json::to_string(survey).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn record_from_footprint(
    survey: &SurveyAnswers,
    footprint: &CarbonFootprint,
) -> FootprintRecord {
    FootprintRecord {
        recorded_at: Utc::now(),
        survey_hash: survey_hash(survey),
        total_kg: footprint.total_kg,
        breakdown: footprint.breakdown,
    }
}

/// Records are expected oldest first.
pub fn summarize_timeline(records: &[FootprintRecord]) -> String {
    let (Some(first), Some(latest)) = (records.first(), records.last()) else {
        return "No footprint history recorded.".to_string();
    };
    if records.len() == 1 {
        return format!(
            "One record: {:.2} t CO2e/year on {}",
            latest.total_kg / KG_PER_TONNE,
            latest.recorded_at.format("%Y-%m-%d")
        );
    }

    let delta = latest.total_kg - first.total_kg;
    let pct = if first.total_kg > 0.0 {
        delta / first.total_kg * 100.0
    } else {
        0.0
    };
    let direction = if delta < 0.0 {
        "down"
    } else if delta > 0.0 {
        "up"
    } else {
        "unchanged"
    };
    format!(
        "{} records since {}: {:.2} -> {:.2} t CO2e/year ({direction} {:.2} t, {pct:+.1}%)",
        records.len(),
        first.recorded_at.format("%Y-%m-%d"),
        first.total_kg / KG_PER_TONNE,
        latest.total_kg / KG_PER_TONNE,
        delta.abs() / KG_PER_TONNE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::EmissionFactors;
    use crate::footprint::calculator::compute_footprint;
    use crate::survey::DietType;

    #[test]
    fn hash_is_stable_and_changes_with_answers() {
        let survey = SurveyAnswers::sample();
        assert_eq!(survey_hash(&survey), survey_hash(&survey.clone()));
        assert_eq!(survey_hash(&survey).len(), 64);

        let mut vegan = survey.clone();
        vegan.diet_type = DietType::Vegan;
        assert_ne!(survey_hash(&survey), survey_hash(&vegan));
    }

    #[test]
    fn empty_and_single_histories() {
        assert_eq!(summarize_timeline(&[]), "No footprint history recorded.");

        let survey = SurveyAnswers::sample();
        let record =
            record_from_footprint(&survey, &compute_footprint(&survey, EmissionFactors::standard()));
        assert!(summarize_timeline(&[record]).starts_with("One record: 16.61 t"));
    }

    #[test]
    fn reports_direction_and_percentage() {
        let factors = EmissionFactors::standard();
        let survey = SurveyAnswers::sample();
        let before = record_from_footprint(&survey, &compute_footprint(&survey, factors));

        let mut improved = survey.clone();
        improved.diet_type = DietType::Vegan;
        let after = record_from_footprint(&improved, &compute_footprint(&improved, factors));

        let summary = summarize_timeline(&[before, after]);
        assert!(summary.starts_with("2 records since"));
        assert!(summary.contains("down 1.00 t"));
        assert!(summary.contains("-6.0%"));
    }
}
