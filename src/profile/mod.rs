pub mod migrations;
pub mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::factors::EmissionFactors;
use crate::footprint::calculator::compute_footprint_with_devices;
use crate::footprint::history::record_from_footprint;
use crate::footprint::devices::{active_contributions, Device, DeviceError};
use crate::footprint::CarbonFootprint;
use crate::profile::store::ProfileStore;
use crate::recommend::progress::{pending_recommendations, summarize_progress};
use crate::recommend::rules::generate_recommendations;
use crate::recommend::{ActionProgress, Recommendation};
use crate::survey::{diff_surveys, AnswerChange, SurveyAnswers, SurveyError};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("no survey answers recorded; complete the survey first")]
    MissingSurvey,
    #[error("stored survey is invalid: {0}")]
    Survey(#[from] SurveyError),
    #[error("stored device is invalid: {0}")]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Everything the engine needs from persistence, read in one pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub survey: Option<SurveyAnswers>,
    pub completed_action_ids: Vec<String>,
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileEvaluation {
    pub survey: SurveyAnswers,
    pub footprint: CarbonFootprint,
    pub recommendations: Vec<Recommendation>,
    pub pending: Vec<Recommendation>,
    pub progress: ActionProgress,
}

impl ProfileSnapshot {
    pub fn load(store: &ProfileStore) -> Result<Self, ProfileError> {
        Ok(Self {
            survey: store.load_survey()?,
            completed_action_ids: store.load_completed_action_ids()?,
            devices: store.load_devices()?,
        })
    }

    pub fn active_devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(|d| d.active)
    }

    /// Recomputes footprint, ranked actions and progress from scratch.
    pub fn evaluate(&self, factors: &EmissionFactors) -> Result<ProfileEvaluation, ProfileError> {
        let survey = self.survey.as_ref().ok_or(ProfileError::MissingSurvey)?;
        survey.validate()?;
        for device in &self.devices {
            device.validate()?;
        }

        let contributions = active_contributions(&self.devices);
        let footprint = compute_footprint_with_devices(survey, factors, &contributions);
        let recommendations = generate_recommendations(&footprint, survey);
        let pending = pending_recommendations(&recommendations, &self.completed_action_ids);
        let progress = summarize_progress(&footprint, &recommendations, &self.completed_action_ids);

        Ok(ProfileEvaluation {
            survey: survey.clone(),
            footprint,
            recommendations,
            pending,
            progress,
        })
    }
}

/// Outcome of recording a survey against the stored profile.
#[derive(Debug, Clone, PartialEq)]
pub enum SurveyUpdate {
    Created,
    Changed(Vec<AnswerChange>),
    Unchanged,
}

/// Stores a completed or retaken survey and appends its footprint to history.
/// A retake with identical answers leaves both untouched.
pub fn record_survey(
    store: &ProfileStore,
    survey: &SurveyAnswers,
    factors: &EmissionFactors,
) -> Result<SurveyUpdate, ProfileError> {
    survey.validate()?;
    let update = match store.load_survey()? {
        None => SurveyUpdate::Created,
        Some(previous) => {
            let changes = diff_surveys(&previous, survey);
            if changes.is_empty() {
                return Ok(SurveyUpdate::Unchanged);
            }
            SurveyUpdate::Changed(changes)
        }
    };

    store.save_survey(survey)?;
    let devices = active_contributions(&store.load_active_devices()?);
    let footprint = compute_footprint_with_devices(survey, factors, &devices);
    store.insert_footprint_record(&record_from_footprint(survey, &footprint))?;
    debug!("recorded survey; footprint {:.1} kg", footprint.total_kg);
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::calculator::compute_footprint;
    use crate::footprint::devices::DeviceCategory;

    #[test]
    fn evaluating_without_survey_is_an_error() {
        let snapshot = ProfileSnapshot::default();
        let err = snapshot.evaluate(EmissionFactors::standard()).unwrap_err();
        assert!(matches!(err, ProfileError::MissingSurvey));
    }

    #[test]
    fn invalid_stored_survey_is_reported() {
        let mut survey = SurveyAnswers::sample();
        survey.occupants = 0;
        let snapshot = ProfileSnapshot {
            survey: Some(survey),
            ..ProfileSnapshot::default()
        };
        let err = snapshot.evaluate(EmissionFactors::standard()).unwrap_err();
        assert!(matches!(err, ProfileError::Survey(SurveyError::NoOccupants)));
    }

    #[test]
    fn record_survey_skips_unchanged_retakes() {
        let store = ProfileStore::open_in_memory().unwrap();
        let factors = EmissionFactors::standard();
        let mut survey = SurveyAnswers::sample();

        assert_eq!(
            record_survey(&store, &survey, factors).unwrap(),
            SurveyUpdate::Created
        );
        assert_eq!(
            record_survey(&store, &survey, factors).unwrap(),
            SurveyUpdate::Unchanged
        );
        assert_eq!(store.load_history(10).unwrap().len(), 1);

        survey.flights_per_year = 0;
        let SurveyUpdate::Changed(changes) = record_survey(&store, &survey, factors).unwrap()
        else {
            panic!("expected a changed survey");
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "flights_per_year");
        assert_eq!(store.load_history(10).unwrap().len(), 2);
        assert_eq!(store.load_survey().unwrap(), Some(survey));
    }

    #[test]
    fn record_survey_rejects_invalid_answers() {
        let store = ProfileStore::open_in_memory().unwrap();
        let mut survey = SurveyAnswers::sample();
        survey.vehicle_miles_per_week = 1e307;
        let err = record_survey(&store, &survey, EmissionFactors::standard()).unwrap_err();
        assert!(matches!(err, ProfileError::Survey(SurveyError::InvalidMiles(_))));
        assert_eq!(store.load_survey().unwrap(), None);
    }

    #[test]
    fn evaluation_folds_active_devices_and_completed_actions() {
        let store = ProfileStore::open_in_memory().unwrap();
        let survey = SurveyAnswers::sample();
        store.save_survey(&survey).unwrap();
        store.complete_action("plant-trees").unwrap();
        let mut idle = Device::new("dryer", "Dryer", DeviceCategory::Electricity, 1.0, 3.0);
        idle.active = false;
        store.upsert_device(&idle).unwrap();
        store
            .upsert_device(&Device::new(
                "heater",
                "Heater",
                DeviceCategory::Electricity,
                2.0,
                1.0,
            ))
            .unwrap();

        let snapshot = ProfileSnapshot::load(&store).unwrap();
        assert_eq!(snapshot.active_devices().count(), 1);
        let evaluation = snapshot.evaluate(EmissionFactors::standard()).unwrap();

        let base = compute_footprint(&survey, EmissionFactors::standard());
        assert_eq!(
            evaluation.footprint.breakdown.electricity,
            base.breakdown.electricity + 365.0
        );
        assert_eq!(evaluation.pending.len(), evaluation.recommendations.len() - 1);
        assert_eq!(evaluation.progress.realized_reduction_kg, 200.0);
    }
}
