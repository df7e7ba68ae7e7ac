use serde::{Deserialize, Serialize};

use crate::survey::schema::SurveyAnswers;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerChange {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

/// Lists every answer that differs between a previous survey and a retake,
/// in questionnaire order.
pub fn diff_surveys(old: &SurveyAnswers, new: &SurveyAnswers) -> Vec<AnswerChange> {
    let pairs = [
        ("home_size", old.home_size.to_string(), new.home_size.to_string()),
        ("occupants", old.occupants.to_string(), new.occupants.to_string()),
        (
            "heating_source",
            old.heating_source.to_string(),
            new.heating_source.to_string(),
        ),
        (
            "electricity_usage",
            old.electricity_usage.to_string(),
            new.electricity_usage.to_string(),
        ),
        (
            "vehicle_type",
            old.vehicle_type.to_string(),
            new.vehicle_type.to_string(),
        ),
        (
            "vehicle_miles_per_week",
            format!("{}", old.vehicle_miles_per_week),
            format!("{}", new.vehicle_miles_per_week),
        ),
        ("diet_type", old.diet_type.to_string(), new.diet_type.to_string()),
        (
            "shopping_habits",
            old.shopping_habits.to_string(),
            new.shopping_habits.to_string(),
        ),
        (
            "flights_per_year",
            old.flights_per_year.to_string(),
            new.flights_per_year.to_string(),
        ),
    ];

    pairs
        .into_iter()
        .filter(|(_, before, after)| before != after)
        .map(|(field, old_value, new_value)| AnswerChange {
            field: field.to_string(),
            old_value,
            new_value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::diff_surveys;
    use crate::survey::{DietType, SurveyAnswers, VehicleType};

    #[test]
    fn identical_surveys_have_no_changes() {
        let survey = SurveyAnswers::sample();
        assert!(diff_surveys(&survey, &survey.clone()).is_empty());
    }

    #[test]
    fn reports_changed_fields_in_order() {
        let old = SurveyAnswers::sample();
        let mut new = old.clone();
        new.diet_type = DietType::Vegetarian;
        new.vehicle_type = VehicleType::Electric;

        let changes = diff_surveys(&old, &new);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].field, "vehicle_type");
        assert_eq!(changes[0].old_value, "gas");
        assert_eq!(changes[0].new_value, "electric");
        assert_eq!(changes[1].field, "diet_type");
        assert_eq!(changes[1].new_value, "vegetarian");
    }
}
