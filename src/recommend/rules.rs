use crate::footprint::{CarbonFootprint, Category};
use crate::recommend::{ActionCategory, Difficulty, Recommendation};
use crate::survey::{
    DietType, ElectricityUsage, HeatingSource, ShoppingHabits, SurveyAnswers, VehicleType,
};

/// Offset credited for planting trees, independent of household size.
pub const TREE_PLANTING_KG: f64 = 200.0;

#[derive(Debug, Clone, Copy)]
enum Reduction {
    /// Share of one footprint category.
    Fraction(Category, f64),
    /// Absolute kg CO2e per year.
    Flat(ActionCategory, f64),
}

struct Rule {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    difficulty: Difficulty,
    applies: fn(&SurveyAnswers) -> bool,
    reduction: Reduction,
}

fn always(_: &SurveyAnswers) -> bool {
    true
}

/// Evaluated in order; the order breaks ranking ties.
const RULES: &[Rule] = &[
    Rule {
        id: "lower-thermostat",
        title: "Lower your thermostat",
        description: "Setting the thermostat 2°F lower in winter trims gas use without new equipment.",
        difficulty: Difficulty::Easy,
        applies: |s| s.heating_source == HeatingSource::NaturalGas,
        reduction: Reduction::Fraction(Category::Heating, 0.06),
    },
    Rule {
        id: "heat-pump",
        title: "Replace your furnace with a heat pump",
        description: "Heat pumps move heat instead of burning oil or propane.",
        difficulty: Difficulty::Hard,
        applies: |s| matches!(s.heating_source, HeatingSource::Oil | HeatingSource::Propane),
        reduction: Reduction::Fraction(Category::Heating, 0.50),
    },
    Rule {
        id: "cut-standby-power",
        title: "Cut standby power",
        description: "Use smart power strips and unplug idle electronics.",
        difficulty: Difficulty::Easy,
        applies: |s| s.electricity_usage == ElectricityUsage::High,
        reduction: Reduction::Fraction(Category::Electricity, 0.10),
    },
    Rule {
        id: "led-lighting",
        title: "Switch to LED lighting",
        description: "LED bulbs use a fraction of the power of incandescent bulbs.",
        difficulty: Difficulty::Easy,
        applies: |s| s.electricity_usage != ElectricityUsage::Low,
        reduction: Reduction::Fraction(Category::Electricity, 0.05),
    },
    Rule {
        id: "carpool",
        title: "Carpool to work",
        description: "Sharing rides a few days a week splits fuel emissions.",
        difficulty: Difficulty::Medium,
        applies: |s| matches!(s.vehicle_type, VehicleType::Gas | VehicleType::Diesel),
        reduction: Reduction::Fraction(Category::Transportation, 0.20),
    },
    Rule {
        id: "switch-to-ev",
        title: "Switch to an electric vehicle",
        description: "An EV charged from the grid emits far less per mile than a fuel-burning car.",
        difficulty: Difficulty::Hard,
        applies: |s| s.vehicle_type.burns_fuel(),
        reduction: Reduction::Fraction(Category::Transportation, 0.60),
    },
    Rule {
        id: "public-transit",
        title: "Take public transit",
        description: "Replace some car trips with bus, train, or bike.",
        difficulty: Difficulty::Medium,
        applies: |s| s.vehicle_type != VehicleType::None,
        reduction: Reduction::Fraction(Category::Transportation, 0.30),
    },
    Rule {
        id: "reduce-meat",
        title: "Eat less red meat",
        description: "Swap beef and lamb for poultry, fish, or plant proteins.",
        difficulty: Difficulty::Medium,
        applies: |s| s.diet_type == DietType::MeatHeavy,
        reduction: Reduction::Fraction(Category::Food, 0.25),
    },
    Rule {
        id: "meatless-days",
        title: "Try meatless days",
        description: "Two plant-based days a week make a measurable dent in food emissions.",
        difficulty: Difficulty::Easy,
        applies: |s| s.diet_type == DietType::Average,
        reduction: Reduction::Fraction(Category::Food, 0.10),
    },
    Rule {
        id: "buy-less",
        title: "Buy less, choose durable",
        description: "Fewer, longer-lasting purchases cut manufacturing and shipping emissions.",
        difficulty: Difficulty::Medium,
        applies: |s| s.shopping_habits == ShoppingHabits::Frequent,
        reduction: Reduction::Fraction(Category::Shopping, 0.30),
    },
    Rule {
        id: "secondhand-first",
        title: "Shop secondhand first",
        description: "Check used and refurbished options before buying new.",
        difficulty: Difficulty::Easy,
        applies: |s| s.shopping_habits == ShoppingHabits::Average,
        reduction: Reduction::Fraction(Category::Shopping, 0.10),
    },
    Rule {
        id: "fewer-flights",
        title: "Fly less",
        description: "Replace a round trip with rail or a video call.",
        difficulty: Difficulty::Hard,
        applies: |s| s.flights_per_year > 0,
        reduction: Reduction::Fraction(Category::Travel, 0.50),
    },
    Rule {
        id: "renewable-energy",
        title: "Switch to renewable electricity",
        description: "Choose a green tariff or install rooftop solar.",
        difficulty: Difficulty::Medium,
        applies: always,
        reduction: Reduction::Fraction(Category::Electricity, 0.80),
    },
    Rule {
        id: "smart-thermostat",
        title: "Install a smart thermostat",
        description: "Schedules and occupancy sensing avoid heating an empty home.",
        difficulty: Difficulty::Easy,
        applies: always,
        reduction: Reduction::Fraction(Category::Heating, 0.10),
    },
    Rule {
        id: "plant-trees",
        title: "Plant trees",
        description: "Support a local planting program to offset part of your emissions.",
        difficulty: Difficulty::Easy,
        applies: always,
        reduction: Reduction::Flat(ActionCategory::Offset, TREE_PLANTING_KG),
    },
];

/// Ranked reduction actions for a household, largest estimated reduction first.
///
/// Rules are gated on survey answers only: a rule whose category is empty
/// still appears, with a zero estimate.
pub fn generate_recommendations(
    footprint: &CarbonFootprint,
    survey: &SurveyAnswers,
) -> Vec<Recommendation> {
    let mut recommendations = RULES
        .iter()
        .filter(|rule| (rule.applies)(survey))
        .map(|rule| {
            let (category, estimated_reduction_kg) = match rule.reduction {
                Reduction::Fraction(category, share) => (
                    ActionCategory::from(category),
                    footprint.breakdown.get(category) * share,
                ),
                Reduction::Flat(category, kg) => (category, kg),
            };
            Recommendation {
                id: rule.id.to_string(),
                category,
                title: rule.title.to_string(),
                description: rule.description.to_string(),
                estimated_reduction_kg,
                difficulty: rule.difficulty,
            }
        })
        .collect::<Vec<_>>();

    // `sort_by` is stable, so equal estimates keep rule order.
    recommendations.sort_by(|a, b| b.estimated_reduction_kg.total_cmp(&a.estimated_reduction_kg));
    recommendations
}

/// Ids of every rule, in evaluation order.
pub fn known_action_ids() -> Vec<&'static str> {
    RULES.iter().map(|rule| rule.id).collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::factors::EmissionFactors;
    use crate::footprint::calculator::compute_footprint;

    fn recommend(survey: &SurveyAnswers) -> Vec<Recommendation> {
        let footprint = compute_footprint(survey, EmissionFactors::standard());
        generate_recommendations(&footprint, survey)
    }

    fn ids(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn sorted_descending_by_reduction() {
        let recs = recommend(&SurveyAnswers::sample());
        assert!(!recs.is_empty());
        for pair in recs.windows(2) {
            assert!(pair[0].estimated_reduction_kg >= pair[1].estimated_reduction_kg);
        }
    }

    #[test]
    fn sample_household_fires_expected_rules() {
        let survey = SurveyAnswers::sample();
        let footprint = compute_footprint(&survey, EmissionFactors::standard());
        let recs = generate_recommendations(&footprint, &survey);
        let found = ids(&recs);

        for id in [
            "lower-thermostat",
            "led-lighting",
            "carpool",
            "switch-to-ev",
            "public-transit",
            "meatless-days",
            "secondhand-first",
            "fewer-flights",
            "renewable-energy",
            "smart-thermostat",
            "plant-trees",
        ] {
            assert!(found.contains(&id), "missing {id}");
        }
        for id in ["heat-pump", "cut-standby-power", "reduce-meat", "buy-less"] {
            assert!(!found.contains(&id), "unexpected {id}");
        }

        let thermostat = recs.iter().find(|r| r.id == "lower-thermostat").unwrap();
        assert_eq!(
            thermostat.estimated_reduction_kg,
            footprint.breakdown.heating * 0.06
        );
        assert_eq!(thermostat.category, ActionCategory::Heating);
        assert_eq!(recs[0].id, "renewable-energy");
    }

    #[test]
    fn no_vehicle_drops_carpool_and_vehicle_rules() {
        let mut survey = SurveyAnswers::sample();
        survey.vehicle_type = VehicleType::None;
        let recs = recommend(&survey);
        let found = ids(&recs);
        assert!(!found.contains(&"carpool"));
        assert!(!found.contains(&"switch-to-ev"));
        assert!(!found.contains(&"public-transit"));
    }

    #[test]
    fn gating_is_on_answers_not_magnitude() {
        let mut survey = SurveyAnswers::sample();
        survey.vehicle_miles_per_week = 0.0;
        let recs = recommend(&survey);
        let carpool = recs.iter().find(|r| r.id == "carpool").expect("carpool present");
        assert_eq!(carpool.estimated_reduction_kg, 0.0);
    }

    #[test]
    fn tree_planting_is_flat_offset() {
        let mut survey = SurveyAnswers::sample();
        survey.occupants = 6;
        let recs = recommend(&survey);
        let trees = recs.iter().find(|r| r.id == "plant-trees").unwrap();
        assert_eq!(trees.estimated_reduction_kg, TREE_PLANTING_KG);
        assert_eq!(trees.category, ActionCategory::Offset);
    }

    #[test]
    fn ties_keep_rule_order() {
        let mut survey = SurveyAnswers::sample();
        survey.heating_source = HeatingSource::None;
        survey.vehicle_miles_per_week = 0.0;
        survey.flights_per_year = 0;
        let recs = recommend(&survey);
        let zeros: Vec<&str> = recs
            .iter()
            .filter(|r| r.estimated_reduction_kg == 0.0)
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(
            zeros,
            vec!["carpool", "switch-to-ev", "public-transit", "smart-thermostat"]
        );
    }

    #[test]
    fn identical_inputs_give_identical_lists() {
        let survey = SurveyAnswers::sample();
        let footprint = compute_footprint(&survey, EmissionFactors::standard());
        let first = generate_recommendations(&footprint, &survey);
        let second = generate_recommendations(&footprint, &survey);
        assert_eq!(first, second);
    }

    #[test]
    fn category_filter_matches_parsed_category() {
        let recs = recommend(&SurveyAnswers::sample());
        let transport = Category::from_str("transport").unwrap();
        let filtered = recs
            .iter()
            .filter(|rec| rec.targets(transport))
            .map(|rec| rec.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(filtered, vec!["switch-to-ev", "public-transit", "carpool"]);
        let trees = recs.iter().find(|rec| rec.id == "plant-trees").unwrap();
        assert!(Category::ALL.iter().all(|category| !trees.targets(*category)));
        assert!(Category::from_str("gadgets").is_err());
    }

    #[test]
    fn known_ids_are_unique() {
        let mut all = known_action_ids();
        let count = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), count);
    }
}
