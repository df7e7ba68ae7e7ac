use crate::factors::EmissionFactors;
use crate::footprint::devices::DeviceContribution;
use crate::footprint::{Breakdown, CarbonFootprint};
use crate::survey::{HeatingSource, SurveyAnswers, VehicleType};

pub const WEEKS_PER_YEAR: f64 = 52.0;

pub fn compute_footprint(survey: &SurveyAnswers, factors: &EmissionFactors) -> CarbonFootprint {
    compute_footprint_with_devices(survey, factors, &[])
}

/// Survey-driven estimate with active device contributions added to their
/// categories afterwards.
pub fn compute_footprint_with_devices(
    survey: &SurveyAnswers,
    factors: &EmissionFactors,
    devices: &[DeviceContribution],
) -> CarbonFootprint {
    let mut breakdown = Breakdown {
        heating: heating_kg(survey, factors),
        electricity: electricity_kg(survey, factors),
        transportation: transportation_kg(survey, factors),
        food: food_kg(survey, factors),
        shopping: shopping_kg(survey, factors),
        travel: travel_kg(survey, factors),
    };

    for device in devices {
        *breakdown.get_mut(device.category.into()) += device.annual_kg.max(0.0);
    }

    CarbonFootprint::from_breakdown(breakdown)
}

pub fn heating_kg(survey: &SurveyAnswers, factors: &EmissionFactors) -> f64 {
    let heating = &factors.heating;
    match survey.heating_source {
        HeatingSource::NaturalGas => {
            let therms = heating.natural_gas.annual_usage.lookup(survey.home_size);
            therms * heating.scf_per_therm * heating.natural_gas.kg_co2_per_unit
        }
        HeatingSource::Oil => {
            heating.heating_oil.annual_usage.lookup(survey.home_size)
                * heating.heating_oil.kg_co2_per_unit
        }
        HeatingSource::Propane => {
            heating.propane.annual_usage.lookup(survey.home_size)
                * heating.propane.kg_co2_per_unit
        }
        // Electric heating is already part of household electricity.
        HeatingSource::Electric | HeatingSource::None => 0.0,
    }
}

/// Tier kWh are for a reference household and scale linearly with occupants.
pub fn electricity_kg(survey: &SurveyAnswers, factors: &EmissionFactors) -> f64 {
    let electricity = &factors.electricity;
    let base_kwh = electricity.annual_kwh.lookup(survey.electricity_usage);
    let scaled_kwh = base_kwh * (f64::from(survey.occupants) / electricity.reference_occupants);
    scaled_kwh * electricity.kg_co2_per_kwh
}

pub fn transportation_kg(survey: &SurveyAnswers, factors: &EmissionFactors) -> f64 {
    let miles_per_week = survey.vehicle_miles_per_week.max(0.0);
    if survey.vehicle_type == VehicleType::None || miles_per_week == 0.0 {
        return 0.0;
    }
    let annual_miles = miles_per_week * WEEKS_PER_YEAR;
    let vehicles = &factors.vehicles;

    let combustion = match survey.vehicle_type {
        VehicleType::Gas => vehicles.gas,
        VehicleType::Diesel => vehicles.diesel,
        VehicleType::Hybrid => vehicles.hybrid,
        VehicleType::Electric => {
            let kwh = (annual_miles / 100.0) * vehicles.electric.kwh_per_100_miles;
            return kwh * factors.electricity.kg_co2_per_kwh;
        }
        VehicleType::None => return 0.0,
    };
    let gallons = annual_miles / combustion.miles_per_gallon;
    gallons * combustion.kg_co2_per_gallon
}

pub fn food_kg(survey: &SurveyAnswers, factors: &EmissionFactors) -> f64 {
    factors.diet_kg_per_occupant.lookup(survey.diet_type) * f64::from(survey.occupants)
}

pub fn shopping_kg(survey: &SurveyAnswers, factors: &EmissionFactors) -> f64 {
    factors.shopping_kg_per_occupant.lookup(survey.shopping_habits) * f64::from(survey.occupants)
}

pub fn travel_kg(survey: &SurveyAnswers, factors: &EmissionFactors) -> f64 {
    f64::from(survey.flights_per_year) * factors.kg_per_flight
}
