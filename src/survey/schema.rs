use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SurveyError {
    #[error("unknown {field} value: {value}")]
    UnknownValue { field: &'static str, value: String },
    #[error("household must have at least one occupant")]
    NoOccupants,
    #[error(
        "vehicle miles per week must be between 0 and {max}, got {0}",
        max = MAX_MILES_PER_WEEK
    )]
    InvalidMiles(f64),
}

/// Upper bound on weekly driving, roughly 24 hours a day at highway speed.
pub const MAX_MILES_PER_WEEK: f64 = 10_000.0;

fn unknown(field: &'static str, value: &str) -> SurveyError {
    SurveyError::UnknownValue {
        field,
        value: value.to_string(),
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('_', "-")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum HomeSize {
    Small,
    Medium,
    Large,
    VeryLarge,
}

impl HomeSize {
    pub const ALL: [HomeSize; 4] = [Self::Small, Self::Medium, Self::Large, Self::VeryLarge];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::VeryLarge => "very-large",
        }
    }
}

impl FromStr for HomeSize {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            "very-large" | "verylarge" | "xl" => Ok(Self::VeryLarge),
            _ => Err(unknown("home size", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum HeatingSource {
    NaturalGas,
    Electric,
    Oil,
    Propane,
    None,
}

impl HeatingSource {
    pub const ALL: [HeatingSource; 5] = [
        Self::NaturalGas,
        Self::Electric,
        Self::Oil,
        Self::Propane,
        Self::None,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::NaturalGas => "natural-gas",
            Self::Electric => "electric",
            Self::Oil => "oil",
            Self::Propane => "propane",
            Self::None => "none",
        }
    }
}

impl FromStr for HeatingSource {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "natural-gas" | "gas" => Ok(Self::NaturalGas),
            "electric" | "electricity" => Ok(Self::Electric),
            "oil" | "heating-oil" => Ok(Self::Oil),
            "propane" => Ok(Self::Propane),
            "none" => Ok(Self::None),
            _ => Err(unknown("heating source", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum ElectricityUsage {
    Low,
    Average,
    High,
}

impl ElectricityUsage {
    pub const ALL: [ElectricityUsage; 3] = [Self::Low, Self::Average, Self::High];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Average => "average",
            Self::High => "high",
        }
    }
}

impl FromStr for ElectricityUsage {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "low" => Ok(Self::Low),
            "average" | "avg" => Ok(Self::Average),
            "high" => Ok(Self::High),
            _ => Err(unknown("electricity usage", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleType {
    Gas,
    Diesel,
    Hybrid,
    Electric,
    None,
}

impl VehicleType {
    pub const ALL: [VehicleType; 5] = [
        Self::Gas,
        Self::Diesel,
        Self::Hybrid,
        Self::Electric,
        Self::None,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Gas => "gas",
            Self::Diesel => "diesel",
            Self::Hybrid => "hybrid",
            Self::Electric => "electric",
            Self::None => "none",
        }
    }

    pub fn burns_fuel(&self) -> bool {
        matches!(self, Self::Gas | Self::Diesel | Self::Hybrid)
    }
}

impl FromStr for VehicleType {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "gas" | "gasoline" | "petrol" => Ok(Self::Gas),
            "diesel" => Ok(Self::Diesel),
            "hybrid" => Ok(Self::Hybrid),
            "electric" | "ev" => Ok(Self::Electric),
            "none" => Ok(Self::None),
            _ => Err(unknown("vehicle type", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum DietType {
    MeatHeavy,
    Average,
    Vegetarian,
    Vegan,
}

impl DietType {
    pub const ALL: [DietType; 4] = [
        Self::MeatHeavy,
        Self::Average,
        Self::Vegetarian,
        Self::Vegan,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::MeatHeavy => "meat-heavy",
            Self::Average => "average",
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
        }
    }
}

impl FromStr for DietType {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "meat-heavy" | "meatheavy" => Ok(Self::MeatHeavy),
            "average" | "avg" => Ok(Self::Average),
            "vegetarian" => Ok(Self::Vegetarian),
            "vegan" => Ok(Self::Vegan),
            _ => Err(unknown("diet type", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum ShoppingHabits {
    Minimal,
    Average,
    Frequent,
}

impl ShoppingHabits {
    pub const ALL: [ShoppingHabits; 3] = [Self::Minimal, Self::Average, Self::Frequent];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Average => "average",
            Self::Frequent => "frequent",
        }
    }
}

impl FromStr for ShoppingHabits {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "minimal" => Ok(Self::Minimal),
            "average" | "avg" => Ok(Self::Average),
            "frequent" => Ok(Self::Frequent),
            _ => Err(unknown("shopping habits", s)),
        }
    }
}

macro_rules! display_as_slug {
    ($($ty:ty),+) => {
        $(
            impl Display for $ty {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_slug())
                }
            }
        )+
    };
}

display_as_slug!(
    HomeSize,
    HeatingSource,
    ElectricityUsage,
    VehicleType,
    DietType,
    ShoppingHabits
);

/// One completed lifestyle survey. Answers are the source of truth; every
/// footprint is re-derived from them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurveyAnswers {
    pub home_size: HomeSize,
    pub occupants: u32,
    pub heating_source: HeatingSource,
    pub electricity_usage: ElectricityUsage,
    pub vehicle_type: VehicleType,
    pub vehicle_miles_per_week: f64,
    pub diet_type: DietType,
    pub shopping_habits: ShoppingHabits,
    pub flights_per_year: u32,
}

impl SurveyAnswers {
    /// A two-person, middle-of-the-road household.
    pub fn sample() -> Self {
        Self {
            home_size: HomeSize::Medium,
            occupants: 2,
            heating_source: HeatingSource::NaturalGas,
            electricity_usage: ElectricityUsage::Average,
            vehicle_type: VehicleType::Gas,
            vehicle_miles_per_week: 100.0,
            diet_type: DietType::Average,
            shopping_habits: ShoppingHabits::Average,
            flights_per_year: 2,
        }
    }

    pub fn validate(&self) -> Result<(), SurveyError> {
        if self.occupants == 0 {
            return Err(SurveyError::NoOccupants);
        }
        if !(0.0..=MAX_MILES_PER_WEEK).contains(&self.vehicle_miles_per_week) {
            return Err(SurveyError::InvalidMiles(self.vehicle_miles_per_week));
        }
        Ok(())
    }

    pub fn apply(&mut self, change: &SurveyChange) -> bool {
        match change {
            SurveyChange::HomeSize(v) => replace(&mut self.home_size, *v),
            SurveyChange::Occupants(v) => replace(&mut self.occupants, *v),
            SurveyChange::HeatingSource(v) => replace(&mut self.heating_source, *v),
            SurveyChange::ElectricityUsage(v) => replace(&mut self.electricity_usage, *v),
            SurveyChange::VehicleType(v) => replace(&mut self.vehicle_type, *v),
            SurveyChange::VehicleMilesPerWeek(v) => {
                replace(&mut self.vehicle_miles_per_week, *v)
            }
            SurveyChange::DietType(v) => replace(&mut self.diet_type, *v),
            SurveyChange::ShoppingHabits(v) => replace(&mut self.shopping_habits, *v),
            SurveyChange::FlightsPerYear(v) => replace(&mut self.flights_per_year, *v),
        }
    }
}

fn replace<T: PartialEq + Copy>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// A single answer edit, used by what-if simulations and partial updates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum SurveyChange {
    HomeSize(HomeSize),
    Occupants(u32),
    HeatingSource(HeatingSource),
    ElectricityUsage(ElectricityUsage),
    VehicleType(VehicleType),
    VehicleMilesPerWeek(f64),
    DietType(DietType),
    ShoppingHabits(ShoppingHabits),
    FlightsPerYear(u32),
}

impl SurveyChange {
    pub fn field(&self) -> &'static str {
        match self {
            Self::HomeSize(_) => "home_size",
            Self::Occupants(_) => "occupants",
            Self::HeatingSource(_) => "heating_source",
            Self::ElectricityUsage(_) => "electricity_usage",
            Self::VehicleType(_) => "vehicle_type",
            Self::VehicleMilesPerWeek(_) => "vehicle_miles_per_week",
            Self::DietType(_) => "diet_type",
            Self::ShoppingHabits(_) => "shopping_habits",
            Self::FlightsPerYear(_) => "flights_per_year",
        }
    }

    pub fn value_label(&self) -> String {
        match self {
            Self::HomeSize(v) => v.to_string(),
            Self::Occupants(v) => v.to_string(),
            Self::HeatingSource(v) => v.to_string(),
            Self::ElectricityUsage(v) => v.to_string(),
            Self::VehicleType(v) => v.to_string(),
            Self::VehicleMilesPerWeek(v) => format!("{v}"),
            Self::DietType(v) => v.to_string(),
            Self::ShoppingHabits(v) => v.to_string(),
            Self::FlightsPerYear(v) => v.to_string(),
        }
    }
}
