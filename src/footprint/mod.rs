pub mod calculator;
pub mod devices;
pub mod history;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DAYS_PER_YEAR: f64 = 365.0;
pub const KG_PER_TONNE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Heating,
    Electricity,
    Transportation,
    Food,
    Shopping,
    Travel,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Heating,
        Category::Electricity,
        Category::Transportation,
        Category::Food,
        Category::Shopping,
        Category::Travel,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Heating => "heating",
            Self::Electricity => "electricity",
            Self::Transportation => "transportation",
            Self::Food => "food",
            Self::Shopping => "shopping",
            Self::Travel => "travel",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Heating => "Heating",
            Self::Electricity => "Electricity",
            Self::Transportation => "Transportation",
            Self::Food => "Food",
            Self::Shopping => "Shopping",
            Self::Travel => "Travel",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error)]
#[error("unknown footprint category: {0}")]
pub struct CategoryParseError(pub String);

impl FromStr for Category {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heating" => Ok(Self::Heating),
            "electricity" | "power" => Ok(Self::Electricity),
            "transportation" | "transport" => Ok(Self::Transportation),
            "food" => Ok(Self::Food),
            "shopping" => Ok(Self::Shopping),
            "travel" | "flights" => Ok(Self::Travel),
            _ => Err(CategoryParseError(s.to_string())),
        }
    }
}

/// Annual kg CO2e per category.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Breakdown {
    pub heating: f64,
    pub electricity: f64,
    pub transportation: f64,
    pub food: f64,
    pub shopping: f64,
    pub travel: f64,
}

impl Breakdown {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Heating => self.heating,
            Category::Electricity => self.electricity,
            Category::Transportation => self.transportation,
            Category::Food => self.food,
            Category::Shopping => self.shopping,
            Category::Travel => self.travel,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut f64 {
        match category {
            Category::Heating => &mut self.heating,
            Category::Electricity => &mut self.electricity,
            Category::Transportation => &mut self.transportation,
            Category::Food => &mut self.food,
            Category::Shopping => &mut self.shopping,
            Category::Travel => &mut self.travel,
        }
    }

    /// Values in `Category::ALL` order.
    pub fn values(&self) -> [f64; 6] {
        Category::ALL.map(|category| self.get(category))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::ALL
            .into_iter()
            .map(move |category| (category, self.get(category)))
    }

    pub fn total(&self) -> f64 {
        self.values().iter().sum()
    }

    /// Category with the largest share; the earliest category wins ties.
    pub fn largest(&self) -> (Category, f64) {
        self.iter()
            .fold((Category::Heating, f64::NEG_INFINITY), |best, item| {
                if item.1 > best.1 {
                    item
                } else {
                    best
                }
            })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CarbonFootprint {
    pub breakdown: Breakdown,
    pub total_kg: f64,
    pub daily_kg: f64,
}

impl CarbonFootprint {
    pub fn from_breakdown(breakdown: Breakdown) -> Self {
        let total_kg = breakdown.total();
        Self {
            breakdown,
            total_kg,
            daily_kg: total_kg / DAYS_PER_YEAR,
        }
    }

    pub fn total_tonnes(&self) -> f64 {
        self.total_kg / KG_PER_TONNE
    }

    /// Fraction of the total attributed to `category`, zero for an empty footprint.
    pub fn share(&self, category: Category) -> f64 {
        if self.total_kg > 0.0 {
            self.breakdown.get(category) / self.total_kg
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FootprintRecord {
    pub recorded_at: DateTime<Utc>,
    pub survey_hash: String,
    pub total_kg: f64,
    pub breakdown: Breakdown,
}
