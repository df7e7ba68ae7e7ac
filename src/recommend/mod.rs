pub mod progress;
pub mod rules;
pub mod whatif;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::footprint::{Category, CarbonFootprint};
use crate::survey::{AnswerChange, SurveyChange};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        };
        f.write_str(label)
    }
}

/// Where an action's reduction lands: a footprint category, or an external offset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Heating,
    Electricity,
    Transportation,
    Food,
    Shopping,
    Travel,
    Offset,
}

impl From<Category> for ActionCategory {
    fn from(value: Category) -> Self {
        match value {
            Category::Heating => Self::Heating,
            Category::Electricity => Self::Electricity,
            Category::Transportation => Self::Transportation,
            Category::Food => Self::Food,
            Category::Shopping => Self::Shopping,
            Category::Travel => Self::Travel,
        }
    }
}

impl ActionCategory {
    pub fn footprint_category(&self) -> Option<Category> {
        match self {
            Self::Heating => Some(Category::Heating),
            Self::Electricity => Some(Category::Electricity),
            Self::Transportation => Some(Category::Transportation),
            Self::Food => Some(Category::Food),
            Self::Shopping => Some(Category::Shopping),
            Self::Travel => Some(Category::Travel),
            Self::Offset => None,
        }
    }
}

impl Display for ActionCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.footprint_category() {
            Some(category) => write!(f, "{category}"),
            None => f.write_str("Offset"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub id: String,
    pub category: ActionCategory,
    pub title: String,
    pub description: String,
    /// Annual kg CO2e, same unit as the footprint breakdown.
    pub estimated_reduction_kg: f64,
    pub difficulty: Difficulty,
}

impl Recommendation {
    /// Whether the action cuts the given footprint category. Offsets target none.
    pub fn targets(&self, category: Category) -> bool {
        self.category.footprint_category() == Some(category)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionProgress {
    pub completed: Vec<Recommendation>,
    pub pending_count: usize,
    pub realized_reduction_kg: f64,
    pub baseline_total_kg: f64,
    pub projected_total_kg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDelta {
    pub category: Category,
    pub before_kg: f64,
    pub after_kg: f64,
    pub delta_kg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfResult {
    pub changes_requested: Vec<SurveyChange>,
    pub changes_applied: Vec<AnswerChange>,
    pub before: CarbonFootprint,
    pub after: CarbonFootprint,
    pub category_deltas: Vec<CategoryDelta>,
    pub net_change_kg: f64,
}
