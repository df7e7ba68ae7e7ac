pub mod config;
pub mod factors;
pub mod footprint;
pub mod output;
pub mod profile;
pub mod recommend;
pub mod server;
pub mod survey;

pub use factors::EmissionFactors;
pub use footprint::calculator::{compute_footprint, compute_footprint_with_devices};
pub use footprint::{Breakdown, CarbonFootprint, Category};
pub use recommend::rules::generate_recommendations;
pub use recommend::{Difficulty, Recommendation};
pub use survey::SurveyAnswers;
