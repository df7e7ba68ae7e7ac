pub mod differ;
pub mod schema;

pub use differ::{diff_surveys, AnswerChange};
pub use schema::{
    DietType, ElectricityUsage, HeatingSource, HomeSize, ShoppingHabits, SurveyAnswers,
    SurveyChange, SurveyError, VehicleType,
};
