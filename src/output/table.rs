use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::config::MassUnit;
use crate::footprint::devices::Device;
use crate::footprint::{CarbonFootprint, FootprintRecord};
use crate::recommend::{ActionProgress, Difficulty, Recommendation, WhatIfResult};
use crate::survey::{AnswerChange, SurveyAnswers};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn render_footprint_table(footprint: &CarbonFootprint, unit: MassUnit) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Category".to_string(),
        format!("Annual ({})", unit.label()),
        "Share".to_string(),
    ]);

    let (largest, _) = footprint.breakdown.largest();
    for (category, kg) in footprint.breakdown.iter() {
        let name = if category == largest && kg > 0.0 {
            Cell::new(category.to_string()).fg(Color::Yellow)
        } else {
            Cell::new(category.to_string())
        };
        table.add_row(Row::from(vec![
            name,
            Cell::new(unit.format(kg)),
            Cell::new(format!("{:.1}%", footprint.share(category) * 100.0)),
        ]));
    }
    table.add_row(vec![
        "Total".to_string(),
        unit.format(footprint.total_kg),
        "100.0%".to_string(),
    ]);

    format!(
        "{table}\nDaily average: {:.1} kg CO2e",
        footprint.daily_kg
    )
}

pub fn render_recommendations_table(items: &[Recommendation], unit: MassUnit) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Rank".to_string(),
        "Action".to_string(),
        "Category".to_string(),
        format!("Est. Reduction ({})", unit.label()),
        "Difficulty".to_string(),
        "Id".to_string(),
    ]);
    for (idx, item) in items.iter().enumerate() {
        let difficulty = match item.difficulty {
            Difficulty::Easy => Cell::new("EASY").fg(Color::Green),
            Difficulty::Medium => Cell::new("MEDIUM").fg(Color::Yellow),
            Difficulty::Hard => Cell::new("HARD").fg(Color::Red),
        };
        table.add_row(Row::from(vec![
            Cell::new((idx + 1).to_string()),
            Cell::new(&item.title),
            Cell::new(item.category.to_string()),
            Cell::new(unit.format(item.estimated_reduction_kg)),
            difficulty,
            Cell::new(&item.id),
        ]));
    }
    table.to_string()
}

pub fn render_progress_summary(progress: &ActionProgress, unit: MassUnit) -> String {
    format!(
        "Completed actions: {} ({} pending)\nRealized reduction: {} {}\nProjected footprint: {} {} (baseline {})",
        progress.completed.len(),
        progress.pending_count,
        unit.format(progress.realized_reduction_kg),
        unit.label(),
        unit.format(progress.projected_total_kg),
        unit.label(),
        unit.format(progress.baseline_total_kg),
    )
}

pub fn render_whatif_table(result: &WhatIfResult, unit: MassUnit) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Category".to_string(),
        format!("Before ({})", unit.label()),
        "After".to_string(),
        "Change".to_string(),
    ]);
    for delta in &result.category_deltas {
        let change = Cell::new(signed(unit, delta.delta_kg));
        let change = if delta.delta_kg < 0.0 {
            change.fg(Color::Green)
        } else if delta.delta_kg > 0.0 {
            change.fg(Color::Red)
        } else {
            change
        };
        table.add_row(Row::from(vec![
            Cell::new(delta.category.to_string()),
            Cell::new(unit.format(delta.before_kg)),
            Cell::new(unit.format(delta.after_kg)),
            change,
        ]));
    }

    let applied = if result.changes_applied.is_empty() {
        "none (answers already match)".to_string()
    } else {
        result
            .changes_applied
            .iter()
            .map(|c| format!("{}: {} -> {}", c.field, c.old_value, c.new_value))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "{table}\nChanges applied: {applied}\nNet change: {} {} ({} -> {})",
        signed(unit, result.net_change_kg),
        unit.label(),
        unit.format(result.before.total_kg),
        unit.format(result.after.total_kg),
    )
}

pub fn render_history_table(records: &[FootprintRecord], unit: MassUnit) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Recorded At".to_string(),
        format!("Total ({})", unit.label()),
        "Largest Category".to_string(),
        "Survey".to_string(),
    ]);
    for rec in records {
        let (largest, _) = rec.breakdown.largest();
        table.add_row(vec![
            rec.recorded_at.format("%Y-%m-%d %H:%M").to_string(),
            unit.format(rec.total_kg),
            largest.to_string(),
            rec.survey_hash.chars().take(8).collect::<String>(),
        ]);
    }
    table.to_string()
}

pub fn render_devices_table(devices: &[Device], unit: MassUnit) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Id".to_string(),
        "Name".to_string(),
        "Category".to_string(),
        "Hours/Day".to_string(),
        "kg/Day".to_string(),
        format!("Annual ({})", unit.label()),
        "Active".to_string(),
    ]);
    for device in devices {
        let active = if device.active {
            Cell::new("ON").fg(Color::Green)
        } else {
            Cell::new("OFF").fg(Color::DarkGrey)
        };
        table.add_row(Row::from(vec![
            Cell::new(&device.id),
            Cell::new(&device.name),
            Cell::new(device.category.to_string()),
            Cell::new(format!("{:.1}", device.hours_per_day)),
            Cell::new(format!("{:.2}", device.kg_co2e_per_day)),
            Cell::new(unit.format(device.annual_kg())),
            active,
        ]));
    }
    table.to_string()
}

pub fn render_survey_table(survey: &SurveyAnswers) -> String {
    let mut table = new_table();
    table.set_header(vec!["Question", "Answer"]);
    let rows = [
        ("Home size", survey.home_size.to_string()),
        ("Occupants", survey.occupants.to_string()),
        ("Heating source", survey.heating_source.to_string()),
        ("Electricity usage", survey.electricity_usage.to_string()),
        ("Vehicle", survey.vehicle_type.to_string()),
        ("Miles per week", format!("{}", survey.vehicle_miles_per_week)),
        ("Diet", survey.diet_type.to_string()),
        ("Shopping", survey.shopping_habits.to_string()),
        ("Flights per year", survey.flights_per_year.to_string()),
    ];
    for (question, answer) in rows {
        table.add_row(vec![question.to_string(), answer]);
    }
    table.to_string()
}

pub fn render_answer_changes(changes: &[AnswerChange]) -> String {
    if changes.is_empty() {
        return "No answers changed.".to_string();
    }
    let mut table = new_table();
    table.set_header(vec!["Answer", "Before", "After"]);
    for change in changes {
        table.add_row(vec![
            change.field.clone(),
            change.old_value.clone(),
            change.new_value.clone(),
        ]);
    }
    table.to_string()
}

fn signed(unit: MassUnit, kg: f64) -> String {
    let formatted = unit.format(kg.abs());
    if kg < 0.0 {
        format!("-{formatted}")
    } else {
        format!("+{formatted}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::EmissionFactors;
    use crate::footprint::calculator::compute_footprint;
    use crate::recommend::whatif::simulate_whatif;
    use crate::survey::{DietType, SurveyChange};

    #[test]
    fn footprint_table_lists_every_category_and_total() {
        let footprint = compute_footprint(&SurveyAnswers::sample(), EmissionFactors::standard());
        let rendered = render_footprint_table(&footprint, MassUnit::Tonnes);
        for name in ["Heating", "Electricity", "Transportation", "Food", "Shopping", "Travel"] {
            assert!(rendered.contains(name), "missing {name}");
        }
        assert!(rendered.contains("16.61"));
        assert!(rendered.contains("Daily average: 45.5 kg CO2e"));
    }

    #[test]
    fn whatif_table_reports_net_change() {
        let result = simulate_whatif(
            &SurveyAnswers::sample(),
            EmissionFactors::standard(),
            &[],
            &[SurveyChange::DietType(DietType::Vegan)],
        )
        .unwrap();
        let rendered = render_whatif_table(&result, MassUnit::Kg);
        assert!(rendered.contains("Net change: -1000 kg CO2e"));
        assert!(rendered.contains("diet_type: average -> vegan"));
    }

    #[test]
    fn signed_keeps_sign_for_small_values() {
        assert_eq!(signed(MassUnit::Tonnes, -4.0), "-0.00");
        assert_eq!(signed(MassUnit::Kg, 12.4), "+12");
    }

    #[test]
    fn empty_answer_changes_message() {
        assert_eq!(render_answer_changes(&[]), "No answers changed.");
    }
}
