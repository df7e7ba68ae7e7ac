use anyhow::Result;

use crate::config::MassUnit;
use crate::footprint::CarbonFootprint;
use crate::recommend::Recommendation;

pub fn footprint_to_csv(footprint: &CarbonFootprint, unit: MassUnit) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["category", "annual", "share_pct", "unit"])?;
    for (category, kg) in footprint.breakdown.iter() {
        writer.write_record([
            category.as_slug().to_string(),
            format!("{:.4}", unit.convert(kg)),
            format!("{:.2}", footprint.share(category) * 100.0),
            unit.to_string(),
        ])?;
    }
    writer.write_record([
        "total".to_string(),
        format!("{:.4}", unit.convert(footprint.total_kg)),
        "100.00".to_string(),
        unit.to_string(),
    ])?;
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn recommendations_to_csv(
    recommendations: &[Recommendation],
    unit: MassUnit,
) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "rank",
        "id",
        "category",
        "title",
        "estimated_reduction",
        "unit",
        "difficulty",
    ])?;
    for (idx, rec) in recommendations.iter().enumerate() {
        writer.write_record([
            (idx + 1).to_string(),
            rec.id.clone(),
            rec.category.to_string().to_lowercase(),
            rec.title.clone(),
            format!("{:.4}", unit.convert(rec.estimated_reduction_kg)),
            unit.to_string(),
            rec.difficulty.to_string(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::EmissionFactors;
    use crate::footprint::calculator::compute_footprint;
    use crate::recommend::rules::generate_recommendations;
    use crate::survey::SurveyAnswers;

    #[test]
    fn footprint_csv_has_one_row_per_category_plus_total() {
        let footprint = compute_footprint(&SurveyAnswers::sample(), EmissionFactors::standard());
        let csv = footprint_to_csv(&footprint, MassUnit::Kg).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "category,annual,share_pct,unit");
        assert!(lines[4].starts_with("food,4000.0000,"));
        assert!(lines[7].starts_with("total,"));
    }

    #[test]
    fn recommendations_csv_is_ranked() {
        let survey = SurveyAnswers::sample();
        let footprint = compute_footprint(&survey, EmissionFactors::standard());
        let recs = generate_recommendations(&footprint, &survey);
        let csv = recommendations_to_csv(&recs, MassUnit::Tonnes).unwrap();
        let second = csv.lines().nth(1).unwrap();
        assert!(second.starts_with("1,renewable-energy,electricity,"));
        assert_eq!(csv.lines().count(), recs.len() + 1);
    }
}
