use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// JSON output always carries raw kg figures; `unit` documents that.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a, T: Serialize + ?Sized> {
    pub generated_at: DateTime<Utc>,
    pub unit: &'static str,
    pub data: &'a T,
}

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn render_report<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    render_json(&JsonReport {
        generated_at: Utc::now(),
        unit: "kg_co2e",
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_wraps_data_with_unit() {
        let rendered = render_report(&[1.5, 2.0]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["unit"], "kg_co2e");
        assert_eq!(value["data"][1], 2.0);
        assert!(value["generated_at"].is_string());
    }
}
