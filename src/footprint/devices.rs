use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::footprint::{Category, DAYS_PER_YEAR};

/// Categories a user-defined device can add emissions to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCategory {
    Electricity,
    Transportation,
}

impl From<DeviceCategory> for Category {
    fn from(value: DeviceCategory) -> Self {
        match value {
            DeviceCategory::Electricity => Category::Electricity,
            DeviceCategory::Transportation => Category::Transportation,
        }
    }
}

impl DeviceCategory {
    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Electricity => "electricity",
            Self::Transportation => "transportation",
        }
    }
}

impl Display for DeviceCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown device category: {0} (expected electricity or transportation)")]
pub struct DeviceCategoryParseError(pub String);

impl FromStr for DeviceCategory {
    type Err = DeviceCategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "electricity" | "appliance" => Ok(Self::Electricity),
            "transportation" | "transport" | "vehicle" => Ok(Self::Transportation),
            _ => Err(DeviceCategoryParseError(s.to_string())),
        }
    }
}

/// Daily emissions ceiling for a single device; far above any household appliance.
pub const MAX_DEVICE_KG_PER_DAY: f64 = 1_000.0;

#[derive(Debug, Error, PartialEq)]
pub enum DeviceError {
    #[error("device {id}: hours per day must be between 0 and 24, got {value}")]
    InvalidHours { id: String, value: f64 },
    #[error(
        "device {id}: kg CO2e per day must be between 0 and {max}, got {value}",
        max = MAX_DEVICE_KG_PER_DAY
    )]
    InvalidEmissions { id: String, value: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub category: DeviceCategory,
    pub hours_per_day: f64,
    /// Daily emissions at the stated usage.
    pub kg_co2e_per_day: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Device {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: DeviceCategory,
        hours_per_day: f64,
        kg_co2e_per_day: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            hours_per_day,
            kg_co2e_per_day,
            active: true,
        }
    }

    pub fn validate(&self) -> Result<(), DeviceError> {
        if !(0.0..=24.0).contains(&self.hours_per_day) {
            return Err(DeviceError::InvalidHours {
                id: self.id.clone(),
                value: self.hours_per_day,
            });
        }
        if !(0.0..=MAX_DEVICE_KG_PER_DAY).contains(&self.kg_co2e_per_day) {
            return Err(DeviceError::InvalidEmissions {
                id: self.id.clone(),
                value: self.kg_co2e_per_day,
            });
        }
        Ok(())
    }

    pub fn annual_kg(&self) -> f64 {
        self.kg_co2e_per_day.max(0.0) * DAYS_PER_YEAR
    }

    pub fn contribution(&self) -> DeviceContribution {
        DeviceContribution {
            category: self.category,
            annual_kg: self.annual_kg(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DeviceContribution {
    pub category: DeviceCategory,
    pub annual_kg: f64,
}

/// Contributions of the devices that are switched on right now.
pub fn active_contributions(devices: &[Device]) -> Vec<DeviceContribution> {
    devices
        .iter()
        .filter(|d| d.active)
        .map(Device::contribution)
        .collect()
}

/// Derives a URL-safe id from a display name ("Space Heater #2" -> "space-heater-2").
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annual_kg_is_daily_times_365() {
        let device = Device::new("heater", "Heater", DeviceCategory::Electricity, 4.0, 2.0);
        assert_eq!(device.annual_kg(), 730.0);

        let broken = Device::new("x", "X", DeviceCategory::Electricity, 1.0, -3.0);
        assert_eq!(broken.annual_kg(), 0.0);
    }

    #[test]
    fn validate_bounds_hours_and_emissions() {
        let heater = Device::new("heater", "Heater", DeviceCategory::Electricity, 4.0, 2.0);
        assert!(heater.validate().is_ok());

        let mut device = heater.clone();
        device.hours_per_day = 25.0;
        assert!(matches!(device.validate(), Err(DeviceError::InvalidHours { .. })));

        for value in [-1.0, f64::NAN, 1e307] {
            let mut device = heater.clone();
            device.kg_co2e_per_day = value;
            assert!(matches!(
                device.validate(),
                Err(DeviceError::InvalidEmissions { .. })
            ));
        }
    }

    #[test]
    fn only_active_devices_contribute() {
        let mut scooter = Device::new(
            "scooter",
            "Scooter",
            DeviceCategory::Transportation,
            1.0,
            0.5,
        );
        scooter.active = false;
        let heater = Device::new("heater", "Heater", DeviceCategory::Electricity, 4.0, 2.0);

        let contributions = active_contributions(&[scooter, heater]);
        assert_eq!(contributions.len(), 1);
        assert_eq!(contributions[0].category, DeviceCategory::Electricity);
        assert_eq!(contributions[0].annual_kg, 730.0);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Space Heater #2 "), "space-heater-2");
        assert_eq!(slugify("E-Bike"), "e-bike");
        assert_eq!(slugify("!!"), "");
    }

    #[test]
    fn device_category_maps_to_footprint_category() {
        assert_eq!(Category::from(DeviceCategory::Transportation), Category::Transportation);
        assert_eq!(
            DeviceCategory::from_str("Vehicle").unwrap(),
            DeviceCategory::Transportation
        );
    }
}
