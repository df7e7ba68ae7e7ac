//! Emission coefficients used by the footprint calculator.
//!
//! Every value is a point estimate in kilograms of CO2e. Tier tables are keyed
//! by the survey answer they describe and fall back to the tier's designated
//! default entry when a key is absent, so a validated table yields a value for
//! every possible answer.

use std::collections::BTreeMap;
use std::fmt::Debug;

use once_cell::sync::Lazy;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::survey::{DietType, ElectricityUsage, HomeSize, ShoppingHabits};

static STANDARD_FACTORS: Lazy<EmissionFactors> = Lazy::new(EmissionFactors::default);

#[derive(Debug, Error, PartialEq)]
pub enum FactorError {
    #[error("factor table {table} has no entry for fallback tier {tier}")]
    MissingFallback {
        table: &'static str,
        tier: &'static str,
    },
    #[error("factor {name} must be a finite non-negative number, got {value}")]
    InvalidCoefficient { name: String, value: f64 },
    #[error("invalid factor overrides: {0}")]
    Overrides(String),
}

/// A survey answer that indexes a tier table.
pub trait Tier: Copy + Ord + Debug + 'static {
    /// Tier used when a table has no entry for the requested one.
    const FALLBACK: Self;

    fn all() -> &'static [Self];

    fn slug(&self) -> &'static str;

    /// Exact slug match; aliases are a survey-input concern only.
    fn from_slug(slug: &str) -> Option<Self> {
        Self::all().iter().copied().find(|tier| tier.slug() == slug)
    }
}

impl Tier for HomeSize {
    const FALLBACK: Self = HomeSize::Medium;

    fn all() -> &'static [Self] {
        &HomeSize::ALL
    }

    fn slug(&self) -> &'static str {
        self.as_slug()
    }
}

impl Tier for ElectricityUsage {
    const FALLBACK: Self = ElectricityUsage::Average;

    fn all() -> &'static [Self] {
        &ElectricityUsage::ALL
    }

    fn slug(&self) -> &'static str {
        self.as_slug()
    }
}

impl Tier for DietType {
    const FALLBACK: Self = DietType::Average;

    fn all() -> &'static [Self] {
        &DietType::ALL
    }

    fn slug(&self) -> &'static str {
        self.as_slug()
    }
}

impl Tier for ShoppingHabits {
    const FALLBACK: Self = ShoppingHabits::Average;

    fn all() -> &'static [Self] {
        &ShoppingHabits::ALL
    }

    fn slug(&self) -> &'static str {
        self.as_slug()
    }
}

/// Per-tier values keyed by the answer enum. Serialized as a slug-keyed map;
/// unknown slugs are rejected on the way in.
#[derive(Debug, Clone, PartialEq)]
pub struct TierTable<T: Tier>(BTreeMap<T, f64>);

impl<T: Tier> Default for TierTable<T> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<T: Tier> TierTable<T> {
    pub fn from_pairs(pairs: &[(T, f64)]) -> Self {
        Self(pairs.iter().copied().collect())
    }

    /// Value for `tier`, or the fallback tier's value when `tier` is unmapped.
    /// An empty table yields zero.
    pub fn lookup(&self, tier: T) -> f64 {
        self.0
            .get(&tier)
            .or_else(|| self.0.get(&T::FALLBACK))
            .copied()
            .unwrap_or(0.0)
    }

    fn validate(&self, table: &'static str) -> Result<(), FactorError> {
        if !self.0.contains_key(&T::FALLBACK) {
            return Err(FactorError::MissingFallback {
                table,
                tier: T::FALLBACK.slug(),
            });
        }
        for (tier, value) in &self.0 {
            check(&format!("{table}.{}", tier.slug()), *value)?;
        }
        Ok(())
    }
}

impl<T: Tier> Serialize for TierTable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(tier, value)| (tier.slug(), value)))
    }
}

impl<'de, T: Tier> Deserialize<'de> for TierTable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, f64>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, value)| match T::from_slug(&key) {
                Some(tier) => Ok((tier, value)),
                None => {
                    let expected = T::all()
                        .iter()
                        .map(Tier::slug)
                        .collect::<Vec<_>>()
                        .join(", ");
                    Err(de::Error::custom(format!(
                        "unknown tier `{key}` (expected one of: {expected})"
                    )))
                }
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FuelFactor {
    pub kg_co2_per_unit: f64,
    /// Annual fuel quantity by home size (therms for natural gas, gallons otherwise).
    #[serde(default)]
    pub annual_usage: TierTable<HomeSize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HeatingFactors {
    /// Natural gas: usage in therms, factor per standard cubic foot.
    pub natural_gas: FuelFactor,
    pub scf_per_therm: f64,
    pub heating_oil: FuelFactor,
    pub propane: FuelFactor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ElectricityFactors {
    pub kg_co2_per_kwh: f64,
    pub annual_kwh: TierTable<ElectricityUsage>,
    /// Household size the annual kWh tiers describe.
    pub reference_occupants: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CombustionVehicle {
    pub miles_per_gallon: f64,
    pub kg_co2_per_gallon: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ElectricVehicle {
    pub kwh_per_100_miles: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct VehicleFactors {
    pub gas: CombustionVehicle,
    pub diesel: CombustionVehicle,
    pub hybrid: CombustionVehicle,
    /// Charged from the grid; uses the electricity kg/kWh factor.
    pub electric: ElectricVehicle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EmissionFactors {
    pub heating: HeatingFactors,
    pub electricity: ElectricityFactors,
    pub vehicles: VehicleFactors,
    pub diet_kg_per_occupant: TierTable<DietType>,
    pub shopping_kg_per_occupant: TierTable<ShoppingHabits>,
    /// Per round trip; distance and cabin class are not modelled.
    pub kg_per_flight: f64,
}

impl EmissionFactors {
    /// The built-in table, shared process-wide.
    pub fn standard() -> &'static EmissionFactors {
        &STANDARD_FACTORS
    }

    /// Applies a partial `[factors]` table over the built-in values. Tables are
    /// merged key by key at every depth, so an override may name a single tier
    /// or coefficient and everything else keeps its default.
    pub fn with_overrides(overrides: toml::Value) -> Result<Self, FactorError> {
        let mut merged = toml::Value::try_from(Self::standard())
            .map_err(|e| FactorError::Overrides(e.to_string()))?;
        merge_toml(&mut merged, overrides);
        let factors = merged
            .try_into::<Self>()
            .map_err(|e| FactorError::Overrides(e.to_string()))?;
        factors.validate()?;
        Ok(factors)
    }

    pub fn validate(&self) -> Result<(), FactorError> {
        self.heating
            .natural_gas
            .annual_usage
            .validate("heating.natural_gas.annual_usage")?;
        self.heating
            .heating_oil
            .annual_usage
            .validate("heating.heating_oil.annual_usage")?;
        self.heating
            .propane
            .annual_usage
            .validate("heating.propane.annual_usage")?;
        self.electricity
            .annual_kwh
            .validate("electricity.annual_kwh")?;
        self.diet_kg_per_occupant
            .validate("diet_kg_per_occupant")?;
        self.shopping_kg_per_occupant
            .validate("shopping_kg_per_occupant")?;

        let scalars = [
            (
                "heating.natural_gas.kg_co2_per_unit",
                self.heating.natural_gas.kg_co2_per_unit,
            ),
            ("heating.scf_per_therm", self.heating.scf_per_therm),
            (
                "heating.heating_oil.kg_co2_per_unit",
                self.heating.heating_oil.kg_co2_per_unit,
            ),
            (
                "heating.propane.kg_co2_per_unit",
                self.heating.propane.kg_co2_per_unit,
            ),
            ("electricity.kg_co2_per_kwh", self.electricity.kg_co2_per_kwh),
            ("vehicles.gas.kg_co2_per_gallon", self.vehicles.gas.kg_co2_per_gallon),
            (
                "vehicles.diesel.kg_co2_per_gallon",
                self.vehicles.diesel.kg_co2_per_gallon,
            ),
            (
                "vehicles.hybrid.kg_co2_per_gallon",
                self.vehicles.hybrid.kg_co2_per_gallon,
            ),
            (
                "vehicles.electric.kwh_per_100_miles",
                self.vehicles.electric.kwh_per_100_miles,
            ),
            ("kg_per_flight", self.kg_per_flight),
        ];
        for (name, value) in scalars {
            check(name, value)?;
        }

        // Divisors must be strictly positive.
        let divisors = [
            (
                "electricity.reference_occupants",
                self.electricity.reference_occupants,
            ),
            ("vehicles.gas.miles_per_gallon", self.vehicles.gas.miles_per_gallon),
            (
                "vehicles.diesel.miles_per_gallon",
                self.vehicles.diesel.miles_per_gallon,
            ),
            (
                "vehicles.hybrid.miles_per_gallon",
                self.vehicles.hybrid.miles_per_gallon,
            ),
        ];
        for (name, value) in divisors {
            check(name, value)?;
            if value == 0.0 {
                return Err(FactorError::InvalidCoefficient {
                    name: name.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

fn merge_toml(base: &mut toml::Value, patch: toml::Value) {
    match (base, patch) {
        (toml::Value::Table(base), toml::Value::Table(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

fn check(name: &str, value: f64) -> Result<(), FactorError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FactorError::InvalidCoefficient {
            name: name.to_string(),
            value,
        })
    }
}

impl Default for EmissionFactors {
    fn default() -> Self {
        Self {
            heating: HeatingFactors::default(),
            electricity: ElectricityFactors::default(),
            vehicles: VehicleFactors::default(),
            diet_kg_per_occupant: TierTable::from_pairs(&[
                (DietType::MeatHeavy, 3300.0),
                (DietType::Average, 2000.0),
                (DietType::Vegetarian, 1700.0),
                (DietType::Vegan, 1500.0),
            ]),
            shopping_kg_per_occupant: TierTable::from_pairs(&[
                (ShoppingHabits::Minimal, 1000.0),
                (ShoppingHabits::Average, 1500.0),
                (ShoppingHabits::Frequent, 2500.0),
            ]),
            kg_per_flight: 600.0,
        }
    }
}

impl Default for HeatingFactors {
    fn default() -> Self {
        Self {
            natural_gas: FuelFactor {
                kg_co2_per_unit: 0.05444,
                annual_usage: TierTable::from_pairs(&[
                    (HomeSize::Small, 400.0),
                    (HomeSize::Medium, 600.0),
                    (HomeSize::Large, 900.0),
                    (HomeSize::VeryLarge, 1200.0),
                ]),
            },
            scf_per_therm: 97.3,
            heating_oil: FuelFactor {
                kg_co2_per_unit: 10.16,
                annual_usage: TierTable::from_pairs(&[
                    (HomeSize::Small, 400.0),
                    (HomeSize::Medium, 600.0),
                    (HomeSize::Large, 800.0),
                    (HomeSize::VeryLarge, 1000.0),
                ]),
            },
            propane: FuelFactor {
                kg_co2_per_unit: 5.68,
                annual_usage: TierTable::from_pairs(&[
                    (HomeSize::Small, 350.0),
                    (HomeSize::Medium, 500.0),
                    (HomeSize::Large, 700.0),
                    (HomeSize::VeryLarge, 900.0),
                ]),
            },
        }
    }
}

impl Default for ElectricityFactors {
    fn default() -> Self {
        Self {
            kg_co2_per_kwh: 0.385,
            annual_kwh: TierTable::from_pairs(&[
                (ElectricityUsage::Low, 7200.0),
                (ElectricityUsage::Average, 10800.0),
                (ElectricityUsage::High, 14400.0),
            ]),
            reference_occupants: 2.5,
        }
    }
}

impl Default for VehicleFactors {
    fn default() -> Self {
        Self {
            gas: CombustionVehicle {
                miles_per_gallon: 24.0,
                kg_co2_per_gallon: 8.78,
            },
            diesel: CombustionVehicle {
                miles_per_gallon: 29.0,
                kg_co2_per_gallon: 10.21,
            },
            hybrid: CombustionVehicle {
                miles_per_gallon: 45.0,
                kg_co2_per_gallon: 8.78,
            },
            electric: ElectricVehicle {
                kwh_per_100_miles: 30.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(text: &str) -> toml::Value {
        toml::Value::Table(toml::from_str::<toml::Table>(text).unwrap())
    }

    #[test]
    fn standard_table_is_valid_and_matches_default() {
        let standard = EmissionFactors::standard();
        assert!(standard.validate().is_ok());
        assert_eq!(standard, &EmissionFactors::default());
    }

    #[test]
    fn lookup_falls_back_to_designated_tier() {
        let table = TierTable::from_pairs(&[(DietType::Average, 2000.0), (DietType::Vegan, 1500.0)]);
        assert_eq!(table.lookup(DietType::Vegan), 1500.0);
        assert_eq!(table.lookup(DietType::MeatHeavy), 2000.0);

        let without_fallback = TierTable::from_pairs(&[(DietType::Vegan, 1500.0)]);
        assert_eq!(without_fallback.lookup(DietType::MeatHeavy), 0.0);
    }

    #[test]
    fn home_size_falls_back_to_medium() {
        let table = TierTable::from_pairs(&[(HomeSize::Small, 400.0), (HomeSize::Medium, 600.0)]);
        assert_eq!(table.lookup(HomeSize::VeryLarge), 600.0);
    }

    #[test]
    fn validate_requires_fallback_entry() {
        let mut factors = EmissionFactors::default();
        factors.electricity.annual_kwh = TierTable::from_pairs(&[
            (ElectricityUsage::Low, 7200.0),
            (ElectricityUsage::High, 14400.0),
        ]);
        assert_eq!(
            factors.validate(),
            Err(FactorError::MissingFallback {
                table: "electricity.annual_kwh",
                tier: "average",
            })
        );
    }

    #[test]
    fn validate_rejects_negative_and_zero_divisors() {
        let mut factors = EmissionFactors::default();
        factors.kg_per_flight = -1.0;
        assert!(matches!(
            factors.validate(),
            Err(FactorError::InvalidCoefficient { .. })
        ));

        let mut factors = EmissionFactors::default();
        factors.vehicles.gas.miles_per_gallon = 0.0;
        assert!(factors.validate().is_err());

        let mut factors = EmissionFactors::default();
        factors.shopping_kg_per_occupant = TierTable::from_pairs(&[
            (ShoppingHabits::Average, 1500.0),
            (ShoppingHabits::Frequent, f64::INFINITY),
        ]);
        assert!(factors.validate().is_err());
    }

    #[test]
    fn tier_tables_serialize_with_slug_keys() {
        let json = serde_json::to_value(EmissionFactors::standard()).unwrap();
        assert_eq!(json["heating"]["natural_gas"]["annual_usage"]["very-large"], 1200.0);
        assert_eq!(json["diet_kg_per_occupant"]["meat-heavy"], 3300.0);
    }

    #[test]
    fn overrides_keep_defaults_for_unnamed_keys() {
        let factors = EmissionFactors::with_overrides(overrides(
            r#"
kg_per_flight = 750.0

[electricity]
kg_co2_per_kwh = 0.2
annual_kwh = { low = 5000.0, average = 9000.0 }
"#,
        ))
        .unwrap();
        assert_eq!(factors.kg_per_flight, 750.0);
        assert_eq!(factors.electricity.kg_co2_per_kwh, 0.2);
        assert_eq!(factors.electricity.reference_occupants, 2.5);
        assert_eq!(factors.electricity.annual_kwh.lookup(ElectricityUsage::Low), 5000.0);
        assert_eq!(factors.electricity.annual_kwh.lookup(ElectricityUsage::High), 14400.0);
        assert_eq!(factors.diet_kg_per_occupant.lookup(DietType::Vegan), 1500.0);
    }

    #[test]
    fn fuel_override_may_name_only_its_coefficient() {
        let factors = EmissionFactors::with_overrides(overrides(
            r#"
[heating.propane]
kg_co2_per_unit = 6.0
"#,
        ))
        .unwrap();
        assert_eq!(factors.heating.propane.kg_co2_per_unit, 6.0);
        assert_eq!(factors.heating.propane.annual_usage.lookup(HomeSize::Large), 700.0);
    }

    #[test]
    fn misspelled_override_keys_are_rejected() {
        let err = EmissionFactors::with_overrides(overrides(
            r#"
[heating.natural_gas.annual_usage]
very_large = 1500.0
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, FactorError::Overrides(ref msg) if msg.contains("very_large")));

        let err = EmissionFactors::with_overrides(overrides("kg_per_flite = 1.0")).unwrap_err();
        assert!(matches!(err, FactorError::Overrides(_)));
    }

    #[test]
    fn overrides_are_validated() {
        let err = EmissionFactors::with_overrides(overrides(
            r#"
[vehicles.gas]
miles_per_gallon = 0.0
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, FactorError::InvalidCoefficient { .. }));
    }
}
