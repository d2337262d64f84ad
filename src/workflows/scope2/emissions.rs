//! Pure energy and emissions arithmetic. No I/O, no state: identical
//! inputs always produce identical outputs.

use super::domain::AssessmentFields;

/// National grid average intensity in kg CO2e per kWh, used when no
/// region-specific factor is configured.
pub const DEFAULT_GRID_EMISSION_FACTOR: f64 = 0.716;

const KILOJOULES_PER_MEGAWATT_HOUR: f64 = 3_600_000.0;

/// Share of consumption covered by renewables, as a percentage rounded to
/// two decimals and clamped to [0, 100]. A non-positive total yields 0
/// regardless of the renewable quantity.
pub fn renewable_percentage(renewable_kwh: f64, total_kwh: f64) -> f64 {
    if total_kwh <= 0.0 {
        return 0.0;
    }
    let renewable_kwh = renewable_kwh.max(0.0);
    let ratio = (renewable_kwh / total_kwh) * 100.0;
    round2(ratio.clamp(0.0, 100.0))
}

/// Convert kilojoules to megawatt-hours at full precision. Round for
/// display only.
pub fn kilojoules_to_megawatt_hours(kilojoules: f64) -> f64 {
    kilojoules / KILOJOULES_PER_MEGAWATT_HOUR
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Derived emissions figures for one submission. Not persisted; computed
/// on demand for review surfaces and notification bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionsSnapshot {
    pub renewable_percentage: f64,
    /// Gross grid emissions: total consumption times the grid factor.
    pub location_based_kg: f64,
    /// Net emissions once contracted renewables are treated as zero-emission.
    pub market_based_kg: f64,
}

impl EmissionsSnapshot {
    pub fn compute(renewable_kwh: f64, total_kwh: f64, grid_factor: f64) -> Self {
        let renewable_kwh = renewable_kwh.max(0.0);
        let total_kwh = total_kwh.max(0.0);
        Self {
            renewable_percentage: renewable_percentage(renewable_kwh, total_kwh),
            location_based_kg: total_kwh * grid_factor,
            market_based_kg: (total_kwh - renewable_kwh).max(0.0) * grid_factor,
        }
    }

    pub fn for_fields(fields: &AssessmentFields, grid_factor: f64) -> Self {
        Self::compute(
            fields.renewable_energy_kwh,
            fields.total_energy_kwh,
            grid_factor,
        )
    }
}
