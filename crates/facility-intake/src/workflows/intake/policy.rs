use serde::{Deserialize, Serialize};

use super::domain::FacilityType;

/// Threshold dials for the hard rules and the anomaly detector.
///
/// These are administrative policy values rather than physical constants; the
/// `Default` impl carries the values the intake desk currently enforces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoherencePolicy {
    pub max_capacity_density: f64,
    pub min_area_per_worker_m2: f64,
    pub max_floor_count: u32,
    pub min_area_per_floor_m2: f64,
    pub min_pool_area_m2: f64,
    pub extraordinary_area_m2: f64,
    pub mass_occupancy_capacity: u32,
    pub critical_population_density: f64,
    pub headcount_exempt_types: Vec<FacilityType>,
}

impl Default for CoherencePolicy {
    fn default() -> Self {
        Self {
            max_capacity_density: 4.0,
            min_area_per_worker_m2: 1.5,
            max_floor_count: 50,
            min_area_per_floor_m2: 30.0,
            min_pool_area_m2: 100.0,
            extraordinary_area_m2: 15_000.0,
            mass_occupancy_capacity: 5_000,
            critical_population_density: 2.0,
            headcount_exempt_types: vec![
                FacilityType::IndustrialWarehouse,
                FacilityType::Warehouse,
                FacilityType::CorporateOffice,
            ],
        }
    }
}

impl CoherencePolicy {
    pub fn exempts_headcount(&self, facility_type: FacilityType) -> bool {
        self.headcount_exempt_types.contains(&facility_type)
    }
}
