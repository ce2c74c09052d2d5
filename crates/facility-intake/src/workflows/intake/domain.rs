use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Catalog of facility categories accepted by the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityType {
    Hotel,
    Hospital,
    ShoppingMall,
    Restaurant,
    Cafe,
    Shop,
    Office,
    CorporateOffice,
    IndustrialWarehouse,
    Warehouse,
    CallCenter,
    School,
    Bank,
    House,
    PassengerTerminal,
    Hangar,
}

impl FacilityType {
    pub const ALL: [FacilityType; 16] = [
        FacilityType::Hotel,
        FacilityType::Hospital,
        FacilityType::ShoppingMall,
        FacilityType::Restaurant,
        FacilityType::Cafe,
        FacilityType::Shop,
        FacilityType::Office,
        FacilityType::CorporateOffice,
        FacilityType::IndustrialWarehouse,
        FacilityType::Warehouse,
        FacilityType::CallCenter,
        FacilityType::School,
        FacilityType::Bank,
        FacilityType::House,
        FacilityType::PassengerTerminal,
        FacilityType::Hangar,
    ];

    /// Label understood by the remote analysis service.
    pub fn label(self) -> &'static str {
        match self {
            FacilityType::Hotel => "Hotel",
            FacilityType::Hospital => "Hospital",
            FacilityType::ShoppingMall => "Plaza Comercial",
            FacilityType::Restaurant => "Restaurante",
            FacilityType::Cafe => "Cafetería",
            FacilityType::Shop => "Tienda",
            FacilityType::Office => "Oficina",
            FacilityType::CorporateOffice => "Oficina Corporativa",
            FacilityType::IndustrialWarehouse => "Nave Industrial",
            FacilityType::Warehouse => "Bodega",
            FacilityType::CallCenter => "Call center",
            FacilityType::School => "Escuela",
            FacilityType::Bank => "Banco",
            FacilityType::House => "Casa",
            FacilityType::PassengerTerminal => "Terminal de Pasajeros",
            FacilityType::Hangar => "Hangar",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            FacilityType::Hotel => "hotel",
            FacilityType::Hospital => "hospital",
            FacilityType::ShoppingMall => "shopping_mall",
            FacilityType::Restaurant => "restaurant",
            FacilityType::Cafe => "cafe",
            FacilityType::Shop => "shop",
            FacilityType::Office => "office",
            FacilityType::CorporateOffice => "corporate_office",
            FacilityType::IndustrialWarehouse => "industrial_warehouse",
            FacilityType::Warehouse => "warehouse",
            FacilityType::CallCenter => "call_center",
            FacilityType::School => "school",
            FacilityType::Bank => "bank",
            FacilityType::House => "house",
            FacilityType::PassengerTerminal => "passenger_terminal",
            FacilityType::Hangar => "hangar",
        }
    }
}

impl fmt::Display for FacilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown facility type '{0}'")]
pub struct UnknownFacilityType(pub String);

impl FromStr for FacilityType {
    type Err = UnknownFacilityType;

    /// Accepts either the catalog label or the snake_case name.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let needle = raw.trim();
        FacilityType::ALL
            .into_iter()
            .find(|kind| {
                kind.label().eq_ignore_ascii_case(needle) || kind.slug().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| UnknownFacilityType(raw.to_string()))
    }
}

/// Risk-bearing infrastructure toggles captured on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    Gas,
    Transformer,
    MachineRoom,
    Substation,
    Pool,
    SpecialInstallations,
}

impl RiskFlag {
    pub const ALL: [RiskFlag; 6] = [
        RiskFlag::Gas,
        RiskFlag::Transformer,
        RiskFlag::MachineRoom,
        RiskFlag::Substation,
        RiskFlag::Pool,
        RiskFlag::SpecialInstallations,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RiskFlag::Gas => "gas installation",
            RiskFlag::Transformer => "transformer",
            RiskFlag::MachineRoom => "machine room",
            RiskFlag::Substation => "electrical substation",
            RiskFlag::Pool => "pool",
            RiskFlag::SpecialInstallations => "special installations",
        }
    }
}

impl fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown risk flag '{0}'")]
pub struct UnknownRiskFlag(pub String);

impl FromStr for RiskFlag {
    type Err = UnknownRiskFlag;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "gas" => Ok(RiskFlag::Gas),
            "transformer" => Ok(RiskFlag::Transformer),
            "machine_room" => Ok(RiskFlag::MachineRoom),
            "substation" => Ok(RiskFlag::Substation),
            "pool" => Ok(RiskFlag::Pool),
            "special_installations" => Ok(RiskFlag::SpecialInstallations),
            _ => Err(UnknownRiskFlag(raw.to_string())),
        }
    }
}

/// The six boolean risk flags of a facility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskFlags {
    pub gas: bool,
    pub transformer: bool,
    pub machine_room: bool,
    pub substation: bool,
    pub pool: bool,
    pub special_installations: bool,
}

impl RiskFlags {
    pub fn get(&self, flag: RiskFlag) -> bool {
        match flag {
            RiskFlag::Gas => self.gas,
            RiskFlag::Transformer => self.transformer,
            RiskFlag::MachineRoom => self.machine_room,
            RiskFlag::Substation => self.substation,
            RiskFlag::Pool => self.pool,
            RiskFlag::SpecialInstallations => self.special_installations,
        }
    }

    pub fn set(&mut self, flag: RiskFlag, value: bool) {
        let slot = match flag {
            RiskFlag::Gas => &mut self.gas,
            RiskFlag::Transformer => &mut self.transformer,
            RiskFlag::MachineRoom => &mut self.machine_room,
            RiskFlag::Substation => &mut self.substation,
            RiskFlag::Pool => &mut self.pool,
            RiskFlag::SpecialInstallations => &mut self.special_installations,
        };
        *slot = value;
    }
}

/// Where the facility sits; forwarded untouched to the analysis service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteLocation {
    pub state: String,
    pub municipality: String,
}

/// Snapshot of a facility description for one submission attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityFacts {
    pub floor_area_m2: f64,
    #[serde(default)]
    pub declared_capacity: u32,
    #[serde(default)]
    pub authorized_capacity: u32,
    #[serde(default)]
    pub worker_count: u32,
    #[serde(default)]
    pub floor_count: u32,
    pub facility_type: FacilityType,
    #[serde(default)]
    pub risk_flags: RiskFlags,
    #[serde(default)]
    pub location: SiteLocation,
}

impl FacilityFacts {
    pub fn new(facility_type: FacilityType, floor_area_m2: f64) -> Self {
        Self {
            floor_area_m2,
            declared_capacity: 0,
            authorized_capacity: 0,
            worker_count: 0,
            floor_count: 0,
            facility_type,
            risk_flags: RiskFlags::default(),
            location: SiteLocation::default(),
        }
    }

    pub fn has(&self, flag: RiskFlag) -> bool {
        self.risk_flags.get(flag)
    }
}
