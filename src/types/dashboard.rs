//! Derived, UI-ready dashboard shapes

use serde::{Deserialize, Serialize};

use super::SymptomLogRecord;

/// Address shown for pharmacies that only exist as a name on medicine rows
pub const ADDRESS_UNAVAILABLE: &str = "Address not available";

/// `pharmacy_id` used on inventory items whose pharmacy has no record
pub const UNKNOWN_PHARMACY_ID: &str = "unknown";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicineRef {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    /// Same as `medicine_id`; unique only as far as medicine ids are
    pub id: String,
    pub pharmacy_id: String,
    pub medicine_id: String,
    pub quantity: i64,
    pub last_updated: Option<String>,
    pub medicine: MedicineRef,
}

/// Pharmacy with its nested inventory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pharmacy {
    pub id: String,
    pub name: String,
    pub address: String,
    pub inventory: Vec<InventoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymptomTrendPoint {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DistrictHeatPoint {
    pub district: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LowStockItem {
    pub medicine_name: String,
    pub pharmacy_name: String,
    pub quantity: i64,
}

/// One row of the AI demand forecast
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PredictedDemand {
    pub medicine_name: String,
    /// Percentage or qualitative change, e.g. "+25%" or "Stable"
    pub predicted_demand_change: String,
    pub reasoning: String,
}

/// Low-stock heuristic.
///
/// Real per-pharmacy capacity is not stored anywhere, so a fixed assumed capacity
/// stands in for it until it is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LowStockPolicy {
    /// Fraction of capacity below which an item is low-stock
    pub threshold: f64,
    pub assumed_capacity: u32,
    /// Items below this quantity (but not low-stock) are shown as "low"
    pub warning_quantity: i64,
}

impl Default for LowStockPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            assumed_capacity: 200,
            warning_quantity: 100,
        }
    }
}

impl LowStockPolicy {
    pub fn is_low(&self, quantity: i64) -> bool {
        if self.assumed_capacity == 0 {
            return false;
        }
        (quantity as f64 / self.assumed_capacity as f64) < self.threshold
    }
}

/// Display band for a stock quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    Critical,
    Low,
    Healthy,
}

impl StockLevel {
    pub fn classify(quantity: i64, policy: &LowStockPolicy) -> Self {
        if policy.is_low(quantity) {
            Self::Critical
        } else if quantity < policy.warning_quantity {
            Self::Low
        } else {
            Self::Healthy
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Low => "low",
            Self::Healthy => "ok",
        }
    }
}

/// Result of one aggregation cycle
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DashboardData {
    pub pharmacies: Vec<Pharmacy>,
    pub symptom_logs: Vec<SymptomLogRecord>,
}

impl DashboardData {
    pub fn is_empty(&self) -> bool {
        self.pharmacies.is_empty() && self.symptom_logs.is_empty()
    }
}

/// Headline figures for the dashboard view
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub reports_today: u64,
    pub highest_symptom: Option<String>,
    pub symptom_trends: Vec<SymptomTrendPoint>,
    pub district_heat: Vec<DistrictHeatPoint>,
    pub low_stock_count: usize,
    pub low_stock: Vec<LowStockItem>,
}
