//! Aggregator service for reshaping fetched rows into dashboard structures

use std::collections::HashMap;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};

use crate::types::{
    DashboardData, DashboardSummary, DistrictHeatPoint, InventoryItem, LowStockItem,
    LowStockPolicy, MedicineRecord, MedicineRef, Pharmacy, PharmacyRecord, SymptomLogRecord,
    SymptomTrendPoint, ADDRESS_UNAVAILABLE, UNKNOWN_PHARMACY_ID,
};

/// Number of shading steps used by the district heat map
pub const HEAT_LEVELS: u8 = 8;

/// Aggregator for derived dashboard data. All functions are pure.
pub struct Aggregator;

impl Aggregator {
    /// Group medicine rows into pharmacies with nested inventory.
    ///
    /// Output order follows the first appearance of each pharmacy name in `medicines`.
    /// Rows without a pharmacy name are dropped. When several records share a name,
    /// the first one wins; later duplicates never replace it.
    pub fn build_pharmacies(
        medicines: &[MedicineRecord],
        pharmacies: &[PharmacyRecord],
    ) -> Vec<Pharmacy> {
        let mut by_name: HashMap<&str, &PharmacyRecord> = HashMap::new();
        for record in pharmacies {
            by_name.entry(record.name.as_str()).or_insert(record);
        }

        // Group by pharmacy name, preserving first-appearance order
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<&MedicineRecord>> = HashMap::new();
        for med in medicines {
            let Some(name) = med.pharmacy_name() else {
                continue;
            };
            groups
                .entry(name)
                .or_insert_with(|| {
                    order.push(name);
                    Vec::new()
                })
                .push(med);
        }

        order
            .into_iter()
            .map(|name| {
                let details = by_name.get(name).copied();
                let pharmacy_id = details
                    .map(|p| p.id.clone())
                    .unwrap_or_else(|| UNKNOWN_PHARMACY_ID.to_string());

                let inventory = groups
                    .remove(name)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|med| InventoryItem {
                        id: med.id.clone(),
                        pharmacy_id: pharmacy_id.clone(),
                        medicine_id: med.id.clone(),
                        quantity: med.quantity,
                        last_updated: med.created_at.clone(),
                        medicine: MedicineRef {
                            id: med.id.clone(),
                            name: med.name.clone(),
                            description: med.description.clone(),
                            category: med.category.clone(),
                        },
                    })
                    .collect();

                Pharmacy {
                    id: details
                        .map(|p| p.id.clone())
                        .unwrap_or_else(|| name.to_string()),
                    name: name.to_string(),
                    address: details
                        .and_then(|p| p.address.clone())
                        .filter(|a| !a.is_empty())
                        .unwrap_or_else(|| ADDRESS_UNAVAILABLE.to_string()),
                    inventory,
                }
            })
            .collect()
    }

    /// Most frequently reported symptoms, descending by count.
    ///
    /// Ties keep the order in which the symptoms were first encountered.
    pub fn symptom_trends(logs: &[SymptomLogRecord], top_n: usize) -> Vec<SymptomTrendPoint> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut points: Vec<SymptomTrendPoint> = Vec::new();

        for log in logs {
            for token in log.symptom_tokens() {
                let slot = *index.entry(token).or_insert_with(|| {
                    points.push(SymptomTrendPoint {
                        name: token.to_string(),
                        count: 0,
                    });
                    points.len() - 1
                });
                points[slot].count = points[slot].count.saturating_add(1);
            }
        }

        // sort_by is stable, so equal counts stay in encounter order
        points.sort_by(|a, b| b.count.cmp(&a.count));
        points.truncate(top_n);
        points
    }

    /// Report counts per district, in order of first appearance.
    ///
    /// Logs without a district are skipped; every returned count is at least 1.
    pub fn district_heat(logs: &[SymptomLogRecord]) -> Vec<DistrictHeatPoint> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut points: Vec<DistrictHeatPoint> = Vec::new();

        for district in logs.iter().filter_map(SymptomLogRecord::district) {
            let slot = *index.entry(district).or_insert_with(|| {
                points.push(DistrictHeatPoint {
                    district: district.to_string(),
                    count: 0,
                });
                points.len() - 1
            });
            points[slot].count = points[slot].count.saturating_add(1);
        }

        points
    }

    /// Flatten all inventory items that fall under the low-stock policy
    pub fn low_stock(pharmacies: &[Pharmacy], policy: &LowStockPolicy) -> Vec<LowStockItem> {
        pharmacies
            .iter()
            .flat_map(|pharmacy| {
                pharmacy
                    .inventory
                    .iter()
                    .filter(|item| policy.is_low(item.quantity))
                    .map(move |item| LowStockItem {
                        medicine_name: item.medicine.name.clone(),
                        pharmacy_name: pharmacy.name.clone(),
                        quantity: item.quantity,
                    })
            })
            .collect()
    }

    /// Count logs reported on `date` (local calendar). Unparseable timestamps are ignored.
    pub fn reports_on(logs: &[SymptomLogRecord], date: NaiveDate) -> u64 {
        logs.iter()
            .filter_map(|log| parse_timestamp(&log.timestamp))
            .filter(|ts| ts.with_timezone(&Local).date_naive() == date)
            .count() as u64
    }

    /// Headline figures for the dashboard view
    pub fn summarize(
        data: &DashboardData,
        policy: &LowStockPolicy,
        top_n: usize,
        today: NaiveDate,
    ) -> DashboardSummary {
        let symptom_trends = Self::symptom_trends(&data.symptom_logs, top_n);
        let low_stock = Self::low_stock(&data.pharmacies, policy);

        DashboardSummary {
            reports_today: Self::reports_on(&data.symptom_logs, today),
            highest_symptom: symptom_trends.first().map(|p| p.name.clone()),
            district_heat: Self::district_heat(&data.symptom_logs),
            low_stock_count: low_stock.len(),
            symptom_trends,
            low_stock,
        }
    }
}

/// Map a district count onto 0..=HEAT_LEVELS relative to the busiest district
pub fn heat_intensity(count: u64, max: u64) -> u8 {
    if count == 0 || max == 0 {
        return 0;
    }
    let scaled = (count as f64 / max as f64 * HEAT_LEVELS as f64).ceil() as u8;
    scaled.clamp(1, HEAT_LEVELS)
}

/// Parse store timestamps: RFC 3339, or a naive timestamp taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
