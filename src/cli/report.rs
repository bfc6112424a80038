//! Plain-text rendering of dashboard output

use std::fmt::Write;

use serde::Serialize;

use crate::services::aggregator::{heat_intensity, HEAT_LEVELS};
use crate::types::{
    DashboardSummary, DistrictHeatPoint, InventoryItem, LowStockPolicy, Pharmacy,
    PredictedDemand, StockLevel, SymptomTrendPoint,
};

const BAR_WIDTH: usize = 20;

/// Shading per heat level, index 0 = no reports
const HEAT_SHADES: [char; HEAT_LEVELS as usize + 1] =
    [' ', '·', '░', '░', '▒', '▒', '▓', '▓', '█'];

/// Format a number with thousand separators (e.g., 1234567 -> "1,234,567")
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let len = s.len();
    let mut result = String::with_capacity(len + len / 3);

    for (i, ch) in s.bytes().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch as char);
    }

    result
}

/// Horizontal bar proportional to `count / max`
/// Example: count=5, max=10, width=8 → "████░░░░"
pub fn format_bar(count: u64, max: u64, width: usize) -> String {
    if max == 0 || width == 0 {
        return "░".repeat(width);
    }
    let filled = ((count as f64 / max as f64) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Heat map cell for a district count
pub fn heat_cell(count: u64, max: u64) -> char {
    HEAT_SHADES[heat_intensity(count, max) as usize]
}

pub fn render_dashboard(summary: &DashboardSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Reports today:     {}", format_number(summary.reports_today));
    let _ = writeln!(
        out,
        "Highest symptom:   {}",
        summary.highest_symptom.as_deref().unwrap_or("N/A")
    );
    let _ = writeln!(
        out,
        "Low stock items:   {}",
        format_number(summary.low_stock_count as u64)
    );
    let _ = writeln!(out);
    out.push_str(&render_trends(&summary.symptom_trends));
    let _ = writeln!(out);
    out.push_str(&render_district_heat(&summary.district_heat));

    if !summary.low_stock.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Low stock alerts");
        for item in &summary.low_stock {
            let _ = writeln!(
                out,
                "  {:<24} {:<24} {:>6}",
                item.medicine_name, item.pharmacy_name, item.quantity
            );
        }
    }
    out
}

pub fn render_trends(trends: &[SymptomTrendPoint]) -> String {
    let mut out = String::from("Symptom trends\n");
    if trends.is_empty() {
        out.push_str("  No symptom reports\n");
        return out;
    }
    let max = trends.iter().map(|t| t.count).max().unwrap_or(0);
    for point in trends {
        let _ = writeln!(
            out,
            "  {:<20} {} {}",
            point.name,
            format_bar(point.count, max, BAR_WIDTH),
            format_number(point.count)
        );
    }
    out
}

pub fn render_district_heat(heat: &[DistrictHeatPoint]) -> String {
    let mut out = String::from("Reports by district\n");
    if heat.is_empty() {
        out.push_str("  No located reports\n");
        return out;
    }
    let max = heat.iter().map(|h| h.count).max().unwrap_or(0);
    for point in heat {
        let _ = writeln!(
            out,
            "  {} {:<20} {}",
            heat_cell(point.count, max),
            point.district,
            format_number(point.count)
        );
    }
    out
}

pub fn render_inventory(pharmacies: &[Pharmacy], policy: &LowStockPolicy) -> String {
    let mut out = String::new();
    if pharmacies.is_empty() {
        out.push_str("No pharmacy inventory\n");
        return out;
    }
    for pharmacy in pharmacies {
        let _ = writeln!(out, "{} ({})", pharmacy.name, pharmacy.address);
        for item in &pharmacy.inventory {
            let level = StockLevel::classify(item.quantity, policy);
            let _ = writeln!(
                out,
                "  {:<24} {:>6}  {}",
                item.medicine.name,
                item.quantity,
                level.label()
            );
        }
    }
    out
}

/// Inventory item with its stock band, for `inventory --json`
#[derive(Serialize)]
pub struct StockedItem<'a> {
    #[serde(flatten)]
    pub item: &'a InventoryItem,
    pub stock_level: StockLevel,
}

#[derive(Serialize)]
pub struct PharmacyStock<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub address: &'a str,
    pub inventory: Vec<StockedItem<'a>>,
}

pub fn inventory_with_levels<'a>(
    pharmacies: &'a [Pharmacy],
    policy: &LowStockPolicy,
) -> Vec<PharmacyStock<'a>> {
    pharmacies
        .iter()
        .map(|pharmacy| PharmacyStock {
            id: &pharmacy.id,
            name: &pharmacy.name,
            address: &pharmacy.address,
            inventory: pharmacy
                .inventory
                .iter()
                .map(|item| StockedItem {
                    item,
                    stock_level: StockLevel::classify(item.quantity, policy),
                })
                .collect(),
        })
        .collect()
}

pub fn render_predictions(predictions: &[PredictedDemand]) -> String {
    let mut out = String::new();
    if predictions.is_empty() {
        out.push_str("No predictions returned\n");
        return out;
    }
    for p in predictions {
        let _ = writeln!(out, "{:<16} {:>8}  {}", p.medicine_name, p.predicted_demand_change, p.reasoning);
    }
    out
}
