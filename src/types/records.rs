//! Raw rows as returned by the data store

use serde::{Deserialize, Deserializer, Serialize};

/// Row ids arrive as text (uuid) or integers depending on the table definition.
fn deserialize_row_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
    })
}

/// Stock quantities arrive as integers or, from `numeric` columns, as floats.
/// Fractional values are floored, so `q < n` keeps its meaning for whole `n`.
fn deserialize_quantity<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawQuantity {
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<RawQuantity>::deserialize(deserializer)? {
        Some(RawQuantity::Int(n)) => n,
        Some(RawQuantity::Float(f)) => f.floor() as i64,
        None => 0,
    })
}

/// Treat an explicit `null` column the same as a missing one.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One medicine's stock at one pharmacy (`medicines` table).
///
/// Denormalized: the owning pharmacy is referenced only by its name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicineRecord {
    #[serde(deserialize_with = "deserialize_row_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_quantity")]
    pub quantity: i64,
    /// Pharmacy name this row belongs to
    #[serde(default)]
    pub pharmacy: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl MedicineRecord {
    /// Pharmacy name, if present and non-empty
    pub fn pharmacy_name(&self) -> Option<&str> {
        self.pharmacy.as_deref().filter(|name| !name.is_empty())
    }
}

/// Canonical pharmacy identity (`pharmacies` table)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PharmacyRecord {
    #[serde(deserialize_with = "deserialize_row_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Location {
    #[serde(default)]
    pub district: Option<String>,
}

/// Community symptom report (`symptom_logs` table)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymptomLogRecord {
    #[serde(deserialize_with = "deserialize_row_id")]
    pub id: String,
    /// Comma-separated symptom list, e.g. "fever, cough"
    #[serde(default, deserialize_with = "null_as_default")]
    pub symptoms: String,
    #[serde(default)]
    pub disease: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

impl SymptomLogRecord {
    /// District, if present and non-empty. Compared verbatim (no case folding or trimming).
    pub fn district(&self) -> Option<&str> {
        self.location
            .as_ref()
            .and_then(|loc| loc.district.as_deref())
            .filter(|d| !d.is_empty())
    }

    /// Distinct, trimmed, non-empty symptom tokens in the order they appear
    pub fn symptom_tokens(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = Vec::new();
        for token in self.symptoms.split(',').map(str::trim) {
            if !token.is_empty() && !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_log(symptoms: &str, district: Option<&str>) -> SymptomLogRecord {
        SymptomLogRecord {
            id: "1".to_string(),
            symptoms: symptoms.to_string(),
            disease: None,
            location: Some(Location {
                district: district.map(String::from),
            }),
            timestamp: "2025-03-01T10:00:00Z".to_string(),
        }
    }

    // ========== deserialization tests ==========

    #[test]
    fn test_medicine_integer_id_becomes_string() {
        let json = r#"{"id": 42, "name": "Paracetamol", "quantity": 12, "pharmacy": "Central"}"#;
        let med: MedicineRecord = serde_json::from_str(json).unwrap();
        assert_eq!(med.id, "42");
        assert_eq!(med.quantity, 12);
        assert_eq!(med.pharmacy_name(), Some("Central"));
    }

    #[test]
    fn test_medicine_null_columns_default() {
        let json = r#"{"id": "m1", "name": null, "description": null, "quantity": null, "pharmacy": null, "created_at": null}"#;
        let med: MedicineRecord = serde_json::from_str(json).unwrap();
        assert_eq!(med.name, "");
        assert_eq!(med.quantity, 0);
        assert_eq!(med.pharmacy_name(), None);
    }

    #[test]
    fn test_medicine_empty_pharmacy_is_none() {
        let json = r#"{"id": "m1", "name": "Ibuprofen", "quantity": 5, "pharmacy": ""}"#;
        let med: MedicineRecord = serde_json::from_str(json).unwrap();
        assert_eq!(med.pharmacy_name(), None);
    }

    #[test]
    fn test_medicine_simd_json_decoding() {
        let mut bytes = br#"[{"id": 7, "name": "Oseltamivir", "quantity": 80, "pharmacy": "North"}]"#.to_vec();
        let meds: Vec<MedicineRecord> = simd_json::from_slice(&mut bytes).unwrap();
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].id, "7");
    }

    #[test]
    fn test_medicine_float_quantity_accepted() {
        let mut bytes = br#"[{"id": 1, "quantity": 35.0, "pharmacy": "X"},
            {"id": 2, "quantity": 10, "pharmacy": "X"},
            {"id": 3, "quantity": 39.75, "pharmacy": "X"}]"#
            .to_vec();
        let meds: Vec<MedicineRecord> = simd_json::from_slice(&mut bytes).unwrap();
        let quantities: Vec<i64> = meds.iter().map(|m| m.quantity).collect();
        assert_eq!(quantities, vec![35, 10, 39]);
    }

    #[test]
    fn test_medicine_non_numeric_quantity_rejected() {
        let json = r#"{"id": 1, "quantity": "lots", "pharmacy": "X"}"#;
        assert!(serde_json::from_str::<MedicineRecord>(json).is_err());
    }

    #[test]
    fn test_symptom_log_extra_location_fields_ignored() {
        let json = r#"{"id": "s1", "symptoms": "fever", "disease": "flu",
            "location": {"district": "Kasoa", "lat": 5.5}, "timestamp": "2025-03-01T10:00:00Z"}"#;
        let log: SymptomLogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(log.district(), Some("Kasoa"));
    }

    #[test]
    fn test_symptom_log_missing_location() {
        let json = r#"{"id": "s1", "symptoms": "fever", "timestamp": "2025-03-01T10:00:00Z"}"#;
        let log: SymptomLogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(log.district(), None);
    }

    // ========== district tests ==========

    #[test]
    fn test_district_empty_string_is_none() {
        assert_eq!(make_log("fever", Some("")).district(), None);
    }

    #[test]
    fn test_district_is_case_sensitive_and_untrimmed() {
        assert_eq!(make_log("fever", Some(" Accra")).district(), Some(" Accra"));
    }

    // ========== symptom_tokens tests ==========

    #[test]
    fn test_symptom_tokens_trimmed() {
        let log = make_log("fever,  cough ,headache", None);
        assert_eq!(log.symptom_tokens(), vec!["fever", "cough", "headache"]);
    }

    #[test]
    fn test_symptom_tokens_skip_empty() {
        let log = make_log("fever, , cough,", None);
        assert_eq!(log.symptom_tokens(), vec!["fever", "cough"]);
    }

    #[test]
    fn test_symptom_tokens_deduplicated_within_log() {
        let log = make_log("fever, cough, fever", None);
        assert_eq!(log.symptom_tokens(), vec!["fever", "cough"]);
    }

    #[test]
    fn test_symptom_tokens_empty_string() {
        let log = make_log("", None);
        assert!(log.symptom_tokens().is_empty());
    }
}
