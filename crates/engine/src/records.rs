//! Persisted trip records.
//!
//! These are the document shapes stored per trip namespace. Field names
//! follow the JSON wire format (camelCase) so exported trips stay readable
//! by other clients of the same data.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A trip participant.
///
/// Expenses reference participants **by name**, not id; the id only exists
/// to address the record for rename/delete. Renaming or deleting a user
/// intentionally does not cascade into historical expenses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

/// A shared expense, immutable once created (deletion is the only mutation).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(default)]
    pub id: String,
    pub payer: String,
    /// Lenient decode: non-numeric persisted amounts become 0 instead of
    /// poisoning the whole collection.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    /// ISO-8601.
    #[serde(default)]
    pub date: String,
    /// Names the cost is split among; an empty (or fully dangling) set
    /// falls back to all current users at settlement time.
    #[serde(default)]
    pub involved: Vec<String>,
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_amount(&value))
}

/// Numeric coercion matching `Number(x) || 0`: numbers pass through,
/// numeric strings parse, everything else (including NaN/inf) is 0.
pub fn coerce_amount(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|amount| amount.is_finite()).unwrap_or(0.0)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherInfo {
    pub temp: f64,
    pub condition: String,
    pub icon: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItineraryItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherInfo>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    /// Milliseconds since the epoch; the chat view sorts by it.
    pub timestamp: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    #[default]
    Search,
    Itinerary,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: MarkerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(default)]
    pub timestamp: i64,
}

/// Per-trip settings, saved by the setup flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSettings {
    pub destination: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub currency_code: Option<String>,
    /// Static exchange rate to the traveler's home currency.
    #[serde(default = "default_rate")]
    pub currency_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

fn default_rate() -> f64 {
    1.0
}

impl TripSettings {
    /// Static-rate conversion of a local-currency amount to home currency.
    pub fn convert(&self, amount: f64) -> f64 {
        amount * self.currency_rate
    }
}

/// Registry entry: one per known trip, independent of the active one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripMetadata {
    pub id: String,
    pub destination: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expense_amount_decodes_leniently() {
        let expense: Expense = serde_json::from_value(json!({
            "id": "1",
            "payer": "Alice",
            "amount": "12.5",
            "involved": ["Alice"],
        }))
        .unwrap();
        assert_eq!(expense.amount, 12.5);

        let expense: Expense = serde_json::from_value(json!({
            "id": "2",
            "payer": "Alice",
            "amount": {"broken": true},
        }))
        .unwrap();
        assert_eq!(expense.amount, 0.0);
        assert!(expense.involved.is_empty());
    }

    #[test]
    fn marker_kind_uses_wire_name() {
        let marker: MapMarker = serde_json::from_value(json!({
            "id": "m1",
            "name": "Namsan Tower",
            "lat": 37.55,
            "lng": 126.99,
            "type": "itinerary",
            "timestamp": 5,
        }))
        .unwrap();
        assert_eq!(marker.kind, MarkerKind::Itinerary);
        let round = serde_json::to_value(&marker).unwrap();
        assert_eq!(round["type"], json!("itinerary"));
    }

    #[test]
    fn settings_use_camel_case_and_default_rate() {
        let settings: TripSettings = serde_json::from_value(json!({
            "destination": "Seoul, South Korea",
            "startDate": "2025-10-01",
            "endDate": "2025-10-07",
        }))
        .unwrap();
        assert_eq!(settings.start_date, "2025-10-01");
        assert_eq!(settings.currency_rate, 1.0);
        assert_eq!(settings.convert(3.0), 3.0);
    }
}
