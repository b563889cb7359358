use serde::{Deserialize, Serialize};

/// Response body for create operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: String,
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserNew {
        pub name: String,
    }

    /// Rename request. Uniqueness is only enforced at creation time;
    /// renames are accepted as-is.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserRename {
        pub name: String,
    }
}

pub mod expense {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        /// Payer referenced by user name, not id (observed data model).
        pub payer: String,
        pub amount: f64,
        pub description: String,
        /// ISO-8601; server uses now() when absent.
        pub date: Option<String>,
        /// Names the cost is split among; empty means "everyone".
        #[serde(default)]
        pub involved: Vec<String>,
    }
}

pub mod itinerary {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ItineraryItemNew {
        pub time: String,
        pub activity: String,
        pub location: String,
        pub notes: Option<String>,
        pub day: u32,
        pub lat: Option<f64>,
        pub lng: Option<f64>,
    }

    /// Partial update; only present fields are merged into the record.
    ///
    /// Merges are add/overwrite only: an absent field leaves the stored
    /// value untouched, so a set `notes` cannot be cleared back to null
    /// through this request. Delete and re-create the item to drop a field.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ItineraryItemUpdate {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub time: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub activity: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub location: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub notes: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub day: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub lat: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub lng: Option<f64>,
    }
}

pub mod chat {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ChatSend {
        pub text: String,
    }
}

pub mod marker {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MarkerNew {
        pub name: String,
        pub lat: f64,
        pub lng: f64,
        #[serde(default)]
        pub description: String,
        pub kind: Option<String>,
        pub time: Option<String>,
        pub day: Option<u32>,
    }
}

pub mod trip {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TripSwitch {
        pub id: String,
    }
}
