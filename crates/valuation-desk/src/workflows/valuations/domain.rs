use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::status::{self, ValuationStatus};

/// Schema variant a record originated from. Provenance only: workflow logic
/// never branches on the family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormFamily {
    #[serde(rename = "shopForm")]
    ShopForm,
    #[serde(rename = "altFlatForm")]
    AltFlatForm,
    #[serde(rename = "apfForm")]
    ApfForm,
}

impl FormFamily {
    pub const ALL: [FormFamily; 3] = [
        FormFamily::ShopForm,
        FormFamily::AltFlatForm,
        FormFamily::ApfForm,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            FormFamily::ShopForm => "shopForm",
            FormFamily::AltFlatForm => "altFlatForm",
            FormFamily::ApfForm => "apfForm",
        }
    }
}

/// Role of the actor driving a fetch or mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    User,
    Manager,
    Admin,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::User => "user",
            ActorRole::Manager => "manager",
            ActorRole::Admin => "admin",
        }
    }
}

/// Scoping context handed to every source fetch and mutation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewContext {
    pub username: String,
    pub role: ActorRole,
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Untrusted wire shape emitted by the form stores. Every field is optional
/// and scalar values are captured leniently so one malformed record never
/// aborts a whole source fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawValuationRecord {
    #[serde(deserialize_with = "loose_string")]
    pub unique_id: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub status: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub created_at: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub last_updated_at: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub updated_at: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub date_time: Option<String>,
    pub client_name: Option<String>,
    pub city: Option<String>,
    pub bank_name: Option<String>,
    pub engineer_name: Option<String>,
    pub address: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub mobile_number: Option<String>,
    #[serde(deserialize_with = "loose_number")]
    pub payment: Option<f64>,
    pub notes: Option<String>,
    pub manager_feedback: Option<String>,
    pub last_updated_by: Option<String>,
    pub collected_by: Option<String>,
    pub dsa: Option<String>,
    pub username: Option<String>,
    pub client_id: Option<String>,
}

/// One valuation submission after merge: status normalized, timestamps
/// parsed, provenance stamped by the producing source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRecord {
    pub unique_id: Option<String>,
    pub form_family: FormFamily,
    /// `None` means the raw status failed normalization; such records stay
    /// visible in the list but are excluded from status buckets.
    pub status: Option<ValuationStatus>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub date_time: Option<DateTime<Utc>>,
    pub client_name: Option<String>,
    pub city: Option<String>,
    pub bank_name: Option<String>,
    pub engineer_name: Option<String>,
    pub address: Option<String>,
    pub mobile_number: Option<String>,
    pub payment: Option<f64>,
    pub notes: Option<String>,
    pub manager_feedback: Option<String>,
    pub last_updated_by: Option<String>,
    pub collected_by: Option<String>,
    pub dsa: Option<String>,
    pub username: Option<String>,
    pub client_id: Option<String>,
}

impl ValuationRecord {
    pub fn from_raw(raw: RawValuationRecord, family: FormFamily) -> Self {
        ValuationRecord {
            status: status::normalize(raw.status.as_deref()),
            created_at: raw.created_at.as_deref().and_then(parse_instant),
            last_updated_at: raw.last_updated_at.as_deref().and_then(parse_instant),
            updated_at: raw.updated_at.as_deref().and_then(parse_instant),
            date_time: raw.date_time.as_deref().and_then(parse_instant),
            unique_id: raw.unique_id,
            form_family: family,
            client_name: raw.client_name,
            city: raw.city,
            bank_name: raw.bank_name,
            engineer_name: raw.engineer_name,
            address: raw.address,
            mobile_number: raw.mobile_number,
            payment: raw.payment,
            notes: raw.notes,
            manager_feedback: raw.manager_feedback,
            last_updated_by: raw.last_updated_by,
            collected_by: raw.collected_by,
            dsa: raw.dsa,
            username: raw.username,
            client_id: raw.client_id,
        }
    }

    /// Logical identity used by the deduplicator. Empty and whitespace-only
    /// ids count as absent; such records are never collapsed.
    pub fn dedup_key(&self) -> Option<&str> {
        self.unique_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Best-available "last modified" instant:
    /// `last_updated_at` -> `updated_at` -> `created_at`.
    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_updated_at.or(self.updated_at).or(self.created_at)
    }

    /// Approved valuations freeze their visible duration; unknown statuses
    /// are not tracked either.
    pub fn tracks_duration(&self) -> bool {
        matches!(
            self.status,
            Some(
                ValuationStatus::Pending
                    | ValuationStatus::OnProgress
                    | ValuationStatus::Rejected
                    | ValuationStatus::Rework
            )
        )
    }
}

/// Parses source timestamps through an explicit fallback chain instead of
/// any host-default coercion. Unparsable input is `None` and sorts last.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(instant.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }))
}

fn loose_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }))
}
