//! # Domain Model: Listings, Snapshots and Reports
//!
//! A [`Listing`] is a hotel/property record. The store is agnostic to the
//! caller's payload: name, address, rate tables and anything else travel in
//! [`Listing::fields`] untouched. Only the lifecycle fields the store injects
//! itself are typed:
//!
//! | Field        | Set by                                     |
//! |--------------|--------------------------------------------|
//! | `status`     | create (`pending`), approve (`approved`)   |
//! | `createdAt`  | create                                     |
//! | `updatedAt`  | create, approve, update                    |
//! | `approvedAt` | approve                                    |
//!
//! ## Identity
//!
//! [`ListingId`] is either a local millisecond-timestamp id (a JSON number) or
//! an opaque remote document id (a JSON string). Both shapes are accepted on
//! read, so data written in one mode stays readable in the other.
//!
//! ## Lenient Timestamps
//!
//! Lifecycle timestamps are parsed leniently: RFC 3339 strings and integer
//! epoch milliseconds are understood. Anything else is treated as missing for
//! ordering purposes, but the raw value is kept in `fields` so it round-trips
//! unchanged. A missing `createdAt` sorts as the epoch (oldest).

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Caller-supplied listing attributes.
pub type Fields = Map<String, Value>;

/// Wire names of the fields the store manages itself.
pub mod field {
    pub const ID: &str = "id";
    pub const STATUS: &str = "status";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const APPROVED_AT: &str = "approvedAt";
    pub const MIGRATED_AT: &str = "migratedAt";
    pub const ORIGINAL_ID: &str = "originalId";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Pending,
    Approved,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Approved => "approved",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(ListingStatus::Pending),
            "approved" => Some(ListingStatus::Approved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListingId {
    /// Issued by the local store from the client clock.
    Local(i64),
    /// Assigned by the remote document store.
    Remote(String),
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingId::Local(millis) => write!(f, "{}", millis),
            ListingId::Remote(id) => f.write_str(id),
        }
    }
}

impl FromStr for ListingId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(millis) => ListingId::Local(millis),
            Err(_) => ListingId::Remote(s.to_string()),
        })
    }
}

impl From<i64> for ListingId {
    fn from(millis: i64) -> Self {
        ListingId::Local(millis)
    }
}

impl From<String> for ListingId {
    fn from(id: String) -> Self {
        ListingId::Remote(id)
    }
}

impl From<&str> for ListingId {
    fn from(id: &str) -> Self {
        ListingId::Remote(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Fields,
}

// Lifecycle fields that fail to parse are handed back to `fields` verbatim
// instead of failing the whole record.
impl<'de> Deserialize<'de> for Listing {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let helper = ListingHelper::deserialize(deserializer)?;
        let mut fields = helper.fields;

        let status = helper.status.and_then(|raw| {
            let parsed = raw.as_str().and_then(ListingStatus::parse);
            if parsed.is_none() {
                fields.insert(field::STATUS.to_string(), raw);
            }
            parsed
        });

        let mut timestamp = |key: &str, raw: Option<Value>| {
            raw.and_then(|raw| {
                let parsed = parse_timestamp(&raw);
                if parsed.is_none() {
                    fields.insert(key.to_string(), raw);
                }
                parsed
            })
        };
        let created_at = timestamp(field::CREATED_AT, helper.created_at);
        let updated_at = timestamp(field::UPDATED_AT, helper.updated_at);
        let approved_at = timestamp(field::APPROVED_AT, helper.approved_at);

        Ok(Listing {
            id: helper.id,
            status,
            created_at,
            updated_at,
            approved_at,
            fields,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingHelper {
    id: ListingId,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    created_at: Option<Value>,
    #[serde(default)]
    updated_at: Option<Value>,
    #[serde(default)]
    approved_at: Option<Value>,
    #[serde(flatten)]
    fields: Fields,
}

/// Parses an RFC 3339 string or integer epoch milliseconds.
pub fn parse_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

impl Listing {
    /// A record with no lifecycle fields set yet. Caller values for the
    /// managed keys are dropped; the store owns those.
    pub fn new(id: ListingId, mut fields: Fields) -> Self {
        for key in [
            field::ID,
            field::STATUS,
            field::CREATED_AT,
            field::UPDATED_AT,
            field::APPROVED_AT,
        ] {
            fields.remove(key);
        }
        Self {
            id,
            status: None,
            created_at: None,
            updated_at: None,
            approved_at: None,
            fields,
        }
    }

    /// Builds a listing from a remote document's id and stored fields.
    pub fn from_document(id: &str, fields: &Fields) -> Result<Self> {
        let mut object = fields.clone();
        object.insert(field::ID.to_string(), Value::String(id.to_string()));
        Ok(serde_json::from_value(Value::Object(object))?)
    }

    /// Everything except the id, as it would be stored in a document body.
    pub fn to_fields(&self) -> Result<Fields> {
        let mut object = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Fields::new(),
        };
        object.remove(field::ID);
        Ok(object)
    }

    /// Returns a copy with `patch` merged over the current fields. The id
    /// is never patched.
    pub fn merged(&self, patch: &Fields) -> Result<Self> {
        let mut object = self.to_fields()?;
        for (key, value) in patch {
            if key != field::ID {
                object.insert(key.clone(), value.clone());
            }
        }
        object.insert(field::ID.to_string(), serde_json::to_value(&self.id)?);
        Ok(serde_json::from_value(Value::Object(object))?)
    }

    // Setters drop any unparseable raw value parked in `fields` so a key is
    // never serialized twice.

    pub fn set_status(&mut self, status: ListingStatus) {
        self.fields.remove(field::STATUS);
        self.status = Some(status);
    }

    pub fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.fields.remove(field::CREATED_AT);
        self.created_at = Some(at);
    }

    pub fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.fields.remove(field::UPDATED_AT);
        self.updated_at = Some(at);
    }

    pub fn set_approved_at(&mut self, at: DateTime<Utc>) {
        self.fields.remove(field::APPROVED_AT);
        self.approved_at = Some(at);
    }

    pub fn is_approved(&self) -> bool {
        self.status == Some(ListingStatus::Approved)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Sort key used for listing order; missing timestamps are the epoch.
    pub fn created_key(&self) -> DateTime<Utc> {
        self.created_at.unwrap_or_default()
    }
}

/// Orders newest first by `createdAt`. The sort is stable, so records with
/// equal timestamps keep their incoming relative order.
pub fn sort_newest_first(listings: &mut [Listing]) {
    listings.sort_by(|a, b| b.created_key().cmp(&a.created_key()));
}

/// Single-slot export of both collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub hotels: Vec<Listing>,
    pub pending_hotels: Vec<Listing>,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

pub const BACKUP_VERSION: &str = "1.0";

/// Outcome of copying the local collections into the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub migrated_count: usize,
    pub error_count: usize,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn local_ids_are_numbers_and_remote_ids_are_strings() {
        let local: Listing = serde_json::from_value(json!({"id": 1700000000000i64})).unwrap();
        assert_eq!(local.id, ListingId::Local(1_700_000_000_000));

        let remote: Listing = serde_json::from_value(json!({"id": "a1b2"})).unwrap();
        assert_eq!(remote.id, ListingId::Remote("a1b2".into()));

        let out = serde_json::to_value(&local).unwrap();
        assert_eq!(out["id"], json!(1700000000000i64));
    }

    #[test]
    fn listing_id_from_str() {
        assert_eq!("42".parse::<ListingId>().unwrap(), ListingId::Local(42));
        assert_eq!(
            "8f1c-remote".parse::<ListingId>().unwrap(),
            ListingId::Remote("8f1c-remote".into())
        );
    }

    #[test]
    fn caller_fields_pass_through() {
        let listing: Listing = serde_json::from_value(json!({
            "id": 7,
            "name": "Lake View Inn",
            "rate": 100,
            "rooms": [{"kind": "double", "rate": 120}],
            "status": "pending",
        }))
        .unwrap();

        assert_eq!(listing.status, Some(ListingStatus::Pending));
        assert_eq!(listing.field("name"), Some(&json!("Lake View Inn")));
        assert_eq!(listing.field("rooms").unwrap()[0]["rate"], json!(120));
        assert!(listing.field("status").is_none());
    }

    #[test]
    fn created_at_accepts_rfc3339_and_millis() {
        let a: Listing =
            serde_json::from_value(json!({"id": 1, "createdAt": "2024-05-01T10:00:00Z"})).unwrap();
        let b: Listing =
            serde_json::from_value(json!({"id": 2, "createdAt": 1714557600000i64})).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(a.created_at, Some(expected));
        assert_eq!(b.created_at, Some(expected));
    }

    #[test]
    fn unparseable_lifecycle_values_round_trip() {
        let raw = json!({"id": 1, "createdAt": "last tuesday", "status": "archived"});
        let listing: Listing = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(listing.created_at, None);
        assert_eq!(listing.status, None);
        assert_eq!(listing.created_key(), DateTime::<Utc>::default());
        assert_eq!(serde_json::to_value(&listing).unwrap(), raw);
    }

    #[test]
    fn sort_puts_newest_first_and_missing_last() {
        let at = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
        let mut old = Listing::new(ListingId::Local(1), Fields::new());
        old.set_created_at(at(1));
        let mut new = Listing::new(ListingId::Local(2), Fields::new());
        new.set_created_at(at(9));
        let missing = Listing::new(ListingId::Local(3), Fields::new());

        let mut listings = vec![missing, old, new];
        sort_newest_first(&mut listings);

        let ids: Vec<_> = listings.iter().map(|l| l.id.clone()).collect();
        assert_eq!(
            ids,
            vec![ListingId::Local(2), ListingId::Local(1), ListingId::Local(3)]
        );
    }

    #[test]
    fn sort_keeps_ties_in_input_order() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut listings: Vec<Listing> = (1..=4)
            .map(|i| {
                let mut l = Listing::new(ListingId::Local(i), Fields::new());
                l.set_created_at(at);
                l
            })
            .collect();
        sort_newest_first(&mut listings);
        let ids: Vec<_> = listings.iter().map(|l| l.id.clone()).collect();
        assert_eq!(ids, (1..=4).map(ListingId::Local).collect::<Vec<_>>());
    }

    #[test]
    fn merged_applies_patch_but_never_the_id() {
        let listing = Listing::new(ListingId::Local(5), fields(json!({"name": "Old", "rate": 80})));
        let merged = listing
            .merged(&fields(json!({"id": 99, "name": "New", "status": "approved"})))
            .unwrap();

        assert_eq!(merged.id, ListingId::Local(5));
        assert_eq!(merged.field("name"), Some(&json!("New")));
        assert_eq!(merged.field("rate"), Some(&json!(80)));
        assert!(merged.is_approved());
    }

    #[test]
    fn new_drops_caller_lifecycle_keys() {
        let listing = Listing::new(
            ListingId::Local(1),
            fields(json!({"name": "A", "status": "approved", "createdAt": "bogus"})),
        );
        assert_eq!(listing.status, None);
        assert_eq!(listing.fields.len(), 1);
    }

    #[test]
    fn setters_replace_parked_raw_values() {
        let mut listing: Listing =
            serde_json::from_value(json!({"id": 1, "createdAt": "soon"})).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap();
        listing.set_created_at(at);

        let out = serde_json::to_value(&listing).unwrap();
        assert_eq!(out["createdAt"], json!("2024-02-02T00:00:00Z"));
        assert!(!listing.fields.contains_key("createdAt"));
    }

    #[test]
    fn document_conversion_overrides_stored_id() {
        let body = fields(json!({"id": "stale", "name": "Dune Camp"}));
        let listing = Listing::from_document("doc-1", &body).unwrap();
        assert_eq!(listing.id, ListingId::Remote("doc-1".into()));

        let back = listing.to_fields().unwrap();
        assert!(!back.contains_key("id"));
        assert_eq!(back["name"], json!("Dune Camp"));
    }
}
