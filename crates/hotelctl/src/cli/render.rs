use hotelstore::{BackupSnapshot, Listing, MigrationReport};
use serde_json::{json, Value};

pub fn listing(listing: &Listing) -> Value {
    json!(listing)
}

pub fn listings(listings: &[Listing]) -> Value {
    json!(listings)
}

/// `null` when the id was not pending.
pub fn approved(listing: Option<&Listing>) -> Value {
    json!(listing)
}

pub fn done(action: &str, id: &str) -> Value {
    json!({ "ok": true, "action": action, "id": id })
}

pub fn backup(snapshot: &BackupSnapshot) -> Value {
    json!({
        "timestamp": snapshot.timestamp,
        "version": snapshot.version,
        "hotels": snapshot.hotels.len(),
        "pendingHotels": snapshot.pending_hotels.len(),
    })
}

pub fn restored(snapshot: Option<&BackupSnapshot>) -> Value {
    match snapshot {
        Some(snapshot) => json!({ "restored": true, "backup": backup(snapshot) }),
        None => json!({ "restored": false }),
    }
}

pub fn report(report: &MigrationReport) -> Value {
    json!(report)
}

/// Pretty for single results, one line per delivery when streaming.
pub fn print(value: &Value, compact: bool) {
    let out = if compact {
        value.to_string()
    } else {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    };
    println!("{}", out);
}
