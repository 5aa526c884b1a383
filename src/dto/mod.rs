use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod health;
pub mod menu;
pub mod places;
pub mod room;
pub mod validation;
pub mod ws;

/// Render a room timestamp (milliseconds since the epoch) as RFC 3339.
fn format_millis(millis: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|time| time.format(&Rfc3339).ok())
        .unwrap_or_else(|| "invalid-timestamp".into())
}
