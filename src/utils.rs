use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone, Utc};

// Offset used by the trip service for expected start/end times (IST).
pub const TRIP_OFFSET_MINUTES: i32 = 5 * 60 + 30;

// `datetime-local` inputs come with or without seconds.
const LOCAL_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

pub fn fixed_offset(offset_minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(offset_minutes * 60)
}

/// Interprets a wall-clock time at `offset_minutes` and formats it as
/// `YYYY-MM-DDTHH:MM:SSZ`. Input that already carries an offset is converted
/// as is.
pub fn local_to_utc_iso(local: &str, offset_minutes: i32) -> Option<String> {
    let local = local.trim();
    if local.is_empty() {
        return None;
    }
    let utc = match DateTime::parse_from_rfc3339(local) {
        Ok(with_offset) => with_offset.with_timezone(&Utc),
        Err(_) => {
            let naive = LOCAL_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(local, format).ok())?;
            fixed_offset(offset_minutes)?
                .from_local_datetime(&naive)
                .single()?
                .with_timezone(&Utc)
        }
    };
    Some(utc.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

pub fn epoch_ms_to_iso(epoch_ms: i64, offset_minutes: i32) -> Option<String> {
    let offset = fixed_offset(offset_minutes)?;
    let time = DateTime::from_timestamp_millis(epoch_ms)?.with_timezone(&offset);
    Some(time.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Strips the UTC marker so the value fits a `datetime-local` input.
pub fn format_for_input(iso: &str) -> String {
    iso.replace('Z', "")
}
