//! Date <-> timeline position mapping and zoom labels.
//!
//! The timeline renders one calendar day per "page"; a date maps to a
//! fraction of its day, and from there to a pixel offset inside a page
//! of a given width. All conversions are pure so the round trip
//! `date_from_position(position_from_date(d, w), w, d) == d` holds to
//! millisecond precision.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};

/// Milliseconds in one day.
pub const DAY_MS: f64 = 86_400_000.0;

/// Midnight (UTC) of the date's calendar day.
pub fn day_start(date: DateTime<Utc>) -> DateTime<Utc> {
    date.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Fraction of the day elapsed at `date`, in `[0, 1)`.
///
/// Callers must tolerate small overflow past 1.0 while a drag crosses a
/// day boundary.
pub fn percent_from_date(date: DateTime<Utc>) -> f64 {
    let ms_only = (date - day_start(date)).num_milliseconds() as f64;
    ms_only / DAY_MS
}

/// Like [`percent_from_date`] but anchored to another date's calendar
/// day, so a drag crossing midnight yields values outside `[0, 1)`
/// instead of wrapping.
pub fn percent_from_date_anchored(date: DateTime<Utc>, anchor: DateTime<Utc>) -> f64 {
    let ms_only = (date - day_start(anchor)).num_milliseconds() as f64;
    ms_only / DAY_MS
}

/// Pixel offset of `date` inside a day page of `width_px`.
pub fn position_from_date(date: DateTime<Utc>, width_px: f64) -> f64 {
    percent_from_date(date) * width_px
}

/// Inverse of [`position_from_date`]: the instant at pixel `pos_px`
/// inside the day page of `anchor`'s calendar day.
pub fn date_from_position(pos_px: f64, width_px: f64, anchor: DateTime<Utc>) -> DateTime<Utc> {
    let ms_only = (pos_px / width_px) * DAY_MS;
    day_start(anchor) + TimeDelta::milliseconds(ms_only.round() as i64)
}

/// Human label for a zoom level.
///
/// Zoom is a power-of-two multiplier over the default one-day view:
/// below 1x the page spans multiple days, up to 16x it is labelled in
/// hours, beyond that in minutes. Past 32x the minute count stops being
/// whole, so it is rounded to the nearest ten.
pub fn zoom_label(zoom: f64) -> String {
    if zoom < 1.0 {
        format!("{} days", 1.0 / zoom)
    } else if zoom < 16.0 {
        format!("{} hrs", 24.0 / zoom)
    } else {
        let mins = 1440.0 / zoom;
        if mins.fract() == 0.0 {
            format!("{} mins", mins)
        } else {
            format!("{} mins", (mins / 10.0).round() * 10.0)
        }
    }
}
