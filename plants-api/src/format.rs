//! Display helpers for timestamps and post cards.
//!
//! Timestamps come from the backend as strings; anything that does not
//! parse is shown as-is.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::{ContentKind, PostSummary, Time};

pub const DEFAULT_TZ: Tz = chrono_tz::Asia::Seoul;

/// RFC 3339, or a naive `yyyy-MM-ddTHH:mm:ss[.f]` read in `tz`
pub fn parse_time(s: &str, tz: Tz) -> Option<Time> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

/// `n분 전` under an hour, `n시간 전` under a day, otherwise the absolute
/// time. Future timestamps count as `0분 전`.
pub fn relative_time(at: Time, now: Time, tz: Tz) -> String {
    let minutes = (now - at).num_minutes().max(0);
    if minutes < 60 {
        format!("{minutes}분 전")
    } else if minutes < 24 * 60 {
        format!("{}시간 전", minutes / 60)
    } else {
        absolute_time(at, tz)
    }
}

pub fn absolute_time(at: Time, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_relative_time(s: &str, now: Time, tz: Tz) -> String {
    match parse_time(s, tz) {
        Some(t) => relative_time(t, now, tz),
        None => String::from(s),
    }
}

pub fn format_absolute_time(s: &str, tz: Tz) -> String {
    match parse_time(s, tz) {
        Some(t) => absolute_time(t, tz),
        None => String::from(s),
    }
}

pub fn format_date(s: &str, tz: Tz) -> String {
    match parse_time(s, tz) {
        Some(t) => t.with_timezone(&tz).format("%Y-%m-%d").to_string(),
        None => String::from(s),
    }
}

/// Card date, `yyyy. MM. dd.`
pub fn format_post_date(s: &str, tz: Tz) -> String {
    match parse_time(s, tz) {
        Some(t) => t.with_timezone(&tz).format("%Y. %m. %d.").to_string(),
        None => String::from(s),
    }
}

/// Verification code countdown, `m:ss`
pub fn format_countdown(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// First image of the card, or one of four stock images picked from the
/// last character of the post id
pub fn thumbnail(post: &PostSummary) -> String {
    if let Some(img) = post
        .content
        .iter()
        .find(|c| c.kind == ContentKind::Image && !c.data.is_empty())
    {
        return img.data.clone();
    }
    let code = post.post_id.0.chars().last().map(|c| c as u32).unwrap_or(0);
    format!("/post/image_0{}.png", code % 4 + 1)
}

/// First text part of the card, empty if none
pub fn excerpt(post: &PostSummary) -> &str {
    post.content
        .iter()
        .find(|c| c.kind == ContentKind::Text)
        .map(|c| c.data.as_str())
        .unwrap_or("")
}
