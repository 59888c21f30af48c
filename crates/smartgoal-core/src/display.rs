//! Small formatting helpers shared by the renderers and the CLI.

use chrono::{DateTime, Utc};

/// Formats a timestamp like `May 24, 2024, 10:25 AM`.
#[must_use]
pub fn friendly_date(ts: &DateTime<Utc>) -> String {
    ts.format("%b %d, %Y, %I:%M %p").to_string()
}

/// Picks a deterministic `#rrggbb` colour for a string.
///
/// Used for avatar backgrounds; keyed by email when available so accounts
/// sharing a display name still get distinct colours.
///
/// # Examples
///
/// ```
/// use smartgoal_core::string_to_color;
///
/// assert_eq!(string_to_color(""), "#000000");
/// assert_eq!(string_to_color("a"), string_to_color("a"));
/// ```
#[must_use]
pub fn string_to_color(s: &str) -> String {
    let hash = s.encode_utf16().fold(0_i32, |hash, unit| {
        i32::from(unit).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    });

    let mut color = String::from("#");
    for i in 0..3 {
        let byte = (hash >> (i * 8)) & 0xff;
        color.push_str(&format!("{byte:02x}"));
    }
    color
}

/// First letter of the first and last words of a name, uppercased.
///
/// # Examples
///
/// ```
/// use smartgoal_core::initials;
///
/// assert_eq!(initials("ada king lovelace"), "AL");
/// assert_eq!(initials("Plato"), "PP");
/// assert_eq!(initials(""), "");
/// ```
#[must_use]
pub fn initials(name: &str) -> String {
    let mut words = name.split_whitespace();
    let first = words.next();
    let last = words.last().or(first);

    [first, last]
        .into_iter()
        .flatten()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Likert label for a star rating; anything outside 1–5 is "Not specified".
#[must_use]
pub const fn star_label(rating: Option<u8>) -> &'static str {
    match rating {
        Some(1) => "Very dissatisfied",
        Some(2) => "Dissatisfied",
        Some(3) => "Unsure",
        Some(4) => "Satisfied",
        Some(5) => "Very satisfied",
        _ => "Not specified",
    }
}
