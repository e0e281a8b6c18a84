//! Display helpers shared by arbitration reasons and the UI layer.

/// Owner colours handed out to players.
pub const PLAYER_COLORS: [&str; 8] = [
    "#00f5a0", "#ff6b6b", "#ffd166", "#06d6a0", "#118ab2", "#ef476f", "#a8dadc", "#f4a261",
];

/// Format seconds as `MM:SS`, or `H:MM:SS` for runs of an hour or more.
///
/// ```
/// use territory_core::format_duration;
/// assert_eq!(format_duration(300), "05:00");
/// assert_eq!(format_duration(3725), "1:02:05");
/// ```
pub fn format_duration(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// Format seconds as `MM:SS` with no hour field; minutes keep counting past 59.
///
/// ```
/// use territory_core::format::format_minutes_seconds;
/// assert_eq!(format_minutes_seconds(300), "05:00");
/// assert_eq!(format_minutes_seconds(3725), "62:05");
/// ```
pub fn format_minutes_seconds(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Format meters as `"N m"` below one kilometre and `"x.xx km"` above.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{} m", meters.round())
    }
}

/// Pick a stable colour for a player from the first character of their id.
pub fn player_color(player_id: &str) -> &'static str {
    // Char code of the first character, as the store's clients have always used
    let code = player_id.chars().next().map_or(0, |c| c as usize);
    PLAYER_COLORS[code % PLAYER_COLORS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(59), "00:59");
        assert_eq!(format_duration(310), "05:10");
        assert_eq!(format_duration(3599), "59:59");
        assert_eq!(format_duration(3600), "1:00:00");
    }

    #[test]
    fn test_format_minutes_seconds() {
        assert_eq!(format_minutes_seconds(0), "00:00");
        assert_eq!(format_minutes_seconds(3599), "59:59");
        assert_eq!(format_minutes_seconds(3600), "60:00");
        assert_eq!(format_minutes_seconds(6000), "100:00");
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(499.6), "500 m");
        assert_eq!(format_distance(1000.0), "1.00 km");
        assert_eq!(format_distance(12_340.0), "12.34 km");
    }

    #[test]
    fn test_player_color_is_stable() {
        // 'a' = 97, 97 % 8 = 1
        assert_eq!(player_color("abc"), "#ff6b6b");
        assert_eq!(player_color("abc"), player_color("axe"));
        assert_eq!(player_color(""), PLAYER_COLORS[0]);
    }
}
