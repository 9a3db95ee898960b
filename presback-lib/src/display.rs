use std::time::Duration;

/// Width of every progress bar label.
pub const BAR_DESC_WIDTH: usize = 30;

/// Formats a duration as `1h:2m:3s`, `2m:3s` or `3s`, rounded to whole seconds.
pub fn format_time(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64().round() as u64;
    let (m, s) = (secs / 60, secs % 60);
    let (h, m) = (m / 60, m % 60);

    if h > 0 {
        format!("{h}h:{m}m:{s}s")
    } else if m > 0 {
        format!("{m}m:{s}s")
    } else {
        format!("{s}s")
    }
}

/// Mono-spaces a bar label: long names are cut and end in `-`, short ones
/// are padded with spaces.
pub fn format_bar_desc(name: &str) -> String {
    let len = name.chars().count();
    if len >= BAR_DESC_WIDTH {
        let mut cut: String = name.chars().take(BAR_DESC_WIDTH - 1).collect();
        cut.push('-');
        cut
    } else {
        format!("{name:<BAR_DESC_WIDTH$}")
    }
}

/// Convert bytes into a human-friendly string using binary (KiB, MiB, GiB...) units.
pub fn encode_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    // 1.0 MiB prints as 1 MiB
    if (size * 10.0) % 10.0 == 0.0 {
        format!("{:.0} {}", size, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_drops_leading_zero_units() {
        assert_eq!(format_time(Duration::from_secs(0)), "0s");
        assert_eq!(format_time(Duration::from_millis(59_400)), "59s");
        assert_eq!(format_time(Duration::from_millis(59_600)), "1m:0s");
        assert_eq!(format_time(Duration::from_secs(61)), "1m:1s");
        assert_eq!(format_time(Duration::from_secs(3600)), "1h:0m:0s");
        assert_eq!(format_time(Duration::from_secs(3 * 3600 + 25 * 60 + 7)), "3h:25m:7s");
    }

    #[test]
    fn short_names_are_padded() {
        let desc = format_bar_desc("Documents");
        assert_eq!(desc.len(), BAR_DESC_WIDTH);
        assert!(desc.starts_with("Documents "));
    }

    #[test]
    fn long_names_are_cut_with_a_dash() {
        let name = "a".repeat(BAR_DESC_WIDTH);
        let desc = format_bar_desc(&name);
        assert_eq!(desc.chars().count(), BAR_DESC_WIDTH);
        assert!(desc.ends_with("a-"));
    }

    #[test]
    fn cutting_respects_char_boundaries() {
        let name = "é".repeat(40);
        assert_eq!(format_bar_desc(&name).chars().count(), BAR_DESC_WIDTH);
    }

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(encode_size(0), "0 B");
        assert_eq!(encode_size(512), "512 B");
        assert_eq!(encode_size(1024), "1 KiB");
        assert_eq!(encode_size(1536), "1.5 KiB");
        assert_eq!(encode_size(5 * 1024 * 1024), "5 MiB");
    }
}
