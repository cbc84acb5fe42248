//! Timeline formatting helpers.

/// Format seconds as `HH:MM:SS.mmm` for plan and progress logs.
///
/// Negative inputs clamp to zero.
pub fn format_seconds(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;
    format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
}

/// Append integer start/end seconds to a provider page URL.
///
/// Not all providers honor time anchors; the numbers are recorded in a
/// standard query string for human use.
pub fn make_timecoded_url(page_url: &str, start_sec: f64, end_sec: f64) -> String {
    if page_url.is_empty() {
        return String::new();
    }
    let s = start_sec.max(0.0);
    let e = end_sec.max(s);
    format!("{}?t={}&t_end={}", page_url, s as u64, e as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "00:00:00.000");
        assert_eq!(format_seconds(90.5), "00:01:30.500");
        assert_eq!(format_seconds(3661.25), "01:01:01.250");
        assert_eq!(format_seconds(-1.0), "00:00:00.000");
    }

    #[test]
    fn test_make_timecoded_url() {
        assert_eq!(
            make_timecoded_url("https://example.com/v/1/", 12.7, 27.9),
            "https://example.com/v/1/?t=12&t_end=27"
        );
        assert_eq!(make_timecoded_url("", 0.0, 1.0), "");
    }
}
