//! Human-readable playback clock formatting
//!
//! Consistent elapsed/duration display for the presentation layer.

/// Format seconds as a `M:SS` clock.
///
/// Minutes are not wrapped into hours; fractional seconds are truncated.
/// Negative and non-finite values display as `0:00`.
///
/// # Examples
///
/// ```
/// use vinavoice_common::human_time::format_clock;
///
/// assert_eq!(format_clock(0.0), "0:00");
/// assert_eq!(format_clock(5.9), "0:05");
/// assert_eq!(format_clock(75.0), "1:15");
/// assert_eq!(format_clock(3725.0), "62:05");
/// ```
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }

    let whole = seconds.floor() as u64;
    let minutes = whole / 60;
    let secs = whole % 60;
    format!("{}:{:02}", minutes, secs)
}

/// Playback progress as a percentage in `[0, 100]`.
///
/// A zero or non-finite duration yields 0 rather than NaN.
pub fn progress_percent(elapsed: f64, duration: f64) -> f64 {
    let percent = (elapsed / duration) * 100.0;
    if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Format an elapsed/duration pair as `M:SS / M:SS (NN%)`
pub fn format_progress(elapsed: f64, duration: f64) -> String {
    format!(
        "{} / {} ({:.0}%)",
        format_clock(elapsed),
        format_clock(duration),
        progress_percent(elapsed, duration)
    )
}
