//! Value to pixel-row scaling for the strip chart.

/// Map `value` from `[domain_min, domain_max]` onto `[0, range_max]`.
///
/// The result is rounded to the nearest row and then clamped to the output
/// range, so out-of-domain values pin to the nearest edge instead of being
/// extrapolated off the plot. NaN and a degenerate domain both map to 0; the
/// latter is rejected earlier by [`LoggerConfig::validate`].
///
/// [`LoggerConfig::validate`]: crate::config::LoggerConfig::validate
pub fn scale(value: f32, domain_min: f32, domain_max: f32, range_max: u16) -> u16 {
    let span = domain_max - domain_min;
    if value.is_nan() || span.is_nan() || span <= 0.0 {
        return 0;
    }

    let row = libm::roundf((value - domain_min) / span * range_max as f32);
    row.clamp(0.0, range_max as f32) as u16
}
