/// Full counting range of the sensor's level ADC.
pub const RAW_LEVEL_MIN: f64 = 0.0;
pub const RAW_LEVEL_MAX: f64 = 4095.0;

/// Physical volume range the raw level is mapped onto.
pub const VOLUME_MIN: f64 = 0.0;
pub const VOLUME_MAX: f64 = 18.0;

/// Clamp `input` into `[in_min, in_max]` and map it linearly onto `[out_min, out_max]`.
///
/// The upper bound is applied before the lower bound, so an inverted input
/// range (`in_min > in_max`) always clamps to `in_min`.
///
/// Returns `None` for a degenerate input range (`in_min == in_max`).
pub fn scale(input: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> Option<f64> {
    let span = in_max - in_min;
    if span == 0.0 {
        return None;
    }

    let upper = if input > in_max { in_max } else { input };
    let clamped = if in_min > upper { in_min } else { upper };

    Some((out_max - out_min) / span * (clamped - in_min) + out_min)
}

/// Convert a raw level count into volume units, rounded to two decimals.
pub fn raw_level_to_volume(raw_level: u16) -> f64 {
    // The range constants are never degenerate
    let volume = scale(
        raw_level as f64,
        RAW_LEVEL_MIN,
        RAW_LEVEL_MAX,
        VOLUME_MIN,
        VOLUME_MAX,
    )
    .unwrap_or(VOLUME_MIN);
    round_to_hundredths(volume)
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
