// src/utils/format.rs
//! Human-readable rendering of rates and durations

use std::time::Duration;

const RATE_UNITS: [&str; 5] = ["H/s", "KH/s", "MH/s", "GH/s", "TH/s"];

/// Formats a hash rate with two decimals and a scaled unit
///
/// ```
/// use farm_miner_rs::utils::format::format_hashrate;
/// assert_eq!(format_hashrate(300.0), "300.00 H/s");
/// assert_eq!(format_hashrate(1_250_000.0), "1.25 MH/s");
/// ```
pub fn format_hashrate(rate: f64) -> String {
    let mut value = if rate.is_finite() && rate > 0.0 { rate } else { 0.0 };
    let mut unit = 0;
    while value >= 1000.0 && unit < RATE_UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.2} {}", value, RATE_UNITS[unit])
}

/// Formats an uptime as `HH:MM:SS`, prefixed with `<d>d ` past one day
pub fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;
    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashrate_units() {
        assert_eq!(format_hashrate(0.0), "0.00 H/s");
        assert_eq!(format_hashrate(999.0), "999.00 H/s");
        assert_eq!(format_hashrate(1500.0), "1.50 KH/s");
        assert_eq!(format_hashrate(32_400_000_000.0), "32.40 GH/s");
    }

    #[test]
    fn test_hashrate_rejects_negative_and_nan() {
        assert_eq!(format_hashrate(-5.0), "0.00 H/s");
        assert_eq!(format_hashrate(f64::NAN), "0.00 H/s");
    }

    #[test]
    fn test_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(65)), "00:01:05");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d 01:01:01");
    }
}
