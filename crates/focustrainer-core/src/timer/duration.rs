//! Phase duration lookup.

use super::phase::Phase;
use crate::storage::TimerSettings;

pub const MS_PER_MINUTE: u64 = 60_000;

/// Target duration of `phase` in milliseconds.
///
/// Uses saturating arithmetic so an absurd minute value cannot overflow.
pub fn resolve_duration(phase: Phase, settings: &TimerSettings) -> u64 {
    let minutes = match phase {
        Phase::Focus => settings.focus_duration,
        Phase::ShortBreak => settings.short_break,
        Phase::LongBreak => settings.long_break,
    };
    minutes_to_ms(minutes)
}

pub fn minutes_to_ms(minutes: u32) -> u64 {
    u64::from(minutes).saturating_mul(MS_PER_MINUTE)
}

/// Format milliseconds as `MM:SS`, rounding partial seconds up.
pub fn format_remaining(ms: u64) -> String {
    let total_secs = ms.div_ceil(1000);
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_settings_durations() {
        let settings = TimerSettings::default();
        assert_eq!(resolve_duration(Phase::Focus, &settings), 1_500_000);
        assert_eq!(resolve_duration(Phase::ShortBreak, &settings), 300_000);
        assert_eq!(resolve_duration(Phase::LongBreak, &settings), 900_000);
    }

    #[test]
    fn format_rounds_up_partial_seconds() {
        assert_eq!(format_remaining(0), "00:00");
        assert_eq!(format_remaining(1), "00:01");
        assert_eq!(format_remaining(59_001), "01:00");
        assert_eq!(format_remaining(1_500_000), "25:00");
        assert_eq!(format_remaining(3_600_000 + 61_000), "61:01");
    }

    proptest! {
        #[test]
        fn resolved_duration_is_minutes_times_60000(
            focus in 0u32..10_000,
            short in 0u32..10_000,
            long in 0u32..10_000,
        ) {
            let settings = TimerSettings {
                focus_duration: focus,
                short_break: short,
                long_break: long,
                ..TimerSettings::default()
            };
            prop_assert_eq!(resolve_duration(Phase::Focus, &settings), u64::from(focus) * 60_000);
            prop_assert_eq!(resolve_duration(Phase::ShortBreak, &settings), u64::from(short) * 60_000);
            prop_assert_eq!(resolve_duration(Phase::LongBreak, &settings), u64::from(long) * 60_000);
        }
    }
}
