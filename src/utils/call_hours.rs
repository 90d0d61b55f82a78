// Call-hour window gate. Broadcast texts may only go out during the
// configured Pacific-time window unless the gate is disabled, the message
// carries the internal test flag, or the worker runs in development.

use chrono::{Timelike, Utc};
use chrono_tz::America::Los_Angeles;

use crate::app_config::{AppConfig, Environment};

/// Current hour of day in the Pacific timezone
pub fn current_pacific_hour() -> u32 {
    Utc::now().with_timezone(&Los_Angeles).hour()
}

/// Whether an hour falls inside the `[start, end)` send window
pub fn hour_within_window(hour: u32, start: u32, end: u32) -> bool {
    hour >= start && hour < end
}

/// Whether sending is currently allowed under the configured gate
pub fn in_call_hours(config: &AppConfig) -> bool {
    if !config.enforce_call_hours {
        return true;
    }
    hour_within_window(
        current_pacific_hour(),
        config.call_start_hour,
        config.call_end_hour,
    )
}

/// Internal test messages are exempt from the call-hour gate; so is the
/// development environment.
pub fn is_internal_test(message: &str, env: Environment, test_flag: &str) -> bool {
    message.contains(test_flag) || env == Environment::Development
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_boundaries_are_half_open() {
        // start hour is allowed, end hour is not
        assert!(hour_within_window(8, 8, 20));
        assert!(!hour_within_window(20, 8, 20));
        assert!(hour_within_window(19, 8, 20));
        assert!(!hour_within_window(7, 8, 20));
        assert!(!hour_within_window(23, 8, 20));
    }

    #[test]
    fn test_flag_and_dev_env_bypass_the_gate() {
        let flag = "96JCAKZ7(7DN";
        assert!(is_internal_test(
            "promo body 96JCAKZ7(7DN trailer",
            Environment::Production,
            flag
        ));
        assert!(is_internal_test("plain body", Environment::Development, flag));
        assert!(!is_internal_test("plain body", Environment::Production, flag));
    }
}
