//! Quiet-hours window evaluation for outbound notifications.

use chrono::{DateTime, Local, Timelike, Utc};
use chrono_tz::Tz;
use tracing::warn;

use tether_types::{minute_of_day, QuietHoursConfig};

/// Whether minute-of-day `current` falls inside `[start, end)`.
///
/// A start later than the end wraps midnight. Equal bounds form an empty
/// window.
pub fn window_contains(start: u32, end: u32, current: u32) -> bool {
    if start <= end {
        current >= start && current < end
    } else {
        current >= start || current < end
    }
}

/// `HH:MM` convenience form of [`window_contains`]. Unparseable input is
/// never inside the window.
pub fn in_window(start: &str, end: &str, now: &str) -> bool {
    match (
        minute_of_day(start, false),
        minute_of_day(end, true),
        minute_of_day(now, false),
    ) {
        (Some(s), Some(e), Some(n)) => window_contains(s, e, n),
        _ => false,
    }
}

/// A validated quiet-hours window.
#[derive(Debug, Clone, PartialEq)]
pub struct QuietHours {
    start: u32,
    end: u32,
    /// `None` reads the machine's local clock.
    zone: Option<Tz>,
}

impl QuietHours {
    /// Build the window from config. Returns `None` when quiet hours are
    /// disabled or the bounds don't parse, meaning nothing is ever suppressed.
    pub fn from_config(cfg: &QuietHoursConfig) -> Option<Self> {
        if !cfg.enabled {
            return None;
        }
        let (Some(start), Some(end)) = (cfg.start_minute(), cfg.end_minute()) else {
            warn!(
                start = cfg.start,
                end = cfg.end,
                "invalid quiet-hours bounds, quiet hours disabled"
            );
            return None;
        };
        Some(Self {
            start,
            end,
            zone: Self::zone(cfg.timezone.as_deref()),
        })
    }

    fn zone(name: Option<&str>) -> Option<Tz> {
        let name = name.map(str::trim).filter(|n| !n.is_empty())?;
        if name.eq_ignore_ascii_case("local") {
            return None;
        }
        name.parse::<Tz>()
            .map_err(|_| warn!(timezone = name, "unknown quiet-hours timezone, using local time"))
            .ok()
    }

    /// Whether the instant `now` lies inside the window, in the configured zone.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let (hour, minute) = match self.zone {
            Some(tz) => {
                let t = now.with_timezone(&tz);
                (t.hour(), t.minute())
            }
            None => {
                let t = now.with_timezone(&Local);
                (t.hour(), t.minute())
            }
        };
        window_contains(self.start, self.end, hour * 60 + minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn overnight_window_wraps_midnight() {
        for inside in ["23:00", "23:30", "00:00", "06:59"] {
            assert!(in_window("23:00", "07:00", inside), "{inside} should be inside");
        }
        for outside in ["12:00", "07:00", "07:01", "22:59"] {
            assert!(!in_window("23:00", "07:00", outside), "{outside} should be outside");
        }
    }

    #[test]
    fn daytime_window_is_half_open() {
        assert!(in_window("09:00", "17:00", "09:00"));
        assert!(in_window("09:00", "17:00", "16:59"));
        assert!(!in_window("09:00", "17:00", "08:59"));
        assert!(!in_window("09:00", "17:00", "17:00"));
    }

    #[test]
    fn equal_bounds_are_empty() {
        assert!(!in_window("09:00", "09:00", "09:00"));
        assert!(!in_window("09:00", "09:00", "21:00"));
    }

    #[test]
    fn end_of_day_bound() {
        assert!(in_window("22:00", "24:00", "23:59"));
        assert!(!in_window("22:00", "24:00", "00:00"));
    }

    #[test]
    fn garbage_is_never_inside() {
        assert!(!in_window("late", "07:00", "23:30"));
        assert!(!in_window("23:00", "07:00", "25:00"));
    }

    #[test]
    fn disabled_or_invalid_config_has_no_window() {
        let mut cfg = QuietHoursConfig::default();
        assert!(QuietHours::from_config(&cfg).is_none());

        cfg.enabled = true;
        cfg.start = "nope".into();
        assert!(QuietHours::from_config(&cfg).is_none());
    }

    #[test]
    fn named_timezone_is_applied() {
        let cfg = QuietHoursConfig {
            enabled: true,
            start: "23:00".into(),
            end: "07:00".into(),
            timezone: Some("Asia/Tokyo".into()),
        };
        let quiet = QuietHours::from_config(&cfg).unwrap();

        // 15:30 UTC is 00:30 in Tokyo.
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 15, 30, 0).unwrap();
        assert!(quiet.contains(late));

        // 03:00 UTC is 12:00 in Tokyo.
        let noon = Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap();
        assert!(!quiet.contains(noon));
    }

    #[test]
    fn local_or_unknown_zone_uses_local_clock() {
        for name in [None, Some(""), Some("Local"), Some("Mars/Olympus")] {
            let cfg = QuietHoursConfig {
                enabled: true,
                timezone: name.map(String::from),
                ..Default::default()
            };
            assert_eq!(QuietHours::from_config(&cfg).unwrap().zone, None, "{name:?}");
        }
    }

    #[test]
    fn utc_timezone_name() {
        let cfg = QuietHoursConfig {
            enabled: true,
            start: "09:00".into(),
            end: "17:00".into(),
            timezone: Some("UTC".into()),
        };
        let quiet = QuietHours::from_config(&cfg).unwrap();
        assert!(quiet.contains(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()));
        assert!(!quiet.contains(Utc.with_ymd_and_hms(2024, 1, 1, 17, 0, 0).unwrap()));
    }
}
