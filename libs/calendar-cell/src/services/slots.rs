use shared_models::ClockTime;

use crate::models::DaySettings;

/// Candidate slot labels for one day: `start_time`, then every
/// `interval_minutes`, strictly before `end_time`.
///
/// Empty for closed days, non-positive intervals and `start_time >= end_time`.
/// Stepping never rolls into the next day.
pub fn generate_time_slots(settings: &DaySettings) -> Vec<ClockTime> {
    if !settings.is_open || settings.interval_minutes <= 0 {
        return Vec::new();
    }

    let mut slots = Vec::new();
    let mut current = Some(settings.start_time);

    while let Some(time) = current {
        if time >= settings.end_time {
            break;
        }
        slots.push(time);
        current = time.checked_add_minutes(i64::from(settings.interval_minutes));
    }

    slots
}
