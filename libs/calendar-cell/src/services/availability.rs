use chrono::{NaiveDate, NaiveDateTime};

use shared_models::ClockTime;

use crate::models::{BookedInterval, DaySettings, SlotStatus, SlotView};
use crate::services::slots::generate_time_slots;

/// Everything about the viewer and the day that affects availability.
#[derive(Debug, Clone, Copy)]
pub struct SlotContext<'a> {
    pub date: NaiveDate,
    /// Clinic-local wall clock.
    pub now: NaiveDateTime,
    pub viewer_is_admin: bool,
    pub booked: &'a [BookedInterval],
}

/// Status of a single slot. Precedence: blocked, lunch, booked, past.
/// The past check only applies to non-admin viewers.
pub fn classify_slot(
    settings: &DaySettings,
    time: ClockTime,
    ctx: &SlotContext<'_>,
) -> SlotStatus {
    if settings.is_blocked(time) {
        return SlotStatus::Blocked;
    }
    if settings.is_lunch_break(time) {
        return SlotStatus::LunchBreak;
    }
    if ctx
        .booked
        .iter()
        .any(|booked| booked.overlaps(time, settings.interval_minutes))
    {
        return SlotStatus::Booked;
    }
    if !ctx.viewer_is_admin && is_past(ctx.date, time, ctx.now) {
        return SlotStatus::Past;
    }
    SlotStatus::Available
}

fn is_past(date: NaiveDate, time: ClockTime, now: NaiveDateTime) -> bool {
    let today = now.date();
    if date < today {
        return true;
    }
    date == today && time.as_naive() <= now.time()
}

/// Applies the availability rules to already generated slots.
///
/// Admins get every slot back, tagged with its status. Everyone else only
/// gets the available ones.
pub fn filter_slots(
    settings: &DaySettings,
    slots: &[ClockTime],
    ctx: &SlotContext<'_>,
) -> Vec<SlotView> {
    slots
        .iter()
        .map(|&time| SlotView {
            time,
            status: classify_slot(settings, time, ctx),
        })
        .filter(|slot| ctx.viewer_is_admin || slot.is_available())
        .collect()
}

/// Slot generation followed by filtering.
pub fn compute_day_slots(settings: &DaySettings, ctx: &SlotContext<'_>) -> Vec<SlotView> {
    let slots = generate_time_slots(settings);
    filter_slots(settings, &slots, ctx)
}
