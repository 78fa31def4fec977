use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::SchedulingError;
use crate::models::appointment::{ExistingAppointment, TimeSlot};
use crate::models::calendar::CalendarConfig;
use crate::models::time_window::{
    intervals_overlap, is_within_business_hours, minute_of_day_in, MINUTES_PER_DAY,
};

/// Enumerates bookable slots in `[range_start, range_end)`.
///
/// Candidates start at `range_start` and advance by slot duration plus
/// buffer. A candidate is emitted only when it lies entirely inside the
/// day's business hours, ends no later than `range_end`, and touches no
/// existing appointment. Reads no clock.
pub fn compute_available_slots(
    config: &CalendarConfig,
    existing: &[ExistingAppointment],
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Result<Vec<TimeSlot>, SchedulingError> {
    config.validate()?;

    let duration = Duration::minutes(config.slot_duration_minutes);
    let step = Duration::minutes(config.slot_duration_minutes + config.buffer_minutes);

    let mut slots = Vec::new();
    let mut candidate = range_start;
    while candidate < range_end {
        let Some(end) = candidate.checked_add_signed(duration) else {
            break;
        };
        if end <= range_end
            && fits_business_hours(config, candidate, end)
            && !existing
                .iter()
                .any(|apt| intervals_overlap(candidate, end, apt.start_time, apt.end_time))
        {
            slots.push(TimeSlot {
                start: candidate,
                end,
                available: true,
            });
        }
        candidate = match candidate.checked_add_signed(step) {
            Some(next) => next,
            None => break,
        };
    }

    debug!(
        calendar_id = %config.calendar_id,
        existing = existing.len(),
        slots = slots.len(),
        "computed availability"
    );
    Ok(slots)
}

/// Whether `[start, end)` sits inside the business hours of `start`'s
/// local weekday. Slots running past local midnight never fit.
fn fits_business_hours(config: &CalendarConfig, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    let Some(window) = config.hours_on(start) else {
        return false;
    };
    if !is_within_business_hours(start, Some(window), &config.timezone) {
        return false;
    }
    match local_end_minute(config, start, end) {
        Some(end_minute) => end_minute <= window.end(),
        None => false,
    }
}

fn local_end_minute(config: &CalendarConfig, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<u32> {
    let start_day = start.with_timezone(&config.timezone).date_naive();
    let end_day = end.with_timezone(&config.timezone).date_naive();
    let end_minute = minute_of_day_in(end, &config.timezone);
    if end_day == start_day {
        Some(end_minute)
    } else if end_day == start_day.succ_opt()? && end_minute == 0 {
        Some(MINUTES_PER_DAY)
    } else {
        None
    }
}
