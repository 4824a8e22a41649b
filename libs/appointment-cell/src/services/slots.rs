use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

/// First and last bookable hour; slots are on the hour.
pub const FIRST_SLOT_HOUR: u32 = 9;
pub const LAST_SLOT_HOUR: u32 = 16;

pub fn clinic_slots() -> Vec<NaiveTime> {
    (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .collect()
}

pub fn is_clinic_slot(time: NaiveTime) -> bool {
    time.minute() == 0
        && time.second() == 0
        && time.nanosecond() == 0
        && (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR).contains(&time.hour())
}

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Slots still bookable on `date` as seen at `now`.
pub fn available_slots(date: NaiveDate, now: NaiveDateTime) -> Vec<NaiveTime> {
    if !is_weekday(date) || date < now.date() {
        return Vec::new();
    }

    clinic_slots()
        .into_iter()
        .filter(|slot| date > now.date() || *slot > now.time())
        .collect()
}

/// The next weekday strictly after `date`.
pub fn next_weekday(date: NaiveDate) -> NaiveDate {
    let mut next = date.succ_opt().unwrap_or(date);
    while !is_weekday(next) {
        next = next.succ_opt().unwrap_or(next);
    }
    next
}
