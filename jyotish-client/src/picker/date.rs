use chrono::{Datelike, Days, Local, NaiveDate};

/// Field of the birth-date picker a keystroke targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Day,
    Month,
    Year,
}

/// State machine behind the birth-date input. Raw edits land on one field;
/// the whole date is re-normalized with calendar-correct rollover, then the
/// result is dropped wholesale if it lands in the future. Pure: no clock is
/// read outside the public adjusters, so tests pin "today".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatePicker {
    value: Option<NaiveDate>,
}

/// Starting point for an empty picker: the Unix epoch, 1970-01-01.
fn default_date() -> NaiveDate {
    NaiveDate::default()
}

/// Resolve an arbitrary year/month/day combination the way calendar
/// arithmetic does: an out-of-range month rolls the year, an out-of-range
/// day rolls the month. `month0` is 0-based and unbounded, `day` is 1-based
/// and unbounded in both directions.
fn normalize(year: i32, month0: i32, day: i64) -> Option<NaiveDate> {
    let year = year.checked_add(month0.div_euclid(12))?;
    let month0 = month0.rem_euclid(12) as u32;
    let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)?;

    if day >= 1 {
        first.checked_add_days(Days::new((day - 1) as u64))
    } else {
        first.checked_sub_days(Days::new((1 - day) as u64))
    }
}

impl DatePicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: NaiveDate) -> Self {
        Self { value: Some(value) }
    }

    pub fn value(&self) -> Option<NaiveDate> {
        self.value
    }

    /// The normalized `YYYY-MM-DD` string, or empty while unset.
    pub fn display(&self) -> String {
        self.value
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    /// Step one field by ±1 with rollover into the adjacent fields.
    pub fn adjust(&mut self, part: DatePart, delta: i32) {
        self.adjust_against(part, delta, Local::now().date_naive());
    }

    /// Overwrite one field from raw input. Non-numeric input counts as 0;
    /// overflowed values roll into the next field rather than clamping.
    pub fn set_part(&mut self, part: DatePart, raw: &str) {
        self.set_part_against(part, raw, Local::now().date_naive());
    }

    fn adjust_against(&mut self, part: DatePart, delta: i32, today: NaiveDate) {
        let current = self.value.unwrap_or_else(default_date);
        let (year, month0, day) = (current.year(), current.month0() as i32, current.day() as i64);

        let candidate = match part {
            DatePart::Day => normalize(year, month0, day + delta as i64),
            DatePart::Month => normalize(year, month0 + delta, day),
            DatePart::Year => normalize(year + delta, month0, day),
        };
        self.guard(candidate, today);
    }

    fn set_part_against(&mut self, part: DatePart, raw: &str, today: NaiveDate) {
        let parsed: i32 = raw.trim().parse().unwrap_or(0);
        let current = self.value.unwrap_or_else(default_date);
        let (year, month0, day) = (current.year(), current.month0() as i32, current.day() as i64);

        let candidate = match part {
            DatePart::Day => normalize(year, month0, parsed as i64),
            // users type 1-indexed months
            DatePart::Month => normalize(year, parsed - 1, day),
            DatePart::Year => normalize(parsed, month0, day),
        };
        self.guard(candidate, today);
    }

    /// The future-date guard: accept the candidate only if it is not
    /// strictly after today; otherwise keep the prior value unchanged.
    fn guard(&mut self, candidate: Option<NaiveDate>, today: NaiveDate) {
        if let Some(candidate) = candidate {
            if candidate <= today {
                self.value = Some(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn far_future() -> NaiveDate {
        date(2100, 1, 1)
    }

    #[test]
    fn empty_picker_adjusts_from_the_epoch_default() {
        let mut picker = DatePicker::new();
        picker.adjust_against(DatePart::Day, 1, far_future());
        assert_eq!(picker.value(), Some(date(1970, 1, 2)));
    }

    #[test]
    fn leap_day_increment_rolls_into_march() {
        let mut picker = DatePicker::with_value(date(2024, 2, 29));
        picker.adjust_against(DatePart::Day, 1, far_future());
        assert_eq!(picker.value(), Some(date(2024, 3, 1)));
    }

    #[test]
    fn day_decrement_below_one_retreats_the_month() {
        let mut picker = DatePicker::with_value(date(2024, 3, 1));
        picker.adjust_against(DatePart::Day, -1, far_future());
        assert_eq!(picker.value(), Some(date(2024, 2, 29)));
    }

    #[test]
    fn month_decrement_below_january_retreats_the_year() {
        let mut picker = DatePicker::with_value(date(2024, 1, 15));
        picker.adjust_against(DatePart::Month, -1, far_future());
        assert_eq!(picker.value(), Some(date(2023, 12, 15)));
    }

    #[test]
    fn month_increment_past_december_advances_the_year() {
        let mut picker = DatePicker::with_value(date(2023, 12, 15));
        picker.adjust_against(DatePart::Month, 1, far_future());
        assert_eq!(picker.value(), Some(date(2024, 1, 15)));
    }

    #[test]
    fn month_step_from_a_long_month_rolls_the_overflowing_day() {
        // Jan 31 + 1 month normalizes through Feb 31 into March, the
        // ordinary calendar-arithmetic result, not a clamp to Feb 29.
        let mut picker = DatePicker::with_value(date(2024, 1, 31));
        picker.adjust_against(DatePart::Month, 1, far_future());
        assert_eq!(picker.value(), Some(date(2024, 3, 2)));
    }

    #[test]
    fn set_day_overflow_rolls_into_next_month() {
        let mut picker = DatePicker::with_value(date(2024, 1, 10));
        picker.set_part_against(DatePart::Day, "32", far_future());
        assert_eq!(picker.value(), Some(date(2024, 2, 1)));
    }

    #[test]
    fn set_month_is_one_indexed() {
        let mut picker = DatePicker::with_value(date(2024, 1, 10));
        picker.set_part_against(DatePart::Month, "3", far_future());
        assert_eq!(picker.value(), Some(date(2024, 3, 10)));
    }

    #[test]
    fn set_month_zero_rolls_back_to_december() {
        let mut picker = DatePicker::with_value(date(2024, 5, 10));
        picker.set_part_against(DatePart::Month, "0", far_future());
        assert_eq!(picker.value(), Some(date(2023, 12, 10)));
    }

    #[test]
    fn non_numeric_input_normalizes_to_zero() {
        let mut picker = DatePicker::with_value(date(2024, 5, 10));
        picker.set_part_against(DatePart::Day, "abc", far_future());
        // Day 0 is the last day of the previous month.
        assert_eq!(picker.value(), Some(date(2024, 4, 30)));
    }

    #[test]
    fn set_year_directly() {
        let mut picker = DatePicker::with_value(date(2024, 5, 10));
        picker.set_part_against(DatePart::Year, "1987", far_future());
        assert_eq!(picker.value(), Some(date(1987, 5, 10)));
    }

    #[test]
    fn future_candidate_is_discarded_wholesale() {
        let today = date(2024, 6, 1);
        let mut picker = DatePicker::with_value(today);
        picker.adjust_against(DatePart::Day, 1, today);
        assert_eq!(picker.value(), Some(today));
    }

    #[test]
    fn future_guard_tracks_the_real_clock() {
        let today = Local::now().date_naive();
        let mut picker = DatePicker::with_value(today);
        picker.adjust(DatePart::Day, 1);
        assert_eq!(picker.value(), Some(today));
    }

    #[test]
    fn candidate_equal_to_today_passes_the_guard() {
        let today = date(2024, 6, 1);
        let mut picker = DatePicker::with_value(date(2024, 5, 31));
        picker.adjust_against(DatePart::Day, 1, today);
        assert_eq!(picker.value(), Some(today));
    }

    #[test]
    fn rejected_future_year_keeps_the_prior_value() {
        let today = date(2024, 6, 1);
        let mut picker = DatePicker::with_value(date(2024, 5, 10));
        picker.set_part_against(DatePart::Year, "2030", today);
        assert_eq!(picker.value(), Some(date(2024, 5, 10)));
    }

    #[test]
    fn absurd_year_input_is_discarded() {
        let mut picker = DatePicker::with_value(date(2024, 5, 10));
        picker.set_part_against(DatePart::Year, "999999999", far_future());
        assert_eq!(picker.value(), Some(date(2024, 5, 10)));
    }

    #[test]
    fn display_is_iso_formatted() {
        let picker = DatePicker::with_value(date(1987, 3, 5));
        assert_eq!(picker.display(), "1987-03-05");
        assert_eq!(DatePicker::new().display(), "");
    }
}
