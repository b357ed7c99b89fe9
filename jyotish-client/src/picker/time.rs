use chrono::{NaiveTime, Timelike};

/// Field of the birth-time picker a keystroke targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePart {
    Hour,
    Minute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

/// State machine behind the birth-time input. Users edit a 12-hour value
/// with an AM/PM toggle; the backend needs 24-hour, so every emission
/// converts. Hour steps wrap within 1-12 without flipping the meridiem and
/// minute steps wrap within 0-59 without carrying into the hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePicker {
    hour12: u32,
    minute: u32,
    meridiem: Meridiem,
}

impl Default for TimePicker {
    /// Midnight, shown as 12:00 AM.
    fn default() -> Self {
        Self {
            hour12: 12,
            minute: 0,
            meridiem: Meridiem::Am,
        }
    }
}

impl TimePicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derive the 12-hour display state from a stored 24-hour value.
    pub fn from_time(time: NaiveTime) -> Self {
        let hour24 = time.hour();
        let hour12 = match hour24 % 12 {
            0 => 12,
            h => h,
        };
        Self {
            hour12,
            minute: time.minute(),
            meridiem: if hour24 < 12 { Meridiem::Am } else { Meridiem::Pm },
        }
    }

    fn hour24(&self) -> u32 {
        match self.meridiem {
            Meridiem::Am => self.hour12 % 12,
            Meridiem::Pm => self.hour12 % 12 + 12,
        }
    }

    /// The stored 24-hour value.
    pub fn value(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour24(), self.minute, 0).unwrap_or_default()
    }

    /// The normalized `HH:MM` string the backend consumes.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.hour24(), self.minute)
    }

    /// The 12-hour editing view, e.g. "01:05 PM".
    pub fn display_12h(&self) -> String {
        let suffix = match self.meridiem {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        };
        format!("{:02}:{:02} {}", self.hour12, self.minute, suffix)
    }

    pub fn meridiem(&self) -> Meridiem {
        self.meridiem
    }

    /// Step one field. Hours wrap 1-12, minutes wrap 0-59; neither step
    /// cascades into the other field or the meridiem.
    pub fn adjust(&mut self, part: TimePart, delta: i32) {
        match part {
            TimePart::Hour => {
                self.hour12 = (self.hour12 as i32 - 1 + delta).rem_euclid(12) as u32 + 1;
            }
            TimePart::Minute => {
                self.minute = (self.minute as i32 + delta).rem_euclid(60) as u32;
            }
        }
    }

    /// Overwrite one field from raw input. Hour input is taken modulo 12
    /// with 0 meaning 12; minute input clamps to 0-59 instead of wrapping,
    /// unlike the increment operator.
    pub fn set_part(&mut self, part: TimePart, raw: &str) {
        let parsed: i32 = raw.trim().parse().unwrap_or(0);
        match part {
            TimePart::Hour => {
                self.hour12 = match parsed.rem_euclid(12) {
                    0 => 12,
                    h => h as u32,
                };
            }
            TimePart::Minute => {
                self.minute = parsed.clamp(0, 59) as u32;
            }
        }
    }

    /// Flip AM/PM; the stored 24-hour value is re-derived from the existing
    /// 12-hour hour, minutes untouched.
    pub fn set_meridiem(&mut self, meridiem: Meridiem) {
        self.meridiem = meridiem;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn default_is_midnight() {
        let picker = TimePicker::new();
        assert_eq!(picker.value(), time(0, 0));
        assert_eq!(picker.display_12h(), "12:00 AM");
    }

    #[test]
    fn from_time_maps_afternoon_to_pm_display() {
        let picker = TimePicker::from_time(time(13, 5));
        assert_eq!(picker.display_12h(), "01:05 PM");
        assert_eq!(picker.display(), "13:05");
    }

    #[test]
    fn from_time_keeps_noon_and_midnight_apart() {
        assert_eq!(TimePicker::from_time(time(0, 0)).display_12h(), "12:00 AM");
        assert_eq!(TimePicker::from_time(time(12, 0)).display_12h(), "12:00 PM");
    }

    #[test]
    fn hour_increment_wraps_within_twelve_without_flipping_meridiem() {
        let mut picker = TimePicker::from_time(time(23, 10));
        assert_eq!(picker.display_12h(), "11:10 PM");
        picker.adjust(TimePart::Hour, 1);
        assert_eq!(picker.display_12h(), "12:10 PM");
        picker.adjust(TimePart::Hour, 1);
        // Wrapped to 1 PM, not 1 AM.
        assert_eq!(picker.value(), time(13, 10));
    }

    #[test]
    fn hour_decrement_wraps_from_one_to_twelve() {
        let mut picker = TimePicker::from_time(time(1, 0));
        picker.adjust(TimePart::Hour, -1);
        assert_eq!(picker.display_12h(), "12:00 AM");
    }

    #[test]
    fn minute_wrap_does_not_cascade_into_hour() {
        let mut picker = TimePicker::from_time(time(9, 59));
        picker.adjust(TimePart::Minute, 1);
        assert_eq!(picker.value(), time(9, 0));

        picker.adjust(TimePart::Minute, -1);
        assert_eq!(picker.value(), time(9, 59));
    }

    #[test]
    fn set_meridiem_rederives_stored_value() {
        // 13:05 displays as 01:05 PM; switching to AM stores 01:05.
        let mut picker = TimePicker::from_time(time(13, 5));
        picker.set_meridiem(Meridiem::Am);
        assert_eq!(picker.value(), time(1, 5));
        assert_eq!(picker.display(), "01:05");
    }

    #[test]
    fn set_hour_takes_input_modulo_twelve() {
        let mut picker = TimePicker::from_time(time(9, 30));
        picker.set_part(TimePart::Hour, "15");
        // 15 mod 12 = 3, under the current AM flag.
        assert_eq!(picker.value(), time(3, 30));
    }

    #[test]
    fn set_hour_zero_means_twelve() {
        let mut picker = TimePicker::from_time(time(9, 30));
        picker.set_part(TimePart::Hour, "0");
        assert_eq!(picker.display_12h(), "12:30 AM");
        assert_eq!(picker.value(), time(0, 30));
    }

    #[test]
    fn set_minute_clamps_instead_of_wrapping() {
        let mut picker = TimePicker::from_time(time(9, 30));
        picker.set_part(TimePart::Minute, "75");
        assert_eq!(picker.value(), time(9, 59));

        picker.set_part(TimePart::Minute, "-5");
        assert_eq!(picker.value(), time(9, 0));
    }

    #[test]
    fn non_numeric_input_normalizes_to_zero() {
        let mut picker = TimePicker::from_time(time(9, 30));
        picker.set_part(TimePart::Minute, "xx");
        assert_eq!(picker.value(), time(9, 0));
    }

    #[test]
    fn set_hour_under_pm_flag_lands_in_the_afternoon() {
        let mut picker = TimePicker::from_time(time(14, 20));
        picker.set_part(TimePart::Hour, "5");
        assert_eq!(picker.value(), time(17, 20));
    }
}
