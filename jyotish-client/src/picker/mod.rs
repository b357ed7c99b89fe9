//! Pure state machines behind the birth date and time inputs. Driven by UI
//! events, no network dependency; each edit emits a normalized value.

mod date;
mod time;

pub use date::{DatePart, DatePicker};
pub use time::{Meridiem, TimePart, TimePicker};
