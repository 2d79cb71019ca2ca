mod date;
mod window;

pub use date::{
    calendar_month, days_in_month, month_abbreviation, next, prev, DayRecord, MAX_YEAR, MIN_YEAR,
};
pub use window::{WindowState, DEFAULT_SPAN};
