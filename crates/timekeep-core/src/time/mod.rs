mod clock;
mod time_of_day;

pub use clock::{Clock, FixedClock, SystemClock};
pub use time_of_day::{
    format_time_of_day, next_occurrence, parse_time_of_day, weekday_from_index, weekday_index,
    DayFilter, TimeOfDay,
};
