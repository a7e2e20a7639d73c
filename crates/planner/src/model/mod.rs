//! Domain types shared by the fetcher, selector, enumerator and calendar.
mod course;
mod days;

pub use course::*;
pub use days::DaySet;
