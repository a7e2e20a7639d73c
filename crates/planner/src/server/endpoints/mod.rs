pub mod catalog;
pub mod status;
pub mod timetable;
