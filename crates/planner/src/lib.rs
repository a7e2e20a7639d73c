//! Course timetable planner: fetches a term's course catalog, enumerates
//! every section combination for a chosen set of courses, flags time
//! conflicts, and renders combinations as weekly calendars.

pub mod api;
pub mod calendar;
pub mod config;
pub mod enumerate;
pub mod fetcher;
pub mod logging;
pub mod model;
pub mod search;
pub mod selector;
pub mod server;
pub mod state;
pub mod types;
