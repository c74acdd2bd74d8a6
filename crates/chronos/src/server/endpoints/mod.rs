pub mod calendars;
