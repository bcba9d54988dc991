pub mod error;
pub mod event;
pub mod filter;
pub mod month;
pub mod repository;
pub mod state;

pub use error::ScheduleError;
pub use event::{ScheduleEvent, SCHEDULE_CLASS};
pub use filter::{event_count_for_day, filter_by_day};
pub use month::{Month, TimeWindow};
pub use repository::ScheduleRepository;
pub use state::{CalendarState, FetchTicket};
