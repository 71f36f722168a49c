pub mod category;
pub mod schedule;

pub use category::Category;
pub use schedule::{Priority, Repeat, ScheduleInstance};
