pub mod calendar;
pub mod overdue;
pub mod recorder;

pub use calendar::weekdays_between;
pub use overdue::{overdue_gates, OverdueGate, SloKind};
pub use recorder::DefaultSloRecorder;
