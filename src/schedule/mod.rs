pub mod types;
pub mod indexer;
pub mod allocator;
pub mod plan;

pub use types::{
    AllocationResult, Assignment, DailyRecord, DayPlan, Mailbox, MailboxPoolConfig, StayInterval,
    NO_MAILBOX,
};
pub use indexer::index;
pub use allocator::allocate;
pub use plan::plan_window;
