pub mod controller;
pub mod scheduler;
pub mod view;
pub mod viewport;

pub use controller::{FetchController, FetchOutcome, FetchState, Phase};
pub use scheduler::PollScheduler;
pub use view::DashboardView;
pub use viewport::ViewportTrigger;
