pub mod pool;
pub mod position;
pub mod recipient;
pub mod schedule;
pub mod strategy;
pub mod tracked_position;
pub mod user;
pub mod worker_state;

pub use pool::{GranularityKind, Pool, VenueTag};
pub use position::Position;
pub use recipient::Recipient;
pub use schedule::{Schedule, ScheduleStatus};
pub use strategy::{DistributionShape, RangeShape, Strategy, TipUrgency};
pub use tracked_position::TrackedPosition;
pub use user::UserProfile;
pub use worker_state::WorkerState;
