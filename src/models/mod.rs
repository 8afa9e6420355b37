pub mod clock;
pub mod quality;
pub mod review_session;
pub mod review_state;
pub mod session_card;
pub mod sm2;
pub mod stage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use quality::{Quality, Rating};
pub use review_session::ReviewSession;
pub use review_state::{ItemId, ReviewState, UserId};
pub use session_card::SessionCard;
pub use sm2::{Scheduler, schedule, schedule_raw};
pub use stage::{Stage, StageCounts};
