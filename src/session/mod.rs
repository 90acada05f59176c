pub mod controller;
pub mod loop_worker;
pub mod save;
pub mod state;

pub use controller::SessionController;
pub use loop_worker::{SessionEvent, SessionMessage, MAX_CONSECUTIVE_CAPTURE_FAILURES};
pub use save::{save_drawing, SaveError};
pub use state::{ActionOutcome, DrawSession, SessionMode, TickOutput, UserAction};
