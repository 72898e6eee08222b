//! Registration wizard: a per-user linear conversation collecting a
//! client's name, phone, city and comments, ending in one store append.

pub mod flow;
pub mod session;
pub mod state;

pub use flow::RegistrationFlow;
pub use session::{Advance, Session, SessionRegistry};
pub use state::RegistrationStep;
