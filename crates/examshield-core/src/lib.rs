//! examshield-core: the timed test session engine.
//!
//! Question model, session state machine, countdown driver, integrity
//! monitor, and scorer. Graders, question supply, and result storage plug in
//! through the traits in [`traits`].

pub mod error;
pub mod history;
pub mod integrity;
pub mod model;
pub mod parser;
pub mod results;
pub mod runner;
pub mod scorer;
pub mod session;
pub mod statistics;
pub mod timer;
pub mod traits;

pub use error::SessionError;
pub use runner::{SessionCommand, SessionRunner};
pub use session::{Session, SessionDeps, SessionState};
