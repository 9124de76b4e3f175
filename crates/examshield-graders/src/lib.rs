//! examshield-graders: descriptive answer graders and configuration.
//!
//! Implements `DescriptiveGrader` for the offline placeholder, a remote HTTP
//! grading service, and a scriptable mock for tests.

pub mod config;
pub mod error;
pub mod mock;
pub mod placeholder;
pub mod remote;

pub use config::{create_grader, load_config, load_config_from, ExamShieldConfig, GraderConfig};
pub use error::GraderError;
pub use placeholder::PlaceholderGrader;
pub use remote::{RemoteGrader, RetryPolicy};
