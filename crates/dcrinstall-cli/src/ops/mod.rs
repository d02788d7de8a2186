pub mod context;
pub mod error;
pub mod flow;
pub mod install;

pub use context::{Capabilities, Credentials, RunContext};
pub use error::{InstallError, Stage, StageExt};
pub use install::{RunReport, run, run_into};
