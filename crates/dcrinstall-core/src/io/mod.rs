//! IO modules - side effects (network, filesystem)

pub mod extract;
pub mod fetch;
