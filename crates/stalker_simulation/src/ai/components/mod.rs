//! AI components

pub mod fsm;
pub mod patrol;


// Re-export all components
pub use fsm::*;
pub use patrol::*;
