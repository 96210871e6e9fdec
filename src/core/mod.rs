//! Core modules for Bedsense

pub mod scorer;
pub mod gate;
pub mod presence;
pub mod calibration;
pub mod engine;
pub mod tick_parser;
pub mod replay;
pub mod api;

pub use scorer::score;
pub use gate::admit;
pub use presence::PresenceMachine;
pub use calibration::{Calibrator, RobustEstimate, median, robust_estimate};
pub use engine::PresenceEngine;
pub use tick_parser::TickParser;
pub use replay::{Replay, ReplayReport};
pub use api::{create_router, run_server};
