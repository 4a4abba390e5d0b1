pub mod replay;

pub use replay::{load_dump, run_replay, ModelAccuracy, ReplayConfig, ReplayResult};
