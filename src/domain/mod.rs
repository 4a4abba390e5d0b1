pub mod event;
pub mod history;
pub mod prediction;

pub use event::*;
pub use history::*;
pub use prediction::*;
