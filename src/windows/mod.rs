//! Detection windows for HOUR, DAY and EVENT products.

pub mod builder;
pub mod mode;
pub mod runs;

pub use builder::{WindowBuilder, WindowOptions, WindowPlan};
pub use mode::Mode;
pub use runs::Run;
