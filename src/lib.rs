pub mod aggregate;
pub mod chart;
pub mod error;
pub mod loader;
pub mod render;
pub mod sweep;
pub mod table;
pub mod tag;

pub use error::SweepError;
pub use render::{ChartRenderer, PngRenderer};
pub use sweep::{SweepConfig, SweepDriver, SweepReport};
