//! Exports download counts and latest release information of GitHub repositories as
//! Prometheus metrics.

mod infrastructure;
mod interface;
mod model;

pub use infrastructure::*;
pub use interface::*;
pub use model::*;
