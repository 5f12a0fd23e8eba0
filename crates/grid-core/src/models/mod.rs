//! Data models shared by the Grid crates.

mod app;
mod bundle;

pub use app::*;
pub use bundle::*;
