pub mod index;
pub mod input;
pub mod output;
pub mod report;
pub mod run_log;

pub use index::*;
pub use input::*;
pub use output::*;
pub use report::*;
pub use run_log::*;
