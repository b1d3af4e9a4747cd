pub mod issue;
pub mod review;
pub mod source;
pub mod stage;
pub mod summary;

pub use issue::*;
pub use review::*;
pub use source::*;
pub use stage::*;
pub use summary::*;
