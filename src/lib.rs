pub use trove_core::*;
pub use trove_macros::*;
