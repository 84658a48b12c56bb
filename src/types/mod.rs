pub mod portfolio;
pub mod risk;
pub mod ticker;
pub mod transaction;
pub mod ws;

pub use portfolio::*;
pub use risk::*;
pub use ticker::*;
pub use transaction::*;
pub use ws::*;
