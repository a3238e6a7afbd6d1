pub mod health;
pub mod diagnostics;
pub mod docsession;
pub mod presence;
pub mod messages;
pub mod error;

pub use health::*;
pub use diagnostics::*;
pub use docsession::*;
pub use presence::*;
pub use messages::*;
pub use error::*;
