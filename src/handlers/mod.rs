pub mod health;
pub mod diagnostics;
pub mod doc_session;

pub use health::*;
pub use diagnostics::*;
pub use doc_session::*;
