pub mod connctx;
pub mod docsession;
pub mod presence;
pub mod registry;
