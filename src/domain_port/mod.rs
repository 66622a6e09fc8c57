mod challenge_store;
mod mailer;

pub use challenge_store::*;
pub use mailer::*;
