mod challenge_store_memory;
mod mailer_memory;

pub use challenge_store_memory::*;
pub use mailer_memory::*;
