mod challenge;

pub use challenge::*;
