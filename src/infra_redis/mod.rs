mod challenge_store_redis;

pub use challenge_store_redis::*;
