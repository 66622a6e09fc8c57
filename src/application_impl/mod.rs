mod verification_service_fake;
mod verification_service_impl;

pub use verification_service_fake::*;
pub use verification_service_impl::*;
