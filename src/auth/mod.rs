pub mod claims;
pub(crate) mod extractors;
