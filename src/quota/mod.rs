pub mod billing;
pub mod enforcer;
pub mod tiers;
