/// Signup, deposits and the per-user summary
pub mod account;
/// Comments on items
pub mod comment;
/// The funding transfer between an account and an item
pub mod funding;
/// Item listing, detail and owner maintenance
pub mod item;
/// Bounded retry of transactional work on write conflicts
pub mod retry;
