//! HTTP handlers organized by resource.

/// Signup, own page and deposits
pub mod accounts;
/// Comment add, edit and delete
pub mod comments;
/// The funding action
pub mod funding;
/// Item listing and owner maintenance
pub mod items;
