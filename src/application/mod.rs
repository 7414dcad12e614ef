//! Application services and the ports they depend on.

pub mod editor;
pub mod error;
pub mod images;
pub mod posts;
pub mod repos;
pub mod sessions;
