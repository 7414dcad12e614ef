//! Postdesk: a small JSON API for blog posts with hosted hero images.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
