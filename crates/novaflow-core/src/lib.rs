//! Novaflow Core Types
//!
//! This crate holds the pieces of the Novaflow chart pipeline that have no
//! async or engine dependencies:
//!
//! - **Markup**: Raw and sanitized markup string types ([`markup`] module)
//! - **Sanitize**: Fence stripping and the ordered rewrite rule catalog
//!   ([`sanitize`] module)
//! - **Graphic**: Rendered graphic handles and host containers
//!   ([`graphic`] module)
//! - **Geometry**: Basic geometric types ([`geometry`] module)

pub mod geometry;
pub mod graphic;
pub mod markup;
pub mod sanitize;
