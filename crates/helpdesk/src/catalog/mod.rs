//! Mock catalogs backing the support tools.

pub mod orders;
pub mod products;
