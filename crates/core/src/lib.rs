//! Shared primitive types for the OPAC backend crates.

pub mod types;
