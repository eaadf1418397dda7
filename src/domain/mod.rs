//! Shared data model layer (structs only).
//!
//! ## Purpose
//! - Keep backend response shapes and output records in one place.
//! - Make JSON output schema changes explicit and reviewable.
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem/network side effects.
//!
//! ## Compatibility note
//! `AggregatedProfile`, `Wallet` and `GeolocReport` are printed as JSON and
//! consumed by map front-ends; keep field names stable.

pub mod models;
