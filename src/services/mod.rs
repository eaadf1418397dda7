//! Service layer containing backend clients and aggregation logic.
//!
//! ## Service map
//! - `transport.rs` — shared blocking HTTP client and JSON/error decoding.
//! - `gva.rs` — Duniter GVA GraphQL queries and the `WalletRegistry` seam.
//! - `cesium.rs` — Cesium+ pod documents and the `ScrollSearch` seam.
//! - `wallets.rs` — wallet registry aggregation, filters and rendering.
//! - `geoloc.rs` — scrolled profile search joined with the wallet map.
//! - `compose.rs` — message drafting for `send`.
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - Prefer pure helpers where possible.
//! - Network calls go through the two seam traits so aggregation is testable.
//! - Keep command handlers thin; delegate to services.

pub mod cesium;
pub mod compose;
pub mod geoloc;
pub mod gva;
pub mod output;
pub mod transport;
pub mod wallets;
