//! Builders for router payloads

mod router_data;

pub use router_data::RouterDataBuilder;
