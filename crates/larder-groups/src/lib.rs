//! Larder Groups — group lifecycle, membership, and authority grant
//! administration.

pub mod service;

pub use service::GroupService;
