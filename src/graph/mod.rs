//! World graph: static topology, discovered links, expiry, pathfinding.

pub mod corpus;
pub mod persist;
pub mod store;
mod sweeper;

pub use corpus::Corpus;
pub use persist::FileStore;
pub use store::{Link, LinkStore, PathResult};
