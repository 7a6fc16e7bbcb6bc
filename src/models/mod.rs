/*!
Data structures for route updates received from the live feed.
*/
mod update;

pub use update::{RouteUpdate, UpdateKind, VantagePoint};
