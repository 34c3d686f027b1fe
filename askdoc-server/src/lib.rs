//! Library surface of the query service, split out so integration tests
//! can drive the router directly.

pub mod app;
