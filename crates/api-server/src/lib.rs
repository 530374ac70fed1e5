#![warn(clippy::unwrap_used)]

pub mod analytics_rest;
pub mod dataset;
pub mod query;
pub mod rest;
pub mod server;
pub mod swagger;

pub use dataset::Dataset;
pub use server::ApiServer;
pub use swagger::ApiDoc;
