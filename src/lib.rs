// Library for tests to access modules

pub mod backend;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod routes;
pub mod series;
pub mod status_poller;
pub mod stream_ingestor;
pub mod version;
