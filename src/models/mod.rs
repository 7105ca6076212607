pub mod analytics;
pub mod assignment;
pub mod driver;
pub mod event;
pub mod request;
pub mod vehicle;
