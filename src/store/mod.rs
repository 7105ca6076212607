pub mod registry;
pub mod requests;
