pub mod directive;
pub mod host;
pub mod request;
pub mod resource;
