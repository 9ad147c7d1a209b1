pub mod openapi;

pub use openapi::{load_openapi, load_openapi_str, load_schema_model};
