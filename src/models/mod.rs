pub mod openapi;

pub use openapi::OpenApiDocument;
