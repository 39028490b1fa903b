mod error;
mod extractors;

pub use error::AppError;
pub use extractors::{JsonBody, QueryParams};
