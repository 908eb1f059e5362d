pub mod error;
pub mod lifecycle;
pub mod model;
pub mod value_object;
