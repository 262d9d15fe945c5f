pub mod error;
pub mod model;
pub mod traffic;
pub mod validation;
