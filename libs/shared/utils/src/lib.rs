pub mod extractor;
pub mod jwt;
pub mod state;
pub mod test_utils;
pub mod validation;

pub use state::AppState;
