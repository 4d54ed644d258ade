mod api;

pub use api::{router, setup, Api};
