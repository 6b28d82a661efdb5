pub mod ai;
pub mod auth;
pub mod email;
pub mod images;
pub mod models;
pub mod postcards;
pub mod store;
pub mod timeline;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
