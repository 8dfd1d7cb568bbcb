pub mod annotations;
pub mod config;
pub mod error;
pub mod repository;
pub mod store;

#[cfg(test)]
pub mod test_utils;
