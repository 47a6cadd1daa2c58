pub mod auth;
#[cfg(test)]
pub mod test_utils;
pub mod transcript;
pub mod url;
