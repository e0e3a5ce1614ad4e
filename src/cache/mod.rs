pub mod endpoint_directory;
pub mod token;
