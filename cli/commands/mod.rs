pub mod config;
pub mod generate;
pub mod tokens;
pub mod tree;
