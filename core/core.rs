pub mod config;
pub mod error;
pub mod filter;
pub mod generate;
pub mod history;
pub mod stats;
pub mod tokens;
pub mod tools;
pub mod tree;
pub mod walker;

pub use config::{Config, GenerateOptions};
pub use error::{AppError, Result};
pub use filter::{SkipFilter, SkipReason, file_extension};
pub use generate::{fence_for, generate, meta_path_for, render_meta};
pub use history::{CommitRecord, collect_history, format_history};
pub use stats::{Stats, format_duration};
pub use tokens::{count_file_tokens, estimate_tokens};
pub use tools::{SystemTools, ToolRunner};
pub use tree::{PathTrie, TrieNode, render_structure};
pub use walker::{KeptFile, PathWalker};
