pub mod ast;
pub mod chunk;
pub mod chunk_graph;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod exports;
pub mod host;
pub mod logger;
pub mod module;
pub mod module_graph;
pub mod partition;
pub mod stats;

mod build;
mod fold;
mod side_effects;
mod tree_shaking;
mod util;

#[cfg(test)]
mod test_helper;
