//! Rule expression engine
//!
//! This module parses rule strings like `age > 30 AND department == "HR"`
//! into ASTs, edits them by path, combines several of them and evaluates
//! them against data records.

mod ast;
pub mod cache;
mod catalog;
mod combiner;
mod editor;
mod evaluator;
pub mod parser;
mod path;
mod render;
mod value;


pub use ast::*;
pub use cache::*;
pub use catalog::*;
pub use combiner::*;
pub use editor::*;
pub use evaluator::*;
pub use parser::*;
pub use path::*;
pub use value::*;
