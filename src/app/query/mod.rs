//! Query construction and rendering
//!
//! [`QueryModel`] holds what the user asked for; [`QueryCompiler`] turns it
//! into the URL that is previewed or executed.

pub mod compiler;
pub mod model;

pub use compiler::{CompiledQuery, QueryCompiler};
pub use model::{
    Include, Pagination, ParameterBinding, ParameterUpdate, QueryModel, SortOption, SortOrder,
};
