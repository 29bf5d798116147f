//! # Lingo Core
//!
//! Language-agnostic IR and cross-function type inference for source-to-source
//! translation. Adapters parse source text into the IR, the type system
//! recovers types the source never wrote down, and generators emit target
//! text from the annotated tree.
//!
//! ## Modules
//!
//! - **[`ir`]** - The IR node model (modules, functions, statements, expressions)
//! - **[`inference`]** - Single-pass local type inference
//! - **[`context`]** - Call graph, usage evidence, and data-flow analysis
//! - **[`type_system`]** - Cross-function fixpoint orchestration
//! - **[`stdlib`]** - Loadable standard-library signature table
//! - **[`wire`]** - Canonical `{"tool", "params"}` JSON encoding
//! - **[`adapter`]** - The per-language parse/generate seam
//!
//! ## Quick Start
//!
//! ```rust
//! use lingo_core::ir::{Expr, IRFunction, IRModule, Stmt};
//! use lingo_core::type_system::{ScopedName, TypeSystem};
//!
//! let mut module = IRModule::new("demo");
//! module.functions.push(IRFunction::new(
//!     "get_name",
//!     vec![],
//!     vec![Stmt::ret(Expr::str("Alice"))],
//! ));
//!
//! let types = TypeSystem::new().analyze_cross_function_types(&module);
//! assert_eq!(types[&ScopedName::ret("get_name")].ty.name, "string");
//! ```

pub mod adapter;
pub mod context;
pub mod error;
pub mod inference;
pub mod ir;
pub mod stdlib;
pub mod type_system;
pub mod wire;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::adapter::{GenerateOptions, LanguageAdapter};
    pub use crate::context::{CallGraph, ContextAnalyzer, DataFlow, FunctionContext, VariableUsage};
    pub use crate::error::{Error, Result};
    pub use crate::inference::{infer_types, join_types, FunctionTypes, LocalInference};
    pub use crate::ir::{
        AssignTarget, BinOp, Expr, IRClass, IRFunction, IRModule, IRParameter, IRType, Literal,
        Metadata, Stmt, UnaryOp,
    };
    pub use crate::stdlib::StdlibSignatures;
    pub use crate::type_system::{ScopedName, TypeInfo, TypeMap, TypeSource, TypeSystem};
}

// Re-export main types at crate root for convenience
pub use context::ContextAnalyzer;
pub use error::{Error, Result};
pub use inference::infer_types;
pub use ir::{IRModule, IRType};
pub use stdlib::StdlibSignatures;
pub use type_system::{TypeMap, TypeSystem};

/// One-call entry point: full cross-function inference with the default
/// stdlib table.
pub fn analyze_cross_function_types(module: &IRModule) -> TypeMap {
    TypeSystem::new().analyze_cross_function_types(module)
}
