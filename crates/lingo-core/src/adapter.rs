//! Language adapter seam
//!
//! One trait per supported language, on both sides: parse source text into
//! the IR, generate target text from the IR. The core never knows which
//! languages exist; callers hand it adapter implementations.

use crate::error::{Error, Result};
use crate::ir::IRModule;

/// Options honored by every generator.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Fail on `Unrecognized` nodes instead of emitting a placeholder
    /// comment. Lenient is the default.
    pub strict: bool,
    /// Attach inferred types as annotations where the target language can
    /// express them.
    pub emit_type_annotations: bool,
}

impl GenerateOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Default::default()
        }
    }
}

/// A bidirectional language frontend/backend.
///
/// `parse` failures are fatal for the file being parsed; a construct the
/// adapter cannot model must travel as an `Unrecognized` node rather than
/// aborting the parse. Generators consult [`GenerateOptions::strict`] when
/// they meet one.
pub trait LanguageAdapter {
    /// Language name as used in diagnostics (`"python"`, `"go"`, ...).
    fn language(&self) -> &'static str;

    fn parse(&self, source: &str, module_name: &str) -> Result<IRModule>;

    fn generate(&self, module: &IRModule, options: &GenerateOptions) -> Result<String>;

    /// The standard reaction to an `Unrecognized` node during generation:
    /// a placeholder comment in lenient mode, an error in strict mode.
    fn render_unrecognized(
        &self,
        raw: &str,
        comment_prefix: &str,
        options: &GenerateOptions,
    ) -> Result<String> {
        if options.strict {
            return Err(Error::UnsupportedConstruct {
                node_kind: "unrecognized",
                target: self.language().to_string(),
            });
        }
        Ok(format!("{comment_prefix} [unrecognized] {raw}"))
    }
}
