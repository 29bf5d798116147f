//! Standard-library signature table
//!
//! Maps `"module.function"` call paths to return types. The table is data,
//! not code: adapters and callers extend it by loading JSON entries, so
//! supporting a new library function never requires a code change.
//!
//! Plain builtin identifiers (`len`, `str`, ...) live under the reserved
//! `builtins` module and are looked up by bare name as well.

use crate::ir::IRType;
use indexmap::IndexMap;
use serde::Deserialize;

/// A single loadable signature entry.
///
/// `returns` uses the canonical type vocabulary; container types spell their
/// arguments inline (`array<string>`, `map<string, int>`).
#[derive(Debug, Clone, Deserialize)]
pub struct SignatureEntry {
    pub path: String,
    pub returns: String,
}

#[derive(Debug, Clone)]
pub struct StdlibSignatures {
    table: IndexMap<String, IRType>,
}

impl StdlibSignatures {
    pub fn empty() -> Self {
        Self {
            table: IndexMap::new(),
        }
    }

    /// Table preloaded with the default entries every adapter shares.
    pub fn new() -> Self {
        let mut sigs = Self::empty();

        // Math
        for f in [
            "sqrt", "pow", "abs", "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "log",
            "log10", "exp",
        ] {
            sigs.insert(format!("math.{f}"), IRType::float());
        }
        for f in ["floor", "ceil", "round"] {
            sigs.insert(format!("math.{f}"), IRType::int());
        }

        // Random
        sigs.insert("random.random", IRType::float());
        sigs.insert("random.randint", IRType::int());
        sigs.insert("random.choice", IRType::any());
        sigs.insert("random.shuffle", IRType::void());

        // String methods
        for f in ["upper", "lower", "strip", "join", "replace"] {
            sigs.insert(format!("str.{f}"), IRType::string());
        }
        sigs.insert("str.split", IRType::array(IRType::string()));

        // List methods; most mutate in place and return nothing.
        for f in ["append", "extend", "reverse", "sort"] {
            sigs.insert(format!("list.{f}"), IRType::void());
        }
        sigs.insert("list.pop", IRType::any());

        // Builtin identifier calls.
        sigs.insert("builtins.len", IRType::int());
        sigs.insert("builtins.str", IRType::string());
        sigs.insert("builtins.int", IRType::int());
        sigs.insert("builtins.float", IRType::float());
        sigs.insert("builtins.bool", IRType::bool());
        sigs.insert("builtins.print", IRType::void());

        sigs
    }

    pub fn insert(&mut self, path: impl Into<String>, returns: IRType) {
        self.table.insert(path.into(), returns);
    }

    /// Look up a `module.function` path.
    pub fn lookup(&self, path: &str) -> Option<&IRType> {
        self.table.get(path)
    }

    /// Look up a bare builtin identifier (`len`, `str`, ...).
    pub fn lookup_builtin(&self, name: &str) -> Option<&IRType> {
        self.table.get(&format!("builtins.{name}"))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Merge entries from a JSON array of `{"path", "returns"}` objects.
    pub fn load_json(&mut self, json: &str) -> serde_json::Result<usize> {
        let entries: Vec<SignatureEntry> = serde_json::from_str(json)?;
        let count = entries.len();
        for entry in entries {
            let ty = parse_type_name(&entry.returns);
            self.insert(entry.path, ty);
        }
        Ok(count)
    }
}

impl Default for StdlibSignatures {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a canonical type spelling (`int`, `array<string>`, `map<string, int>`,
/// trailing `?` for optional). Unparseable spellings degrade to `any`.
pub fn parse_type_name(spec: &str) -> IRType {
    let spec = spec.trim();
    if let Some(inner) = spec.strip_suffix('?') {
        return parse_type_name(inner).optional();
    }
    if let Some(rest) = spec.strip_prefix("array<") {
        if let Some(inner) = rest.strip_suffix('>') {
            return IRType::array(parse_type_name(inner));
        }
    }
    if let Some(rest) = spec.strip_prefix("map<") {
        if let Some(inner) = rest.strip_suffix('>') {
            // Split on the first top-level comma.
            let mut depth = 0usize;
            for (i, c) in inner.char_indices() {
                match c {
                    '<' => depth += 1,
                    '>' => depth = depth.saturating_sub(1),
                    ',' if depth == 0 => {
                        return IRType::map(
                            parse_type_name(&inner[..i]),
                            parse_type_name(&inner[i + 1..]),
                        );
                    }
                    _ => {}
                }
            }
        }
    }
    if spec.is_empty() || spec.contains('<') || spec.contains('>') {
        return IRType::any();
    }
    IRType::named(spec)
}
