//! Local type inference
//!
//! Single-pass, bottom-up inference over one function at a time: literals,
//! operators, known function returns, and the stdlib signature table. The
//! pass is flow-insensitive (the first inference for a variable wins) and
//! never fails; anything it cannot resolve stays unknown (`None`) for the
//! orchestrator to map to `any`.

use crate::ir::{BinOp, ComprehensionKind, Expr, IRFunction, IRModule, IRType, Stmt, UnaryOp};
use crate::stdlib::StdlibSignatures;
use indexmap::IndexMap;

/// Per-function result of a local inference pass.
#[derive(Debug, Clone, Default)]
pub struct FunctionTypes {
    /// Variable name -> inferred type (parameters seeded first).
    pub env: IndexMap<String, IRType>,
    /// Types of return expressions that resolved.
    pub return_types: Vec<IRType>,
    /// Return expressions that did not resolve this pass.
    pub unresolved_returns: usize,
    /// Bare `return` statements.
    pub bare_returns: usize,
}

impl FunctionTypes {
    /// Merge the collected return evidence into a single candidate.
    ///
    /// No return statements at all means `void`; an `int`/`float` conflict
    /// promotes to `float`; any other conflict degrades to `any` rather than
    /// picking arbitrarily. `None` means there were returns but no evidence.
    pub fn merged_return_type(&self) -> Option<IRType> {
        if self.return_types.is_empty() {
            if self.bare_returns > 0 {
                return Some(IRType::null());
            }
            if self.unresolved_returns > 0 {
                return None;
            }
            return Some(IRType::void());
        }
        let mut merged = self.return_types[0].clone();
        for ty in &self.return_types[1..] {
            merged = match join_types(&merged, ty) {
                Some(joined) => joined,
                None => return Some(IRType::any()),
            };
        }
        if self.bare_returns > 0 && !merged.is_optional {
            merged = merged.optional();
        }
        Some(merged)
    }
}

/// Join two inferred types: equal types join to themselves, `int`/`float`
/// promotes to `float`, containers join element-wise. `None` for anything
/// incompatible.
pub fn join_types(a: &IRType, b: &IRType) -> Option<IRType> {
    if a == b {
        return Some(a.clone());
    }
    if a.is_any() {
        return Some(b.clone());
    }
    if b.is_any() {
        return Some(a.clone());
    }
    match (a.name.as_str(), b.name.as_str()) {
        ("int", "float") | ("float", "int") => Some(IRType::float()),
        ("null", _) => Some(b.clone().optional()),
        (_, "null") => Some(a.clone().optional()),
        ("array", "array") => {
            let elem = join_types(a.generic_args.first()?, b.generic_args.first()?)?;
            Some(IRType::array(elem))
        }
        ("map", "map") => {
            let key = join_types(a.generic_args.first()?, b.generic_args.first()?)?;
            let val = join_types(a.generic_args.get(1)?, b.generic_args.get(1)?)?;
            Some(IRType::map(key, val))
        }
        _ => None,
    }
}

/// Local inference engine. One instance per module analysis; the known-return
/// and stdlib tables are borrowed from the caller so the orchestrator can
/// refresh them between fixpoint passes.
pub struct LocalInference<'a> {
    known_returns: &'a IndexMap<String, IRType>,
    stdlib: &'a StdlibSignatures,
}

impl<'a> LocalInference<'a> {
    pub fn new(known_returns: &'a IndexMap<String, IRType>, stdlib: &'a StdlibSignatures) -> Self {
        Self {
            known_returns,
            stdlib,
        }
    }

    /// Run one pass over a function. `seed_params` supplies types for
    /// parameters beyond what the function declares (call-site evidence from
    /// the orchestrator); declared annotations always win over seeds.
    pub fn infer_function(
        &self,
        func: &IRFunction,
        seed_params: &IndexMap<String, IRType>,
    ) -> FunctionTypes {
        let mut result = FunctionTypes::default();

        for param in &func.params {
            if let Some(ty) = &param.param_type {
                result.env.insert(param.name.clone(), ty.clone());
            } else if let Some(ty) = seed_params.get(&param.name) {
                result.env.insert(param.name.clone(), ty.clone());
            }
        }

        self.infer_body(&func.body, &mut result);
        result
    }

    fn infer_body(&self, body: &[Stmt], result: &mut FunctionTypes) {
        for stmt in body {
            self.infer_stmt(stmt, result);
        }
    }

    fn infer_stmt(&self, stmt: &Stmt, result: &mut FunctionTypes) {
        match stmt {
            Stmt::Assign { target, value, .. } => {
                let inferred = self.infer_expr(value, &result.env);
                if let (Some(name), Some(ty)) = (target.symbol_name(), inferred) {
                    // Flow-insensitive: the first inference for a name wins.
                    result.env.entry(name.to_string()).or_insert(ty);
                }
            }
            Stmt::Return(Some(expr)) => match self.infer_expr(expr, &result.env) {
                Some(ty) => result.return_types.push(ty),
                None => result.unresolved_returns += 1,
            },
            Stmt::Return(None) => result.bare_returns += 1,
            Stmt::If {
                then_body,
                else_body,
                ..
            } => {
                self.infer_body(then_body, result);
                if let Some(else_body) = else_body {
                    self.infer_body(else_body, result);
                }
            }
            Stmt::For {
                iterator,
                iterable,
                body,
            } => {
                if let Some(elem) = self
                    .infer_expr(iterable, &result.env)
                    .and_then(|ty| element_type(&ty))
                {
                    result.env.entry(iterator.clone()).or_insert(elem);
                }
                self.infer_body(body, result);
            }
            Stmt::While { body, .. } => self.infer_body(body, result),
            Stmt::Try {
                body,
                handlers,
                finally,
            } => {
                self.infer_body(body, result);
                for handler in handlers {
                    self.infer_body(&handler.body, result);
                }
                if let Some(finally) = finally {
                    self.infer_body(finally, result);
                }
            }
            Stmt::Throw(_) | Stmt::Break | Stmt::Continue | Stmt::Pass => {}
            Stmt::Expr(_) => {}
            Stmt::Unrecognized { .. } => {}
        }
    }

    /// Bottom-up expression typing. Unknown is `None`, never an error.
    pub fn infer_expr(&self, expr: &Expr, env: &IndexMap<String, IRType>) -> Option<IRType> {
        match expr {
            Expr::Literal(lit) => Some(lit.ir_type()),
            Expr::Ident(name) => env.get(name).cloned(),
            Expr::Binary { op, left, right } => {
                let left_ty = self.infer_expr(left, env);
                let right_ty = self.infer_expr(right, env);
                self.binary_op_type(*op, left_ty.as_ref(), right_ty.as_ref())
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => Some(IRType::bool()),
                UnaryOp::Neg | UnaryOp::Pos => self.infer_expr(operand, env),
            },
            Expr::Call { callee, .. } => self.infer_call(callee),
            Expr::PropertyAccess { .. } => None,
            Expr::Index { object, .. } => {
                let object_ty = self.infer_expr(object, env)?;
                element_type(&object_ty)
            }
            Expr::Array(elements) => Some(match elements.first() {
                Some(first) => {
                    IRType::array(self.infer_expr(first, env).unwrap_or_else(IRType::any))
                }
                None => IRType::array(IRType::any()),
            }),
            Expr::Map(entries) => Some(match entries.first() {
                // Keys are assumed string-like across the modeled languages.
                Some((_, value)) => IRType::map(
                    IRType::string(),
                    self.infer_expr(value, env).unwrap_or_else(IRType::any),
                ),
                None => IRType::map(IRType::string(), IRType::any()),
            }),
            Expr::Ternary {
                then_value,
                else_value,
                ..
            } => {
                let then_ty = self.infer_expr(then_value, env)?;
                let else_ty = self.infer_expr(else_value, env)?;
                join_types(&then_ty, &else_ty)
            }
            Expr::Lambda { .. } => None,
            Expr::Comprehension { element, kind, .. } => {
                let elem_ty = self.infer_expr(element, env).unwrap_or_else(IRType::any);
                Some(match kind {
                    ComprehensionKind::Map => IRType::map(IRType::string(), elem_ty),
                    _ => IRType::array(elem_ty),
                })
            }
            Expr::Await(inner) => self.infer_expr(inner, env),
            Expr::Unrecognized { .. } => None,
        }
    }

    fn binary_op_type(
        &self,
        op: BinOp,
        left: Option<&IRType>,
        right: Option<&IRType>,
    ) -> Option<IRType> {
        if op.is_comparison() || op.is_logical() {
            return Some(IRType::bool());
        }
        if op.is_arithmetic() {
            // A known float operand forces float; unknown operands are
            // neutral and do not force a fallback.
            let is_float = |ty: Option<&IRType>| ty.is_some_and(|t| t.name == "float");
            if is_float(left) || is_float(right) {
                return Some(IRType::float());
            }
            return Some(IRType::int());
        }
        None
    }

    fn infer_call(&self, callee: &Expr) -> Option<IRType> {
        let path = callee.callee_path()?;
        if let Some(ty) = self.known_returns.get(&path) {
            return Some(ty.clone());
        }
        if path.contains('.') {
            self.stdlib.lookup(&path).cloned()
        } else {
            self.stdlib.lookup_builtin(&path).cloned()
        }
    }
}

/// Element type yielded by indexing or iterating a container.
fn element_type(container: &IRType) -> Option<IRType> {
    match container.name.as_str() {
        "array" => container.generic_args.first().cloned(),
        "map" => container.generic_args.get(1).cloned(),
        "string" => Some(IRType::string()),
        _ => None,
    }
}

/// Local-only inference over every function in a module: one single pass per
/// function using declared signatures and the default stdlib table.
///
/// This is the lightweight entry point; [`crate::type_system::TypeSystem`]
/// layers cross-function propagation on top of it.
pub fn infer_types(module: &IRModule) -> IndexMap<String, FunctionTypes> {
    let stdlib = StdlibSignatures::new();
    let mut known_returns = IndexMap::new();
    for (name, func) in module.all_functions() {
        if let Some(ret) = &func.return_type {
            known_returns.insert(name, ret.clone());
        }
    }

    let engine = LocalInference::new(&known_returns, &stdlib);
    let empty_seed = IndexMap::new();
    let mut results = IndexMap::new();
    for (name, func) in module.all_functions() {
        results.insert(name, engine.infer_function(func, &empty_seed));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AssignTarget, IRParameter, Literal};

    fn engine_fixtures() -> (IndexMap<String, IRType>, StdlibSignatures) {
        (IndexMap::new(), StdlibSignatures::new())
    }

    #[test]
    fn test_literal_inference_is_exact() {
        let (known, stdlib) = engine_fixtures();
        let engine = LocalInference::new(&known, &stdlib);
        let env = IndexMap::new();

        assert_eq!(engine.infer_expr(&Expr::int(42), &env), Some(IRType::int()));
        assert_eq!(engine.infer_expr(&Expr::float(1.5), &env), Some(IRType::float()));
        assert_eq!(engine.infer_expr(&Expr::str("hi"), &env), Some(IRType::string()));
        assert_eq!(engine.infer_expr(&Expr::bool(true), &env), Some(IRType::bool()));
        assert_eq!(engine.infer_expr(&Expr::null(), &env), Some(IRType::null()));
    }

    #[test]
    fn test_arithmetic_float_promotion() {
        let (known, stdlib) = engine_fixtures();
        let engine = LocalInference::new(&known, &stdlib);
        let env = IndexMap::new();

        let int_add = Expr::binary(BinOp::Add, Expr::int(1), Expr::int(2));
        assert_eq!(engine.infer_expr(&int_add, &env), Some(IRType::int()));

        let mixed = Expr::binary(BinOp::Mul, Expr::int(2), Expr::float(0.5));
        assert_eq!(engine.infer_expr(&mixed, &env), Some(IRType::float()));

        // Unknown operand stays neutral; the int default holds.
        let unknown = Expr::binary(BinOp::Sub, Expr::ident("mystery"), Expr::int(1));
        assert_eq!(engine.infer_expr(&unknown, &env), Some(IRType::int()));
    }

    #[test]
    fn test_arithmetic_result_ignores_non_float_operand_types() {
        let (known, stdlib) = engine_fixtures();
        let engine = LocalInference::new(&known, &stdlib);
        let env = IndexMap::new();

        // Only a float operand changes the arithmetic result; string
        // operands do not, even for Add.
        let concat = Expr::binary(BinOp::Add, Expr::str("a"), Expr::str("b"));
        assert_eq!(engine.infer_expr(&concat, &env), Some(IRType::int()));

        let mixed = Expr::binary(BinOp::Add, Expr::str("a"), Expr::float(1.0));
        assert_eq!(engine.infer_expr(&mixed, &env), Some(IRType::float()));
    }

    #[test]
    fn test_comparison_and_logical_are_bool() {
        let (known, stdlib) = engine_fixtures();
        let engine = LocalInference::new(&known, &stdlib);
        let env = IndexMap::new();

        for op in [BinOp::Eq, BinOp::NotEq, BinOp::Lt, BinOp::GtEq, BinOp::And, BinOp::Or] {
            let expr = Expr::binary(op, Expr::ident("a"), Expr::ident("b"));
            assert_eq!(engine.infer_expr(&expr, &env), Some(IRType::bool()), "{op:?}");
        }
    }

    #[test]
    fn test_container_literal_inference() {
        let (known, stdlib) = engine_fixtures();
        let engine = LocalInference::new(&known, &stdlib);
        let env = IndexMap::new();

        let ints = Expr::Array(vec![Expr::int(1), Expr::int(2), Expr::int(3)]);
        assert_eq!(engine.infer_expr(&ints, &env), Some(IRType::array(IRType::int())));

        let empty = Expr::Array(vec![]);
        assert_eq!(engine.infer_expr(&empty, &env), Some(IRType::array(IRType::any())));

        let map = Expr::Map(vec![(Expr::str("a"), Expr::int(1))]);
        assert_eq!(
            engine.infer_expr(&map, &env),
            Some(IRType::map(IRType::string(), IRType::int()))
        );

        let empty_map = Expr::Map(vec![]);
        assert_eq!(
            engine.infer_expr(&empty_map, &env),
            Some(IRType::map(IRType::string(), IRType::any()))
        );
    }

    #[test]
    fn test_stdlib_call_inference() {
        let (known, stdlib) = engine_fixtures();
        let engine = LocalInference::new(&known, &stdlib);
        let env = IndexMap::new();

        let sqrt = Expr::call_path("math", "sqrt", vec![Expr::int(4)]);
        assert_eq!(engine.infer_expr(&sqrt, &env), Some(IRType::float()));

        let len = Expr::call_named("len", vec![Expr::ident("xs")]);
        assert_eq!(engine.infer_expr(&len, &env), Some(IRType::int()));

        let unknown = Expr::call_path("vendor", "load", vec![]);
        assert_eq!(engine.infer_expr(&unknown, &env), None);
    }

    #[test]
    fn test_known_user_function_return_reused() {
        let (mut known, stdlib) = engine_fixtures();
        known.insert("helper".to_string(), IRType::string());
        let engine = LocalInference::new(&known, &stdlib);
        let env = IndexMap::new();

        let call = Expr::call_named("helper", vec![]);
        assert_eq!(engine.infer_expr(&call, &env), Some(IRType::string()));
    }

    #[test]
    fn test_first_inference_wins() {
        let (known, stdlib) = engine_fixtures();
        let engine = LocalInference::new(&known, &stdlib);

        let func = IRFunction::new(
            "f",
            vec![],
            vec![
                Stmt::assign("x", Expr::int(1)),
                Stmt::assign("x", Expr::str("later")),
            ],
        );
        let result = engine.infer_function(&func, &IndexMap::new());
        // Flow-insensitive: the later string assignment does not narrow.
        assert_eq!(result.env.get("x"), Some(&IRType::int()));
    }

    #[test]
    fn test_for_loop_element_typing() {
        let (known, stdlib) = engine_fixtures();
        let engine = LocalInference::new(&known, &stdlib);

        let func = IRFunction::new(
            "f",
            vec![IRParameter::typed("items", IRType::array(IRType::float()))],
            vec![Stmt::For {
                iterator: "item".to_string(),
                iterable: Expr::ident("items"),
                body: vec![Stmt::assign(
                    "doubled",
                    Expr::binary(BinOp::Mul, Expr::ident("item"), Expr::int(2)),
                )],
            }],
        );
        let result = engine.infer_function(&func, &IndexMap::new());
        assert_eq!(result.env.get("item"), Some(&IRType::float()));
        assert_eq!(result.env.get("doubled"), Some(&IRType::float()));
    }

    #[test]
    fn test_return_merging() {
        let mut types = FunctionTypes::default();
        assert_eq!(types.merged_return_type(), Some(IRType::void()));

        types.return_types = vec![IRType::int(), IRType::float()];
        assert_eq!(types.merged_return_type(), Some(IRType::float()));

        types.return_types = vec![IRType::int(), IRType::string()];
        assert_eq!(types.merged_return_type(), Some(IRType::any()));

        types.return_types = vec![IRType::int()];
        types.bare_returns = 1;
        assert_eq!(types.merged_return_type(), Some(IRType::int().optional()));
    }

    #[test]
    fn test_index_assignment_target_does_not_bind() {
        let (known, stdlib) = engine_fixtures();
        let engine = LocalInference::new(&known, &stdlib);
        let func = IRFunction::new(
            "f",
            vec![],
            vec![Stmt::Assign {
                target: AssignTarget::Index {
                    object: Expr::ident("cache"),
                    index: Expr::str("k"),
                },
                value: Expr::int(1),
                type_annotation: None,
            }],
        );
        let result = engine.infer_function(&func, &IndexMap::new());
        assert!(result.env.is_empty());
    }

    #[test]
    fn test_infer_types_module_entry_point() {
        let mut module = IRModule::new("m");
        module.functions.push(IRFunction::new(
            "get_name",
            vec![],
            vec![Stmt::ret(Expr::str("Alice"))],
        ));
        module.functions.push(IRFunction::new(
            "get_count",
            vec![],
            vec![Stmt::ret(Expr::int(42))],
        ));

        let results = infer_types(&module);
        assert_eq!(
            results["get_name"].merged_return_type(),
            Some(IRType::string())
        );
        assert_eq!(results["get_count"].merged_return_type(), Some(IRType::int()));
    }

    #[test]
    fn test_ternary_joins_branches() {
        let (known, stdlib) = engine_fixtures();
        let engine = LocalInference::new(&known, &stdlib);
        let env = IndexMap::new();

        let t = Expr::Ternary {
            condition: Box::new(Expr::bool(true)),
            then_value: Box::new(Expr::int(1)),
            else_value: Box::new(Expr::float(2.0)),
        };
        assert_eq!(engine.infer_expr(&t, &env), Some(IRType::float()));
    }

    #[test]
    fn test_literal_kind_reported() {
        assert_eq!(Literal::Bool(false).kind_name(), "boolean");
    }
}
