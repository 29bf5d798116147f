//! Cross-function type system
//!
//! Orchestrates local inference over the call graph until a fixpoint:
//! seed from local evidence, push argument types forward into callee
//! parameters, pull return-expression types backward into return slots, and
//! repeat over the strongly-connected-component condensation (callees before
//! callers, cycles revisited as a group) until nothing changes or the
//! iteration cap is hit. Inference never fails; exhausted evidence degrades
//! to `any` at confidence zero.

use crate::context::ContextAnalyzer;
use crate::inference::{join_types, FunctionTypes, LocalInference};
use crate::ir::{Expr, IRFunction, IRModule, IRType, Metadata, Stmt};
use crate::stdlib::StdlibSignatures;
use indexmap::IndexMap;
use std::fmt;
use tracing::{debug, trace};

/// Where the evidence for an inferred type came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSource {
    /// Declared annotation carried from the source program.
    Declared,
    /// Literal values observed locally.
    Literal,
    /// Argument types propagated from call sites.
    CallSite,
    /// Merged return-expression types.
    ReturnExpr,
    /// Property-access shape evidence.
    UsageShape,
    /// Local expression structure (operators over other locals).
    Expression,
    /// No evidence at all; the `any` fallback.
    Fallback,
}

impl TypeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeSource::Declared => "declared",
            TypeSource::Literal => "literal",
            TypeSource::CallSite => "call-site",
            TypeSource::ReturnExpr => "return-expr",
            TypeSource::UsageShape => "usage-shape",
            TypeSource::Expression => "expression",
            TypeSource::Fallback => "fallback",
        }
    }
}

/// An inferred type with its confidence and provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub ty: IRType,
    /// In `[0, 1]`; 1.0 for declared annotations and direct literals.
    pub confidence: f32,
    pub source: TypeSource,
}

impl TypeInfo {
    pub fn new(ty: IRType, confidence: f32, source: TypeSource) -> Self {
        Self {
            ty,
            confidence,
            source,
        }
    }

    /// The engine's normal unresolved outcome.
    pub fn fallback() -> Self {
        Self::new(IRType::any(), 0.0, TypeSource::Fallback)
    }
}

/// Map key: a name scoped to one function, with `__return__` reserved for
/// the return slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopedName {
    pub scope: String,
    pub name: String,
}

pub const RETURN_SLOT: &str = "__return__";

impl ScopedName {
    pub fn local(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }

    pub fn ret(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: RETURN_SLOT.to_string(),
        }
    }

    pub fn is_return(&self) -> bool {
        self.name == RETURN_SLOT
    }
}

impl fmt::Display for ScopedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope, self.name)
    }
}

/// The module-wide type map produced by the orchestrator. Iteration order is
/// deterministic (insertion order over functions, then names).
pub type TypeMap = IndexMap<ScopedName, TypeInfo>;

// Confidence ladder: evidence quality decreases from declared annotations
// down to shape heuristics.
const CONF_DECLARED: f32 = 1.0;
const CONF_LITERAL: f32 = 1.0;
const CONF_LOCAL: f32 = 0.9;
const CONF_RETURN: f32 = 0.85;
const CONF_CALL_LITERAL: f32 = 0.95;
const CONF_CALL_INFERRED: f32 = 0.75;
const CONF_SHAPE: f32 = 0.6;
const CONF_CONFLICT: f32 = 0.3;

/// Cross-function type inference orchestrator.
///
/// Instance-scoped: one `TypeSystem` per compilation job, no process-wide
/// state, so independent modules may be inferred concurrently.
pub struct TypeSystem {
    stdlib: StdlibSignatures,
    iteration_cap: Option<usize>,
}

impl TypeSystem {
    pub fn new() -> Self {
        Self {
            stdlib: StdlibSignatures::new(),
            iteration_cap: None,
        }
    }

    pub fn with_stdlib(mut self, stdlib: StdlibSignatures) -> Self {
        self.stdlib = stdlib;
        self
    }

    /// Override the fixpoint iteration cap (default `2 * functions + 2`).
    pub fn with_iteration_cap(mut self, cap: usize) -> Self {
        self.iteration_cap = Some(cap);
        self
    }

    fn cap_for(&self, function_count: usize) -> usize {
        self.iteration_cap.unwrap_or(2 * function_count + 2)
    }

    /// Local-only inference: one single pass per function, no call-graph
    /// propagation. Kept as the baseline the cross-function pass improves on.
    pub fn propagate_types(&self, module: &IRModule) -> TypeMap {
        let mut known_returns = IndexMap::new();
        for (name, func) in module.all_functions() {
            if let Some(ret) = &func.return_type {
                known_returns.insert(name, ret.clone());
            }
        }

        let engine = LocalInference::new(&known_returns, &self.stdlib);
        let empty_seed = IndexMap::new();
        let mut map = TypeMap::new();
        for (name, func) in module.all_functions() {
            let types = engine.infer_function(func, &empty_seed);
            self.record_function(&name, func, &types, None, &mut map);
        }
        map
    }

    /// Full cross-function analysis. Pure with respect to the module; use
    /// [`TypeSystem::apply`] to attach the result.
    pub fn analyze_cross_function_types(&self, module: &IRModule) -> TypeMap {
        let mut analyzer = ContextAnalyzer::new();
        analyzer.analyze_module(module);

        let functions: IndexMap<String, &IRFunction> = module.all_functions().into_iter().collect();

        // Callees before callers; cycles grouped and revisited.
        let order: Vec<String> = analyzer
            .call_graph
            .condensation_order()
            .into_iter()
            .flatten()
            .filter(|name| functions.contains_key(name))
            .collect();

        let mut known_returns: IndexMap<String, IRType> = IndexMap::new();
        for (name, func) in &functions {
            if let Some(ret) = &func.return_type {
                known_returns.insert(name.clone(), ret.clone());
            }
        }

        // Parameter evidence pushed from call sites: function -> param ->
        // (type, confidence).
        let mut param_seeds: IndexMap<String, IndexMap<String, (IRType, f32)>> = IndexMap::new();
        let mut envs: IndexMap<String, FunctionTypes> = IndexMap::new();

        let cap = self.cap_for(functions.len());
        let mut iterations = 0;
        loop {
            iterations += 1;
            let mut changed = false;

            // Re-run local inference with current cross-function knowledge,
            // refreshing return-type candidates (backward propagation).
            for name in &order {
                let func = functions[name];
                let seed: IndexMap<String, IRType> = param_seeds
                    .get(name)
                    .map(|seeds| seeds.iter().map(|(k, (ty, _))| (k.clone(), ty.clone())).collect())
                    .unwrap_or_default();

                let engine = LocalInference::new(&known_returns, &self.stdlib);
                let types = engine.infer_function(func, &seed);

                if func.return_type.is_none() {
                    if let Some(merged) = types.merged_return_type() {
                        if known_returns.get(name) != Some(&merged) {
                            trace!(function = %name, ty = %merged, "return type candidate");
                            known_returns.insert(name.clone(), merged);
                            changed = true;
                        }
                    }
                }
                envs.insert(name.clone(), types);
            }

            // Forward propagation: argument types into undeclared callee
            // parameters.
            for (caller, context) in analyzer.function_contexts() {
                for call in &context.calls_made {
                    let Some(callee_fn) = functions.get(&call.callee) else {
                        continue;
                    };
                    for (arg, param) in call.args.iter().zip(callee_fn.params.iter()) {
                        if param.param_type.is_some() {
                            continue;
                        }
                        let evidence = match arg {
                            Expr::Literal(lit) => Some((lit.ir_type(), CONF_CALL_LITERAL)),
                            Expr::Ident(var) => envs
                                .get(caller)
                                .and_then(|types| types.env.get(var))
                                .map(|ty| (ty.clone(), CONF_CALL_INFERRED)),
                            _ => None,
                        };
                        let Some((arg_ty, confidence)) = evidence else {
                            continue;
                        };
                        let seeds = param_seeds.entry(call.callee.clone()).or_default();
                        match seeds.get_mut(&param.name) {
                            None => {
                                seeds.insert(param.name.clone(), (arg_ty, confidence));
                                changed = true;
                            }
                            Some((existing, existing_conf)) => {
                                let merged =
                                    join_types(existing, &arg_ty).unwrap_or_else(IRType::any);
                                if merged != *existing {
                                    *existing_conf = if merged.is_any() {
                                        CONF_CONFLICT
                                    } else {
                                        existing_conf.min(confidence)
                                    };
                                    *existing = merged;
                                    changed = true;
                                }
                            }
                        }
                    }
                }
            }

            if !changed || iterations >= cap {
                debug!(iterations, cap, converged = !changed, "fixpoint loop finished");
                break;
            }
        }

        // Assemble the final, immutable map.
        let mut map = TypeMap::new();
        for (name, func) in &functions {
            let types = envs.get(name).cloned().unwrap_or_default();
            let seeds = param_seeds.get(name);
            let shape = analyzer
                .get_function_context(name)
                .map(|ctx| &ctx.variable_usage);

            self.record_function(name, func, &types, seeds, &mut map);

            // Shape heuristic: parameters with property-access evidence and
            // no numeric participation become object-shaped, not `any`.
            if let Some(usage_map) = shape {
                for param in &func.params {
                    let key = ScopedName::local(name.clone(), param.name.clone());
                    let unresolved = map
                        .get(&key)
                        .is_none_or(|info| info.source == TypeSource::Fallback);
                    if !unresolved {
                        continue;
                    }
                    if let Some(usage) = usage_map.get(&param.name) {
                        if usage.looks_object_shaped() {
                            let props: Vec<&str> =
                                usage.property_accesses.iter().map(String::as_str).collect();
                            let ty = IRType::object()
                                .with_metadata(Metadata::SHAPE_PROPERTIES, props.join(","));
                            map.insert(key, TypeInfo::new(ty, CONF_SHAPE, TypeSource::UsageShape));
                        }
                    }
                }
            }
        }
        map
    }

    /// Record one function's parameters, locals, and return slot into `map`.
    fn record_function(
        &self,
        name: &str,
        func: &IRFunction,
        types: &FunctionTypes,
        seeds: Option<&IndexMap<String, (IRType, f32)>>,
        map: &mut TypeMap,
    ) {
        for param in &func.params {
            let key = ScopedName::local(name, param.name.clone());
            let info = if let Some(ty) = &param.param_type {
                TypeInfo::new(ty.clone(), CONF_DECLARED, TypeSource::Declared)
            } else if let Some((ty, confidence)) = seeds.and_then(|s| s.get(&param.name)) {
                TypeInfo::new(ty.clone(), *confidence, TypeSource::CallSite)
            } else {
                TypeInfo::fallback()
            };
            map.insert(key, info);
        }

        for (var, ty) in &types.env {
            if func.param(var).is_some() {
                continue;
            }
            let key = ScopedName::local(name, var.clone());
            let source = classify_binding(func, var);
            let confidence = match source {
                TypeSource::Literal => CONF_LITERAL,
                TypeSource::CallSite => CONF_RETURN,
                _ => CONF_LOCAL,
            };
            map.insert(key, TypeInfo::new(ty.clone(), confidence, source));
        }

        let ret_key = ScopedName::ret(name);
        let info = if let Some(ret) = &func.return_type {
            TypeInfo::new(ret.clone(), CONF_DECLARED, TypeSource::Declared)
        } else if let Some(merged) = types.merged_return_type() {
            if merged.is_any() && !types.return_types.is_empty() {
                // Conflicting return evidence resolved to any.
                TypeInfo::new(merged, CONF_CONFLICT, TypeSource::ReturnExpr)
            } else if types.return_types.len() == types.returns_seen()
                && all_literal_returns(func)
            {
                TypeInfo::new(merged, CONF_LITERAL, TypeSource::Literal)
            } else {
                TypeInfo::new(merged, CONF_RETURN, TypeSource::ReturnExpr)
            }
        } else {
            TypeInfo::fallback()
        };
        map.insert(ret_key, info);
    }

    /// Attach an inference result back onto the IR. The map is computed in
    /// full before any mutation, so a generator can never observe a
    /// partially-annotated module.
    pub fn apply(&self, type_map: &TypeMap, module: &mut IRModule) {
        let class_names: Vec<String> = module.classes.iter().map(|c| c.name.clone()).collect();

        for func in &mut module.functions {
            let scope = func.name.clone();
            apply_to_function(type_map, &scope, func);
        }
        for (class, class_name) in module.classes.iter_mut().zip(class_names) {
            if let Some(ctor) = &mut class.constructor {
                let scope = format!("{}.{}", class_name, ctor.name);
                apply_to_function(type_map, &scope, ctor);
            }
            for method in &mut class.methods {
                let scope = format!("{}.{}", class_name, method.name);
                apply_to_function(type_map, &scope, method);
            }
        }
    }

    /// Convenience: analyze and attach in one call, returning the map.
    pub fn annotate_module(&self, module: &mut IRModule) -> TypeMap {
        let map = self.analyze_cross_function_types(module);
        self.apply(&map, module);
        map
    }
}

impl Default for TypeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionTypes {
    fn returns_seen(&self) -> usize {
        self.return_types.len() + self.unresolved_returns + self.bare_returns
    }
}

fn all_literal_returns(func: &IRFunction) -> bool {
    fn check(body: &[Stmt], all: &mut bool, any: &mut bool) {
        for stmt in body {
            match stmt {
                Stmt::Return(Some(expr)) => {
                    *any = true;
                    if !matches!(expr, Expr::Literal(_)) {
                        *all = false;
                    }
                }
                Stmt::Return(None) => *any = true,
                Stmt::If {
                    then_body,
                    else_body,
                    ..
                } => {
                    check(then_body, all, any);
                    if let Some(else_body) = else_body {
                        check(else_body, all, any);
                    }
                }
                Stmt::For { body, .. } | Stmt::While { body, .. } => check(body, all, any),
                Stmt::Try {
                    body,
                    handlers,
                    finally,
                } => {
                    check(body, all, any);
                    for handler in handlers {
                        check(&handler.body, all, any);
                    }
                    if let Some(finally) = finally {
                        check(finally, all, any);
                    }
                }
                _ => {}
            }
        }
    }
    let mut all = true;
    let mut any = false;
    check(&func.body, &mut all, &mut any);
    any && all
}

/// Classify the first binding of a local to pick a provenance label.
fn classify_binding(func: &IRFunction, var: &str) -> TypeSource {
    fn find<'a>(body: &'a [Stmt], var: &str) -> Option<&'a Expr> {
        for stmt in body {
            match stmt {
                Stmt::Assign { target, value, .. } if target.symbol_name() == Some(var) => {
                    return Some(value);
                }
                Stmt::If {
                    then_body,
                    else_body,
                    ..
                } => {
                    if let Some(found) = find(then_body, var) {
                        return Some(found);
                    }
                    if let Some(found) = else_body.as_deref().and_then(|b| find(b, var)) {
                        return Some(found);
                    }
                }
                Stmt::For { body, .. } | Stmt::While { body, .. } => {
                    if let Some(found) = find(body, var) {
                        return Some(found);
                    }
                }
                Stmt::Try {
                    body,
                    handlers,
                    finally,
                } => {
                    for candidate in std::iter::once(body)
                        .chain(handlers.iter().map(|h| &h.body))
                        .chain(finally.iter())
                    {
                        if let Some(found) = find(candidate, var) {
                            return Some(found);
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }

    match find(&func.body, var) {
        Some(Expr::Call { .. }) => TypeSource::CallSite,
        Some(Expr::Literal(_)) | Some(Expr::Array(_)) | Some(Expr::Map(_)) => TypeSource::Literal,
        _ => TypeSource::Expression,
    }
}

fn apply_to_function(type_map: &TypeMap, scope: &str, func: &mut IRFunction) {
    for param in &mut func.params {
        if param.param_type.is_some() {
            continue;
        }
        let key = ScopedName::local(scope, param.name.clone());
        if let Some(info) = type_map.get(&key) {
            if info.source != TypeSource::Fallback {
                param.param_type = Some(info.ty.clone());
            }
        }
    }

    if func.return_type.is_none() {
        if let Some(info) = type_map.get(&ScopedName::ret(scope)) {
            if info.source != TypeSource::Fallback {
                func.return_type = Some(info.ty.clone());
            }
        }
    }

    annotate_body(type_map, scope, &mut func.body);
}

fn annotate_body(type_map: &TypeMap, scope: &str, body: &mut [Stmt]) {
    for stmt in body {
        match stmt {
            Stmt::Assign {
                target,
                type_annotation,
                ..
            } => {
                if type_annotation.is_none() {
                    if let Some(name) = target.symbol_name() {
                        let key = ScopedName::local(scope, name);
                        if let Some(info) = type_map.get(&key) {
                            if info.source != TypeSource::Fallback {
                                *type_annotation = Some(info.ty.clone());
                            }
                        }
                    }
                }
            }
            Stmt::If {
                then_body,
                else_body,
                ..
            } => {
                annotate_body(type_map, scope, then_body);
                if let Some(else_body) = else_body {
                    annotate_body(type_map, scope, else_body);
                }
            }
            Stmt::For { body, .. } | Stmt::While { body, .. } => {
                annotate_body(type_map, scope, body);
            }
            Stmt::Try {
                body,
                handlers,
                finally,
            } => {
                annotate_body(type_map, scope, body);
                for handler in handlers {
                    annotate_body(type_map, scope, &mut handler.body);
                }
                if let Some(finally) = finally {
                    annotate_body(type_map, scope, finally);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOp, IRParameter};

    #[test]
    fn test_literal_return_types() {
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

        let map = TypeSystem::new().analyze_cross_function_types(&module);

        let name_ret = &map[&ScopedName::ret("get_name")];
        assert_eq!(name_ret.ty, IRType::string());
        assert_eq!(name_ret.confidence, 1.0);
        assert_eq!(name_ret.source, TypeSource::Literal);

        let count_ret = &map[&ScopedName::ret("get_count")];
        assert_eq!(count_ret.ty, IRType::int());
        assert_eq!(count_ret.confidence, 1.0);
    }

    #[test]
    fn test_parameter_seeded_from_call_site() {
        // def double(x): return x * 2
        // def main(): return double(21)
        let mut module = IRModule::new("m");
        module.functions.push(IRFunction::new(
            "double",
            vec![IRParameter::new("x")],
            vec![Stmt::ret(Expr::binary(BinOp::Mul, Expr::ident("x"), Expr::int(2)))],
        ));
        module.functions.push(IRFunction::new(
            "main",
            vec![],
            vec![Stmt::ret(Expr::call_named("double", vec![Expr::int(21)]))],
        ));

        let map = TypeSystem::new().analyze_cross_function_types(&module);

        let x = &map[&ScopedName::local("double", "x")];
        assert_eq!(x.ty, IRType::int());
        assert_eq!(x.source, TypeSource::CallSite);
        assert!(x.confidence > 0.5);

        // The seeded parameter feeds back into both return types.
        assert_eq!(map[&ScopedName::ret("double")].ty, IRType::int());
        assert_eq!(map[&ScopedName::ret("main")].ty, IRType::int());
    }

    #[test]
    fn test_chained_return_propagation() {
        // def bottom(): return 1.5
        // def middle(): return bottom()
        // def top(): return middle()
        let mut module = IRModule::new("m");
        module.functions.push(IRFunction::new(
            "top",
            vec![],
            vec![Stmt::ret(Expr::call_named("middle", vec![]))],
        ));
        module.functions.push(IRFunction::new(
            "middle",
            vec![],
            vec![Stmt::ret(Expr::call_named("bottom", vec![]))],
        ));
        module.functions.push(IRFunction::new(
            "bottom",
            vec![],
            vec![Stmt::ret(Expr::float(1.5))],
        ));

        let map = TypeSystem::new().analyze_cross_function_types(&module);
        assert_eq!(map[&ScopedName::ret("bottom")].ty, IRType::float());
        assert_eq!(map[&ScopedName::ret("middle")].ty, IRType::float());
        assert_eq!(map[&ScopedName::ret("top")].ty, IRType::float());
    }

    #[test]
    fn test_shape_inference_from_property_access() {
        // def f(u): return u.name
        let mut module = IRModule::new("m");
        module.functions.push(IRFunction::new(
            "f",
            vec![IRParameter::new("u")],
            vec![Stmt::ret(Expr::property(Expr::ident("u"), "name"))],
        ));

        let map = TypeSystem::new().analyze_cross_function_types(&module);
        let u = &map[&ScopedName::local("f", "u")];
        assert_eq!(u.ty.name, "object");
        assert!(!u.ty.is_any());
        assert!(!u.ty.is_numeric());
        assert_eq!(u.source, TypeSource::UsageShape);
        assert_eq!(u.ty.metadata.get(Metadata::SHAPE_PROPERTIES), Some("name"));
    }

    #[test]
    fn test_conflicting_returns_resolve_to_any() {
        let mut module = IRModule::new("m");
        module.functions.push(IRFunction::new(
            "odd",
            vec![IRParameter::typed("flag", IRType::bool())],
            vec![Stmt::If {
                condition: Expr::ident("flag"),
                then_body: vec![Stmt::ret(Expr::int(1))],
                else_body: Some(vec![Stmt::ret(Expr::str("one"))]),
            }],
        ));

        let map = TypeSystem::new().analyze_cross_function_types(&module);
        let ret = &map[&ScopedName::ret("odd")];
        assert!(ret.ty.is_any());
        assert!(ret.confidence < 0.5);
    }

    #[test]
    fn test_numeric_conflict_promotes_to_float() {
        let mut module = IRModule::new("m");
        module.functions.push(IRFunction::new(
            "mixed",
            vec![IRParameter::typed("flag", IRType::bool())],
            vec![Stmt::If {
                condition: Expr::ident("flag"),
                then_body: vec![Stmt::ret(Expr::int(1))],
                else_body: Some(vec![Stmt::ret(Expr::float(2.5))]),
            }],
        ));

        let map = TypeSystem::new().analyze_cross_function_types(&module);
        assert_eq!(map[&ScopedName::ret("mixed")].ty, IRType::float());
    }

    #[test]
    fn test_cycle_terminates_with_any() {
        // a calls b, b calls a; no literals anywhere.
        let mut module = IRModule::new("m");
        module.functions.push(IRFunction::new(
            "a",
            vec![],
            vec![Stmt::ret(Expr::call_named("b", vec![]))],
        ));
        module.functions.push(IRFunction::new(
            "b",
            vec![],
            vec![Stmt::ret(Expr::call_named("a", vec![]))],
        ));

        let map = TypeSystem::new().analyze_cross_function_types(&module);
        assert!(map[&ScopedName::ret("a")].ty.is_any() || map[&ScopedName::ret("a")].confidence == 0.0);
        assert!(map[&ScopedName::ret("b")].ty.is_any() || map[&ScopedName::ret("b")].confidence == 0.0);
    }

    #[test]
    fn test_idempotence() {
        let mut module = IRModule::new("m");
        module.functions.push(IRFunction::new(
            "get_user",
            vec![IRParameter::new("user_id")],
            vec![Stmt::ret(Expr::call_path("database", "find", vec![Expr::ident("user_id")]))],
        ));
        module.functions.push(IRFunction::new(
            "process",
            vec![],
            vec![
                Stmt::assign("user", Expr::call_named("get_user", vec![Expr::int(42)])),
                Stmt::Expr(Expr::property(Expr::ident("user"), "name")),
            ],
        ));

        let system = TypeSystem::new();
        let first = system.analyze_cross_function_types(&module);
        let second = system.analyze_cross_function_types(&module);
        assert_eq!(first, second);
    }

    #[test]
    fn test_declared_annotations_win() {
        let mut module = IRModule::new("m");
        module.functions.push(
            IRFunction::new(
                "f",
                vec![IRParameter::typed("x", IRType::string())],
                vec![Stmt::ret(Expr::ident("x"))],
            )
            .with_return_type(IRType::string()),
        );
        module.functions.push(IRFunction::new(
            "g",
            vec![],
            // Calls f with an int; the declared string must not be displaced.
            vec![Stmt::ret(Expr::call_named("f", vec![Expr::int(1)]))],
        ));

        let map = TypeSystem::new().analyze_cross_function_types(&module);
        let x = &map[&ScopedName::local("f", "x")];
        assert_eq!(x.ty, IRType::string());
        assert_eq!(x.source, TypeSource::Declared);
        assert_eq!(map[&ScopedName::ret("g")].ty, IRType::string());
    }

    #[test]
    fn test_apply_is_complete_and_attaches_types() {
        let mut module = IRModule::new("m");
        module.functions.push(IRFunction::new(
            "double",
            vec![IRParameter::new("x")],
            vec![Stmt::ret(Expr::binary(BinOp::Mul, Expr::ident("x"), Expr::int(2)))],
        ));
        module.functions.push(IRFunction::new(
            "main",
            vec![],
            vec![
                Stmt::assign("result", Expr::call_named("double", vec![Expr::int(21)])),
                Stmt::ret(Expr::ident("result")),
            ],
        ));

        let system = TypeSystem::new();
        system.annotate_module(&mut module);

        let double = module.find_function("double").unwrap();
        assert_eq!(double.params[0].param_type, Some(IRType::int()));
        assert_eq!(double.return_type, Some(IRType::int()));

        let main = module.find_function("main").unwrap();
        assert_eq!(main.return_type, Some(IRType::int()));
        match &main.body[0] {
            Stmt::Assign {
                type_annotation, ..
            } => assert_eq!(type_annotation, &Some(IRType::int())),
            other => panic!("unexpected stmt {other:?}"),
        }
    }

    #[test]
    fn test_fallback_not_written_to_ir() {
        let mut module = IRModule::new("m");
        module.functions.push(IRFunction::new(
            "opaque",
            vec![IRParameter::new("x")],
            vec![Stmt::ret(Expr::call_path("vendor", "load", vec![Expr::ident("x")]))],
        ));

        let system = TypeSystem::new();
        system.annotate_module(&mut module);

        let func = module.find_function("opaque").unwrap();
        // No evidence at all: the parameter stays unannotated rather than
        // being stamped `any`.
        assert_eq!(func.params[0].param_type, None);
    }

    #[test]
    fn test_propagate_types_is_local_only() {
        let mut module = IRModule::new("m");
        module.functions.push(IRFunction::new(
            "double",
            vec![IRParameter::new("x")],
            vec![Stmt::ret(Expr::binary(BinOp::Mul, Expr::ident("x"), Expr::int(2)))],
        ));
        module.functions.push(IRFunction::new(
            "main",
            vec![],
            vec![Stmt::ret(Expr::call_named("double", vec![Expr::int(21)]))],
        ));

        let system = TypeSystem::new();
        let local = system.propagate_types(&module);
        // Without cross-function propagation the parameter stays unresolved.
        assert!(local[&ScopedName::local("double", "x")].ty.is_any());

        let cross = system.analyze_cross_function_types(&module);
        assert_eq!(cross[&ScopedName::local("double", "x")].ty, IRType::int());
    }

    #[test]
    fn test_iteration_cap_respected() {
        let mut module = IRModule::new("m");
        module.functions.push(IRFunction::new(
            "a",
            vec![],
            vec![Stmt::ret(Expr::call_named("b", vec![]))],
        ));
        module.functions.push(IRFunction::new(
            "b",
            vec![],
            vec![Stmt::ret(Expr::call_named("a", vec![]))],
        ));

        // A cap of one iteration must still produce a complete map.
        let map = TypeSystem::new()
            .with_iteration_cap(1)
            .analyze_cross_function_types(&module);
        assert!(map.contains_key(&ScopedName::ret("a")));
        assert!(map.contains_key(&ScopedName::ret("b")));
    }

    #[test]
    fn test_expression_bound_local_has_reduced_confidence() {
        // def f(a, b): x = a * b; return x
        let mut module = IRModule::new("m");
        module.functions.push(IRFunction::new(
            "f",
            vec![IRParameter::new("a"), IRParameter::new("b")],
            vec![
                Stmt::assign("x", Expr::binary(BinOp::Mul, Expr::ident("a"), Expr::ident("b"))),
                Stmt::ret(Expr::ident("x")),
            ],
        ));

        let map = TypeSystem::new().analyze_cross_function_types(&module);
        let x = &map[&ScopedName::local("f", "x")];
        assert_eq!(x.ty, IRType::int());
        assert_eq!(x.source, TypeSource::Expression);
        assert!(x.confidence < 1.0);

        // Literal bindings keep full confidence.
        let mut literal = IRModule::new("m");
        literal.functions.push(IRFunction::new(
            "g",
            vec![],
            vec![Stmt::assign("y", Expr::int(1))],
        ));
        let map = TypeSystem::new().analyze_cross_function_types(&literal);
        let y = &map[&ScopedName::local("g", "y")];
        assert_eq!(y.source, TypeSource::Literal);
        assert_eq!(y.confidence, 1.0);
    }

    #[test]
    fn test_scoped_name_display() {
        assert_eq!(ScopedName::local("f", "x").to_string(), "f.x");
        assert_eq!(ScopedName::ret("f").to_string(), "f.__return__");
        assert!(ScopedName::ret("f").is_return());
    }
}
