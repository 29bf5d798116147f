//! Whole-module context analysis
//!
//! Builds the facts local inference cannot see on its own: the call graph,
//! per-variable usage evidence, collected return expressions, and data-flow
//! edges from call arguments into callee parameters. Everything here is
//! evidence collection; no types are resolved and nothing in this module
//! fails; unresolvable call targets are simply omitted.

use crate::ir::{AssignTarget, Expr, IRFunction, IRModule, Stmt};
use indexmap::{IndexMap, IndexSet};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

/// A resolved call site, stored in a side table keyed by caller.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub caller: String,
    pub callee: String,
    pub args: Vec<Expr>,
}

/// Usage evidence for one (function, variable) pair. Evidence only, never
/// ground truth.
#[derive(Debug, Clone, Default)]
pub struct VariableUsage {
    pub read_count: usize,
    pub write_count: usize,
    /// Property names accessed on the variable.
    pub property_accesses: BTreeSet<String>,
    /// Operator symbols the variable participated in.
    pub operators: BTreeSet<String>,
}

impl VariableUsage {
    /// Whether the evidence points at a record-shaped value: property reads
    /// without any arithmetic participation.
    pub fn looks_object_shaped(&self) -> bool {
        !self.property_accesses.is_empty()
            && !self.operators.iter().any(|op| {
                matches!(op.as_str(), "+" | "-" | "*" | "/" | "%" | "**")
            })
    }

    /// Whether the evidence points at a numeric value.
    pub fn looks_numeric(&self) -> bool {
        self.property_accesses.is_empty()
            && self
                .operators
                .iter()
                .any(|op| matches!(op.as_str(), "+" | "-" | "*" | "/" | "%" | "**"))
    }
}

/// Flow of a caller variable into a callee parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFlow {
    pub from_function: String,
    pub from_variable: String,
    pub to_function: String,
    pub to_parameter: String,
}

/// Per-function analysis facts.
#[derive(Debug, Clone, Default)]
pub struct FunctionContext {
    pub name: String,
    pub param_names: Vec<String>,
    pub calls_made: Vec<CallSite>,
    pub variable_usage: IndexMap<String, VariableUsage>,
    pub return_expressions: Vec<Expr>,
}

impl FunctionContext {
    fn usage_mut(&mut self, name: &str) -> &mut VariableUsage {
        self.variable_usage.entry(name.to_string()).or_default()
    }
}

/// Directed call graph: nodes are function names, edges are resolved call
/// sites. Kept consistent with the IR it was built from.
#[derive(Debug, Default)]
pub struct CallGraph {
    graph: DiGraph<String, ()>,
    indices: IndexMap<String, NodeIndex>,
}

impl CallGraph {
    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.indices.insert(name.to_string(), idx);
        idx
    }

    pub fn add_edge(&mut self, caller: &str, callee: &str) {
        let from = self.add_node(caller);
        let to = self.add_node(callee);
        self.graph.update_edge(from, to, ());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.indices.keys().map(String::as_str)
    }

    /// Functions directly called by `name`, in call-discovery order.
    pub fn callees(&self, name: &str) -> Vec<String> {
        let Some(&idx) = self.indices.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<String> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect();
        // petgraph iterates neighbors most-recent-first.
        out.reverse();
        out
    }

    /// Functions that directly call `name`.
    pub fn callers(&self, name: &str) -> Vec<String> {
        let Some(&idx) = self.indices.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<String> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect();
        out.reverse();
        out
    }

    /// Shortest call chain from `from` to `to` (BFS), inclusive of both
    /// endpoints. `None` when unreachable.
    pub fn find_call_chain(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let &start = self.indices.get(from)?;
        let &goal = self.indices.get(to)?;

        let mut predecessor: IndexMap<NodeIndex, NodeIndex> = IndexMap::new();
        let mut visited: IndexSet<NodeIndex> = IndexSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(node) = queue.pop_front() {
            if node == goal {
                let mut path = vec![goal];
                let mut cur = goal;
                while cur != start {
                    cur = predecessor[&cur];
                    path.push(cur);
                }
                path.reverse();
                return Some(path.into_iter().map(|n| self.graph[n].clone()).collect());
            }
            for next in self
                .graph
                .neighbors_directed(node, petgraph::Direction::Outgoing)
            {
                if visited.insert(next) {
                    predecessor.insert(next, node);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Strongly-connected components in reverse topological order of the
    /// condensation (callees before callers; cycles grouped).
    pub fn condensation_order(&self) -> Vec<Vec<String>> {
        petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .map(|scc| scc.into_iter().map(|n| self.graph[n].clone()).collect())
            .collect()
    }

    /// DOT rendering for debugging and tooling.
    pub fn to_dot(&self) -> String {
        format!("{:?}", Dot::with_config(&self.graph, &[Config::EdgeNoLabel]))
    }
}

/// Summary counters over an analyzed module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextStatistics {
    pub functions: usize,
    pub call_edges: usize,
    pub call_sites: usize,
    pub data_flows: usize,
    pub tracked_variables: usize,
}

/// Module-wide analyzer. One instance per compilation job; all derived
/// structures are transient.
#[derive(Debug, Default)]
pub struct ContextAnalyzer {
    pub call_graph: CallGraph,
    pub data_flows: Vec<DataFlow>,
    contexts: IndexMap<String, FunctionContext>,
    /// Parameter names per known function, for data-flow matching.
    param_names: IndexMap<String, Vec<String>>,
}

impl ContextAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// One pass over every function body (free functions, constructors, and
    /// methods under `Class.method` names).
    pub fn analyze_module(&mut self, module: &IRModule) {
        let functions = module.all_functions();

        for (name, func) in &functions {
            self.call_graph.add_node(name);
            self.param_names.insert(
                name.clone(),
                func.params.iter().map(|p| p.name.clone()).collect(),
            );
        }

        for (name, func) in &functions {
            let context = self.analyze_function(name, func);
            self.contexts.insert(name.clone(), context);
        }

        debug!(
            functions = self.contexts.len(),
            edges = self.call_graph.edge_count(),
            data_flows = self.data_flows.len(),
            "context analysis complete"
        );
    }

    pub fn get_function_context(&self, name: &str) -> Option<&FunctionContext> {
        self.contexts.get(name)
    }

    pub fn function_contexts(&self) -> impl Iterator<Item = (&str, &FunctionContext)> {
        self.contexts.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_callees(&self, name: &str) -> Vec<String> {
        self.call_graph.callees(name)
    }

    pub fn get_callers(&self, name: &str) -> Vec<String> {
        self.call_graph.callers(name)
    }

    pub fn find_call_chain(&self, from: &str, to: &str) -> Option<Vec<String>> {
        self.call_graph.find_call_chain(from, to)
    }

    /// Data flows feeding one callee parameter.
    pub fn get_data_flows_to(&self, function: &str, parameter: &str) -> Vec<&DataFlow> {
        self.data_flows
            .iter()
            .filter(|f| f.to_function == function && f.to_parameter == parameter)
            .collect()
    }

    pub fn statistics(&self) -> ContextStatistics {
        ContextStatistics {
            functions: self.contexts.len(),
            call_edges: self.call_graph.edge_count(),
            call_sites: self.contexts.values().map(|c| c.calls_made.len()).sum(),
            data_flows: self.data_flows.len(),
            tracked_variables: self.contexts.values().map(|c| c.variable_usage.len()).sum(),
        }
    }

    fn analyze_function(&mut self, name: &str, func: &IRFunction) -> FunctionContext {
        let mut context = FunctionContext {
            name: name.to_string(),
            param_names: func.params.iter().map(|p| p.name.clone()).collect(),
            ..Default::default()
        };
        self.walk_body(&func.body, &mut context);
        context
    }

    fn walk_body(&mut self, body: &[Stmt], context: &mut FunctionContext) {
        for stmt in body {
            self.walk_stmt(stmt, context);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt, context: &mut FunctionContext) {
        match stmt {
            Stmt::Assign { target, value, .. } => {
                match target {
                    AssignTarget::Symbol(name) => {
                        context.usage_mut(name).write_count += 1;
                    }
                    AssignTarget::Index { object, index } => {
                        self.walk_expr(object, context);
                        self.walk_expr(index, context);
                    }
                    AssignTarget::Property { object, property } => {
                        if let Expr::Ident(base) = object {
                            let usage = context.usage_mut(base);
                            usage.write_count += 1;
                            usage.property_accesses.insert(property.clone());
                        } else {
                            self.walk_expr(object, context);
                        }
                    }
                }
                self.walk_expr(value, context);
            }
            Stmt::Return(value) => {
                if let Some(expr) = value {
                    context.return_expressions.push(expr.clone());
                    self.walk_expr(expr, context);
                } else {
                    context.return_expressions.push(Expr::null());
                }
            }
            Stmt::If {
                condition,
                then_body,
                else_body,
            } => {
                self.walk_expr(condition, context);
                self.walk_body(then_body, context);
                if let Some(else_body) = else_body {
                    self.walk_body(else_body, context);
                }
            }
            Stmt::For {
                iterator,
                iterable,
                body,
            } => {
                context.usage_mut(iterator).write_count += 1;
                self.walk_expr(iterable, context);
                self.walk_body(body, context);
            }
            Stmt::While { condition, body } => {
                self.walk_expr(condition, context);
                self.walk_body(body, context);
            }
            Stmt::Try {
                body,
                handlers,
                finally,
            } => {
                self.walk_body(body, context);
                for handler in handlers {
                    if let Some(binding) = &handler.binding {
                        context.usage_mut(binding).write_count += 1;
                    }
                    self.walk_body(&handler.body, context);
                }
                if let Some(finally) = finally {
                    self.walk_body(finally, context);
                }
            }
            Stmt::Throw(expr) | Stmt::Expr(expr) => self.walk_expr(expr, context),
            Stmt::Break | Stmt::Continue | Stmt::Pass => {}
            Stmt::Unrecognized { .. } => {}
        }
    }

    fn walk_expr(&mut self, expr: &Expr, context: &mut FunctionContext) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Ident(name) => {
                context.usage_mut(name).read_count += 1;
            }
            Expr::Binary { op, left, right } => {
                for side in [left.as_ref(), right.as_ref()] {
                    if let Expr::Ident(name) = side {
                        context.usage_mut(name).operators.insert(op.symbol().to_string());
                    }
                }
                self.walk_expr(left, context);
                self.walk_expr(right, context);
            }
            Expr::Unary { op, operand } => {
                if let Expr::Ident(name) = operand.as_ref() {
                    context.usage_mut(name).operators.insert(op.symbol().to_string());
                }
                self.walk_expr(operand, context);
            }
            Expr::Call { callee, args, kwargs } => {
                self.record_call(callee, args, context);
                for arg in args {
                    self.walk_expr(arg, context);
                }
                for (_, value) in kwargs {
                    self.walk_expr(value, context);
                }
            }
            Expr::PropertyAccess { object, property } => {
                if let Expr::Ident(base) = object.as_ref() {
                    let usage = context.usage_mut(base);
                    usage.read_count += 1;
                    usage.property_accesses.insert(property.clone());
                } else {
                    self.walk_expr(object, context);
                }
            }
            Expr::Index { object, index } => {
                self.walk_expr(object, context);
                self.walk_expr(index, context);
            }
            Expr::Array(elements) => {
                for element in elements {
                    self.walk_expr(element, context);
                }
            }
            Expr::Map(entries) => {
                for (key, value) in entries {
                    self.walk_expr(key, context);
                    self.walk_expr(value, context);
                }
            }
            Expr::Ternary {
                condition,
                then_value,
                else_value,
            } => {
                self.walk_expr(condition, context);
                self.walk_expr(then_value, context);
                self.walk_expr(else_value, context);
            }
            Expr::Lambda { body, .. } => self.walk_expr(body, context),
            Expr::Comprehension {
                element,
                iterator,
                iterable,
                filter,
                ..
            } => {
                context.usage_mut(iterator).write_count += 1;
                self.walk_expr(iterable, context);
                self.walk_expr(element, context);
                if let Some(filter) = filter {
                    self.walk_expr(filter, context);
                }
            }
            Expr::Await(inner) => self.walk_expr(inner, context),
            Expr::Unrecognized { .. } => {}
        }
    }

    /// Record a call site when the callee resolves to a plain identifier or
    /// a `module.function` path; dynamic callees are walked as ordinary
    /// expressions and omitted from the graph.
    fn record_call(&mut self, callee: &Expr, args: &[Expr], context: &mut FunctionContext) {
        let Some(path) = callee.callee_path() else {
            self.walk_expr(callee, context);
            return;
        };

        context.calls_made.push(CallSite {
            caller: context.name.clone(),
            callee: path.clone(),
            args: args.to_vec(),
        });

        if let Some(callee_params) = self.param_names.get(&path).cloned() {
            self.call_graph.add_edge(&context.name, &path);

            // Bare-identifier arguments flow into the matching parameter.
            for (arg, param) in args.iter().zip(callee_params.iter()) {
                if let Expr::Ident(var) = arg {
                    self.data_flows.push(DataFlow {
                        from_function: context.name.clone(),
                        from_variable: var.clone(),
                        to_function: path.clone(),
                        to_parameter: param.clone(),
                    });
                }
            }
        }
    }
}
