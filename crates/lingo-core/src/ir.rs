//! Language-agnostic intermediate representation
//!
//! Every language adapter parses into and generates from these nodes. The
//! statement and expression trees are closed enums so that consumers match
//! exhaustively; a construct with no modeled equivalent travels as an
//! explicit `Unrecognized` node instead of being dropped.

use indexmap::IndexMap;
use smallvec::SmallVec;
use std::fmt;

/// Canonical type descriptor shared by all adapters and the inference engine.
///
/// `name` is one of the canonical names (`string`, `int`, `float`, `bool`,
/// `null`, `any`, `void`, `array`, `map`) or a user class name. Structural
/// equality; treat as immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IRType {
    pub name: String,
    pub generic_args: Vec<IRType>,
    pub is_optional: bool,
    pub metadata: Metadata,
}

impl IRType {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generic_args: Vec::new(),
            is_optional: false,
            metadata: Metadata::new(),
        }
    }

    pub fn string() -> Self {
        Self::named("string")
    }

    pub fn int() -> Self {
        Self::named("int")
    }

    pub fn float() -> Self {
        Self::named("float")
    }

    pub fn bool() -> Self {
        Self::named("bool")
    }

    pub fn null() -> Self {
        Self::named("null")
    }

    pub fn any() -> Self {
        Self::named("any")
    }

    pub fn void() -> Self {
        Self::named("void")
    }

    /// Record-shaped object with no known class name.
    pub fn object() -> Self {
        Self::named("object")
    }

    pub fn array(element: IRType) -> Self {
        Self {
            name: "array".to_string(),
            generic_args: vec![element],
            is_optional: false,
            metadata: Metadata::new(),
        }
    }

    pub fn map(key: IRType, value: IRType) -> Self {
        Self {
            name: "map".to_string(),
            generic_args: vec![key, value],
            is_optional: false,
            metadata: Metadata::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    pub fn is_any(&self) -> bool {
        self.name == "any"
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.name.as_str(), "int" | "float")
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.name.as_str(), "string" | "int" | "float" | "bool" | "null")
    }
}

impl fmt::Display for IRType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.generic_args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.generic_args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ">")?;
        }
        if self.is_optional {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// Typed key-value store for adapter-specific hints.
///
/// Keys recognized by core consumers are enumerated here; adapters may add
/// their own namespaced keys (`go.`, `python.`, ...) which the core ignores.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metadata(IndexMap<String, String>);

impl Metadata {
    /// Source-language ownership annotation carried through the IR.
    pub const OWNERSHIP: &'static str = "ownership";
    /// Marks a class node as a trait/interface rather than a concrete class.
    pub const INTERFACE: &'static str = "interface";
    /// Comma-separated property names observed on a shape-inferred type.
    pub const SHAPE_PROPERTIES: &'static str = "shape.properties";

    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Literal value with its tagged kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Literal {
    /// The canonical primitive type for this literal kind.
    pub fn ir_type(&self) -> IRType {
        match self {
            Literal::String(_) => IRType::string(),
            Literal::Int(_) => IRType::int(),
            Literal::Float(_) => IRType::float(),
            Literal::Bool(_) => IRType::bool(),
            Literal::Null => IRType::null(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Literal::String(_) => "string",
            Literal::Int(_) => "integer",
            Literal::Float(_) => "float",
            Literal::Bool(_) => "boolean",
            Literal::Null => "null",
        }
    }
}

/// Binary operators over the modeled language subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod | BinOp::Pow
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::LtEq => "<=",
            BinOp::Gt => ">",
            BinOp::GtEq => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }

    pub fn from_symbol(sym: &str) -> Option<Self> {
        Some(match sym {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "%" => BinOp::Mod,
            "**" => BinOp::Pow,
            "==" => BinOp::Eq,
            "!=" => BinOp::NotEq,
            "<" => BinOp::Lt,
            "<=" => BinOp::LtEq,
            ">" => BinOp::Gt,
            ">=" => BinOp::GtEq,
            "and" => BinOp::And,
            "or" => BinOp::Or,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
        }
    }

    pub fn from_symbol(sym: &str) -> Option<Self> {
        Some(match sym {
            "not" => UnaryOp::Not,
            "-" => UnaryOp::Neg,
            "+" => UnaryOp::Pos,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionKind {
    Array,
    Set,
    Map,
    Generator,
}

impl ComprehensionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComprehensionKind::Array => "array",
            ComprehensionKind::Set => "set",
            ComprehensionKind::Map => "map",
            ComprehensionKind::Generator => "generator",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "array" => ComprehensionKind::Array,
            "set" => ComprehensionKind::Set,
            "map" => ComprehensionKind::Map,
            "generator" => ComprehensionKind::Generator,
            _ => return None,
        })
    }
}

/// Expression tree. Strict ownership: each node owns its children.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    PropertyAccess {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Array(Vec<Expr>),
    /// Ordered key -> value entries.
    Map(Vec<(Expr, Expr)>),
    Ternary {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
    Lambda {
        params: Vec<IRParameter>,
        body: Box<Expr>,
    },
    Comprehension {
        element: Box<Expr>,
        iterator: String,
        iterable: Box<Expr>,
        filter: Option<Box<Expr>>,
        kind: ComprehensionKind,
    },
    Await(Box<Expr>),
    /// Source construct with no modeled equivalent; raw text preserved.
    Unrecognized { raw: String },
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn int(v: i64) -> Self {
        Expr::Literal(Literal::Int(v))
    }

    pub fn float(v: f64) -> Self {
        Expr::Literal(Literal::Float(v))
    }

    pub fn str(v: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(v.into()))
    }

    pub fn bool(v: bool) -> Self {
        Expr::Literal(Literal::Bool(v))
    }

    pub fn null() -> Self {
        Expr::Literal(Literal::Null)
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Call with a plain identifier callee: `f(args...)`.
    pub fn call_named(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(Expr::Ident(name.into())),
            args,
            kwargs: Vec::new(),
        }
    }

    /// Call through a `module.function` path: `m.f(args...)`.
    pub fn call_path(module: impl Into<String>, function: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(Expr::PropertyAccess {
                object: Box::new(Expr::Ident(module.into())),
                property: function.into(),
            }),
            args,
            kwargs: Vec::new(),
        }
    }

    pub fn property(object: Expr, property: impl Into<String>) -> Self {
        Expr::PropertyAccess {
            object: Box::new(object),
            property: property.into(),
        }
    }

    pub fn index(object: Expr, index: Expr) -> Self {
        Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
        }
    }

    /// Resolve a callee expression to a dotted path.
    ///
    /// `f` resolves to `"f"`, `m.f` to `"m.f"`. Anything else (computed
    /// callees, chained access) is unresolvable and returns `None`.
    pub fn callee_path(&self) -> Option<String> {
        match self {
            Expr::Ident(name) => Some(name.clone()),
            Expr::PropertyAccess { object, property } => match object.as_ref() {
                Expr::Ident(base) => Some(format!("{base}.{property}")),
                _ => None,
            },
            _ => None,
        }
    }

    /// Node-kind label used in wire encoding and error context.
    pub fn node_kind(&self) -> &'static str {
        match self {
            Expr::Literal(_) => "literal",
            Expr::Ident(_) => "identifier",
            Expr::Binary { .. } => "binary_op",
            Expr::Unary { .. } => "unary_op",
            Expr::Call { .. } => "call",
            Expr::PropertyAccess { .. } => "property_access",
            Expr::Index { .. } => "index",
            Expr::Array(_) => "array",
            Expr::Map(_) => "map",
            Expr::Ternary { .. } => "ternary",
            Expr::Lambda { .. } => "lambda",
            Expr::Comprehension { .. } => "comprehension",
            Expr::Await(_) => "await",
            Expr::Unrecognized { .. } => "unrecognized",
        }
    }
}

/// Assignment target.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Symbol(String),
    Index { object: Expr, index: Expr },
    Property { object: Expr, property: String },
}

impl AssignTarget {
    pub fn symbol(name: impl Into<String>) -> Self {
        AssignTarget::Symbol(name.into())
    }

    /// Name of the assigned local, if the target is a plain symbol.
    pub fn symbol_name(&self) -> Option<&str> {
        match self {
            AssignTarget::Symbol(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub exception_type: Option<String>,
    pub binding: Option<String>,
    pub body: Vec<Stmt>,
}

/// Statement tree. Strict ownership, no cycles.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign {
        target: AssignTarget,
        value: Expr,
        /// Attached during the type system's final annotation step.
        type_annotation: Option<IRType>,
    },
    Return(Option<Expr>),
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    For {
        iterator: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    Throw(Expr),
    Break,
    Continue,
    Pass,
    /// Bare expression statement (typically a call).
    Expr(Expr),
    Unrecognized { raw: String },
}

impl Stmt {
    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Stmt::Assign {
            target: AssignTarget::Symbol(name.into()),
            value,
            type_annotation: None,
        }
    }

    pub fn ret(value: Expr) -> Self {
        Stmt::Return(Some(value))
    }

    pub fn node_kind(&self) -> &'static str {
        match self {
            Stmt::Assign { .. } => "assignment",
            Stmt::Return(_) => "return",
            Stmt::If { .. } => "if",
            Stmt::For { .. } => "for",
            Stmt::While { .. } => "while",
            Stmt::Try { .. } => "try",
            Stmt::Throw(_) => "throw",
            Stmt::Break => "break",
            Stmt::Continue => "continue",
            Stmt::Pass => "pass",
            Stmt::Expr(_) => "expr_stmt",
            Stmt::Unrecognized { .. } => "unrecognized",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IRParameter {
    pub name: String,
    pub param_type: Option<IRType>,
    pub default: Option<Expr>,
}

impl IRParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: None,
            default: None,
        }
    }

    pub fn typed(name: impl Into<String>, ty: IRType) -> Self {
        Self {
            name: name.into(),
            param_type: Some(ty),
            default: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IRFunction {
    pub name: String,
    pub params: SmallVec<[IRParameter; 4]>,
    pub return_type: Option<IRType>,
    pub is_async: bool,
    /// Exception/error type names the function may raise.
    pub throws: Vec<String>,
    pub body: Vec<Stmt>,
    pub doc: Option<String>,
}

impl IRFunction {
    pub fn new(name: impl Into<String>, params: Vec<IRParameter>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            params: SmallVec::from_vec(params),
            return_type: None,
            is_async: false,
            throws: Vec::new(),
            body,
            doc: None,
        }
    }

    pub fn with_return_type(mut self, ty: IRType) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn param(&self, name: &str) -> Option<&IRParameter> {
        self.params.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IRProperty {
    pub name: String,
    pub prop_type: Option<IRType>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IRClass {
    pub name: String,
    pub properties: Vec<IRProperty>,
    pub constructor: Option<IRFunction>,
    pub methods: Vec<IRFunction>,
    pub base_classes: Vec<String>,
    pub metadata: Metadata,
}

impl IRClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            constructor: None,
            methods: Vec::new(),
            base_classes: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn is_interface(&self) -> bool {
        self.metadata.get(Metadata::INTERFACE) == Some("true")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IREnumVariant {
    pub name: String,
    pub value: Option<Literal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IREnum {
    pub name: String,
    pub variants: Vec<IREnumVariant>,
    pub doc: Option<String>,
}

/// Record/interface definition.
#[derive(Debug, Clone, PartialEq)]
pub struct IRTypeDef {
    pub name: String,
    pub fields: Vec<IRProperty>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IRImport {
    pub module: String,
    pub alias: Option<String>,
    pub items: Vec<String>,
}

/// One parsed source module. Created once per parse; after parsing the only
/// structural mutation is attaching inferred types to existing nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IRModule {
    pub name: String,
    pub imports: Vec<IRImport>,
    pub types: Vec<IRTypeDef>,
    pub enums: Vec<IREnum>,
    pub functions: Vec<IRFunction>,
    pub classes: Vec<IRClass>,
}

impl IRModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// All functions in the module, including class constructors and methods
    /// under their `Class.method` qualified names.
    pub fn all_functions(&self) -> Vec<(String, &IRFunction)> {
        let mut out: Vec<(String, &IRFunction)> = self
            .functions
            .iter()
            .map(|f| (f.name.clone(), f))
            .collect();
        for class in &self.classes {
            if let Some(ctor) = &class.constructor {
                out.push((format!("{}.{}", class.name, ctor.name), ctor));
            }
            for method in &class.methods {
                out.push((format!("{}.{}", class.name, method.name), method));
            }
        }
        out
    }

    pub fn find_function(&self, name: &str) -> Option<&IRFunction> {
        self.all_functions()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f)
    }
}
