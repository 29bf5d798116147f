//! Canonical wire encoding
//!
//! Every IR node serializes as a `{"tool": "ir_<kind>", "params": {...}}`
//! envelope, nested structurally. The encoding is total over the IR
//! (including `Unrecognized` nodes and attached type annotations) and
//! round-trips without loss; integer and float literals stay distinct.
//!
//! Encoding cannot fail. Decoding validates as it walks and reports the
//! offending node kind in every error.

use crate::error::{Error, Result};
use crate::ir::{
    AssignTarget, BinOp, CatchClause, ComprehensionKind, Expr, IRClass, IREnum, IREnumVariant,
    IRFunction, IRImport, IRModule, IRParameter, IRProperty, IRType, IRTypeDef, Literal, Metadata,
    Stmt, UnaryOp,
};
use serde_json::{json, Map, Value};

/// Encode a module to the wire form.
pub fn encode_module(module: &IRModule) -> Value {
    let mut params = Map::new();
    params.insert("name".into(), json!(module.name));
    if !module.imports.is_empty() {
        params.insert(
            "imports".into(),
            Value::Array(module.imports.iter().map(encode_import).collect()),
        );
    }
    if !module.types.is_empty() {
        params.insert(
            "types".into(),
            Value::Array(module.types.iter().map(encode_type_def).collect()),
        );
    }
    if !module.enums.is_empty() {
        params.insert(
            "enums".into(),
            Value::Array(module.enums.iter().map(encode_enum).collect()),
        );
    }
    if !module.functions.is_empty() {
        params.insert(
            "functions".into(),
            Value::Array(module.functions.iter().map(encode_function).collect()),
        );
    }
    if !module.classes.is_empty() {
        params.insert(
            "classes".into(),
            Value::Array(module.classes.iter().map(encode_class).collect()),
        );
    }
    node("module", params)
}

/// Encode a module to a JSON string (compact).
pub fn to_json(module: &IRModule) -> String {
    encode_module(module).to_string()
}

/// Encode a module to a pretty-printed JSON string.
pub fn to_json_pretty(module: &IRModule) -> String {
    serde_json::to_string_pretty(&encode_module(module)).unwrap_or_else(|_| to_json(module))
}

/// Decode a module from the wire form.
pub fn decode_module(value: &Value) -> Result<IRModule> {
    let params = expect_node(value, "module")?;
    let mut module = IRModule::new(str_field(params, "module", "name")?);
    for item in opt_array(params, "imports") {
        module.imports.push(decode_import(item)?);
    }
    for item in opt_array(params, "types") {
        module.types.push(decode_type_def(item)?);
    }
    for item in opt_array(params, "enums") {
        module.enums.push(decode_enum(item)?);
    }
    for item in opt_array(params, "functions") {
        module.functions.push(decode_function(item)?);
    }
    for item in opt_array(params, "classes") {
        module.classes.push(decode_class(item)?);
    }
    Ok(module)
}

/// Decode a module from a JSON string.
pub fn from_json(json: &str) -> Result<IRModule> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| Error::decode("module", e.to_string()))?;
    decode_module(&value)
}

// ---------------------------------------------------------------------------
// Envelope plumbing

fn node(kind: &str, params: Map<String, Value>) -> Value {
    json!({ "tool": format!("ir_{kind}"), "params": Value::Object(params) })
}

/// Unwrap an envelope, checking the `ir_<kind>` tag.
fn expect_node<'a>(value: &'a Value, kind: &str) -> Result<&'a Map<String, Value>> {
    let (actual, params) = unwrap_node(value, kind)?;
    if actual != kind {
        return Err(Error::decode(
            kind,
            format!("expected `ir_{kind}`, found `ir_{actual}`"),
        ));
    }
    Ok(params)
}

/// Unwrap an envelope without fixing the kind in advance; `context` names the
/// parent for error messages.
fn unwrap_node<'a>(value: &'a Value, context: &str) -> Result<(&'a str, &'a Map<String, Value>)> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::decode(context, "expected a node object"))?;
    let tool = obj
        .get("tool")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::decode(context, "missing `tool` tag"))?;
    let kind = tool
        .strip_prefix("ir_")
        .ok_or_else(|| Error::decode(context, format!("tag `{tool}` is not an IR node")))?;
    let params = obj
        .get("params")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::decode(context, "missing `params` object"))?;
    Ok((kind, params))
}

fn str_field(params: &Map<String, Value>, kind: &str, field: &str) -> Result<String> {
    params
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::decode(kind, format!("missing string field `{field}`")))
}

fn opt_str(params: &Map<String, Value>, field: &str) -> Option<String> {
    params.get(field).and_then(Value::as_str).map(str::to_string)
}

fn bool_field(params: &Map<String, Value>, field: &str) -> bool {
    params.get(field).and_then(Value::as_bool).unwrap_or(false)
}

/// A possibly-absent array field; absent means empty.
fn opt_array<'a>(params: &'a Map<String, Value>, field: &str) -> &'a [Value] {
    params
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn req_field<'a>(params: &'a Map<String, Value>, kind: &str, field: &str) -> Result<&'a Value> {
    params
        .get(field)
        .ok_or_else(|| Error::decode(kind, format!("missing field `{field}`")))
}

fn string_list(params: &Map<String, Value>, field: &str) -> Vec<String> {
    opt_array(params, field)
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Types

pub fn encode_type(ty: &IRType) -> Value {
    let mut params = Map::new();
    params.insert("name".into(), json!(ty.name));
    if !ty.generic_args.is_empty() {
        params.insert(
            "generic_args".into(),
            Value::Array(ty.generic_args.iter().map(encode_type).collect()),
        );
    }
    if ty.is_optional {
        params.insert("optional".into(), json!(true));
    }
    if !ty.metadata.is_empty() {
        params.insert("metadata".into(), encode_metadata(&ty.metadata));
    }
    node("type", params)
}

pub fn decode_type(value: &Value) -> Result<IRType> {
    let params = expect_node(value, "type")?;
    let mut ty = IRType::named(str_field(params, "type", "name")?);
    for arg in opt_array(params, "generic_args") {
        ty.generic_args.push(decode_type(arg)?);
    }
    ty.is_optional = bool_field(params, "optional");
    if let Some(meta) = params.get("metadata") {
        ty.metadata = decode_metadata(meta, "type")?;
    }
    Ok(ty)
}

fn encode_metadata(metadata: &Metadata) -> Value {
    let mut map = Map::new();
    for (key, value) in metadata.iter() {
        map.insert(key.to_string(), json!(value));
    }
    Value::Object(map)
}

fn decode_metadata(value: &Value, kind: &str) -> Result<Metadata> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::decode(kind, "metadata must be an object"))?;
    let mut metadata = Metadata::new();
    for (key, value) in obj {
        let value = value
            .as_str()
            .ok_or_else(|| Error::decode(kind, format!("metadata `{key}` must be a string")))?;
        metadata.insert(key.clone(), value);
    }
    Ok(metadata)
}

fn opt_type(params: &Map<String, Value>, field: &str) -> Result<Option<IRType>> {
    match params.get(field) {
        Some(value) => Ok(Some(decode_type(value)?)),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Module-level declarations

fn encode_import(import: &IRImport) -> Value {
    let mut params = Map::new();
    params.insert("module".into(), json!(import.module));
    if let Some(alias) = &import.alias {
        params.insert("alias".into(), json!(alias));
    }
    if !import.items.is_empty() {
        params.insert("items".into(), json!(import.items));
    }
    node("import", params)
}

fn decode_import(value: &Value) -> Result<IRImport> {
    let params = expect_node(value, "import")?;
    Ok(IRImport {
        module: str_field(params, "import", "module")?,
        alias: opt_str(params, "alias"),
        items: string_list(params, "items"),
    })
}

fn encode_property(prop: &IRProperty) -> Value {
    let mut params = Map::new();
    params.insert("name".into(), json!(prop.name));
    if let Some(ty) = &prop.prop_type {
        params.insert("type".into(), encode_type(ty));
    }
    if let Some(default) = &prop.default {
        params.insert("default".into(), encode_expr(default));
    }
    node("property", params)
}

fn decode_property(value: &Value) -> Result<IRProperty> {
    let params = expect_node(value, "property")?;
    Ok(IRProperty {
        name: str_field(params, "property", "name")?,
        prop_type: opt_type(params, "type")?,
        default: match params.get("default") {
            Some(value) => Some(decode_expr(value)?),
            None => None,
        },
    })
}

fn encode_type_def(def: &IRTypeDef) -> Value {
    let mut params = Map::new();
    params.insert("name".into(), json!(def.name));
    params.insert(
        "fields".into(),
        Value::Array(def.fields.iter().map(encode_property).collect()),
    );
    if let Some(doc) = &def.doc {
        params.insert("doc".into(), json!(doc));
    }
    node("type_def", params)
}

fn decode_type_def(value: &Value) -> Result<IRTypeDef> {
    let params = expect_node(value, "type_def")?;
    let mut fields = Vec::new();
    for field in opt_array(params, "fields") {
        fields.push(decode_property(field)?);
    }
    Ok(IRTypeDef {
        name: str_field(params, "type_def", "name")?,
        fields,
        doc: opt_str(params, "doc"),
    })
}

fn encode_enum(e: &IREnum) -> Value {
    let variants: Vec<Value> = e
        .variants
        .iter()
        .map(|v| {
            let mut params = Map::new();
            params.insert("name".into(), json!(v.name));
            if let Some(value) = &v.value {
                params.insert("value".into(), encode_literal(value));
            }
            node("enum_variant", params)
        })
        .collect();

    let mut params = Map::new();
    params.insert("name".into(), json!(e.name));
    params.insert("variants".into(), Value::Array(variants));
    if let Some(doc) = &e.doc {
        params.insert("doc".into(), json!(doc));
    }
    node("enum", params)
}

fn decode_enum(value: &Value) -> Result<IREnum> {
    let params = expect_node(value, "enum")?;
    let mut variants = Vec::new();
    for variant in opt_array(params, "variants") {
        let vp = expect_node(variant, "enum_variant")?;
        variants.push(IREnumVariant {
            name: str_field(vp, "enum_variant", "name")?,
            value: match vp.get("value") {
                Some(value) => Some(decode_literal(value)?),
                None => None,
            },
        });
    }
    Ok(IREnum {
        name: str_field(params, "enum", "name")?,
        variants,
        doc: opt_str(params, "doc"),
    })
}

fn encode_parameter(param: &IRParameter) -> Value {
    let mut params = Map::new();
    params.insert("name".into(), json!(param.name));
    if let Some(ty) = &param.param_type {
        params.insert("type".into(), encode_type(ty));
    }
    if let Some(default) = &param.default {
        params.insert("default".into(), encode_expr(default));
    }
    node("parameter", params)
}

fn decode_parameter(value: &Value) -> Result<IRParameter> {
    let params = expect_node(value, "parameter")?;
    Ok(IRParameter {
        name: str_field(params, "parameter", "name")?,
        param_type: opt_type(params, "type")?,
        default: match params.get("default") {
            Some(value) => Some(decode_expr(value)?),
            None => None,
        },
    })
}

pub fn encode_function(func: &IRFunction) -> Value {
    let mut params = Map::new();
    params.insert("name".into(), json!(func.name));
    params.insert(
        "params".into(),
        Value::Array(func.params.iter().map(encode_parameter).collect()),
    );
    if let Some(ret) = &func.return_type {
        params.insert("return_type".into(), encode_type(ret));
    }
    if func.is_async {
        params.insert("is_async".into(), json!(true));
    }
    if !func.throws.is_empty() {
        params.insert("throws".into(), json!(func.throws));
    }
    params.insert(
        "body".into(),
        Value::Array(func.body.iter().map(encode_stmt).collect()),
    );
    if let Some(doc) = &func.doc {
        params.insert("doc".into(), json!(doc));
    }
    node("function", params)
}

pub fn decode_function(value: &Value) -> Result<IRFunction> {
    let params = expect_node(value, "function")?;
    let mut parameters = Vec::new();
    for param in opt_array(params, "params") {
        parameters.push(decode_parameter(param)?);
    }
    let mut body = Vec::new();
    for stmt in opt_array(params, "body") {
        body.push(decode_stmt(stmt)?);
    }
    let mut func = IRFunction::new(str_field(params, "function", "name")?, parameters, body);
    func.return_type = opt_type(params, "return_type")?;
    func.is_async = bool_field(params, "is_async");
    func.throws = string_list(params, "throws");
    func.doc = opt_str(params, "doc");
    Ok(func)
}

fn encode_class(class: &IRClass) -> Value {
    let mut params = Map::new();
    params.insert("name".into(), json!(class.name));
    if !class.properties.is_empty() {
        params.insert(
            "properties".into(),
            Value::Array(class.properties.iter().map(encode_property).collect()),
        );
    }
    if let Some(ctor) = &class.constructor {
        params.insert("constructor".into(), encode_function(ctor));
    }
    if !class.methods.is_empty() {
        params.insert(
            "methods".into(),
            Value::Array(class.methods.iter().map(encode_function).collect()),
        );
    }
    if !class.base_classes.is_empty() {
        params.insert("base_classes".into(), json!(class.base_classes));
    }
    if !class.metadata.is_empty() {
        params.insert("metadata".into(), encode_metadata(&class.metadata));
    }
    node("class", params)
}

fn decode_class(value: &Value) -> Result<IRClass> {
    let params = expect_node(value, "class")?;
    let mut class = IRClass::new(str_field(params, "class", "name")?);
    for prop in opt_array(params, "properties") {
        class.properties.push(decode_property(prop)?);
    }
    if let Some(ctor) = params.get("constructor") {
        class.constructor = Some(decode_function(ctor)?);
    }
    for method in opt_array(params, "methods") {
        class.methods.push(decode_function(method)?);
    }
    class.base_classes = string_list(params, "base_classes");
    if let Some(meta) = params.get("metadata") {
        class.metadata = decode_metadata(meta, "class")?;
    }
    Ok(class)
}

// ---------------------------------------------------------------------------
// Statements

pub fn encode_stmt(stmt: &Stmt) -> Value {
    let mut params = Map::new();
    match stmt {
        Stmt::Assign {
            target,
            value,
            type_annotation,
        } => {
            match target {
                AssignTarget::Symbol(name) => {
                    params.insert("target".into(), json!(name));
                }
                AssignTarget::Index { object, index } => {
                    params.insert("target_object".into(), encode_expr(object));
                    params.insert("target_index".into(), encode_expr(index));
                }
                AssignTarget::Property { object, property } => {
                    params.insert("target_object".into(), encode_expr(object));
                    params.insert("target_property".into(), json!(property));
                }
            }
            params.insert("value".into(), encode_expr(value));
            if let Some(ty) = type_annotation {
                params.insert("type".into(), encode_type(ty));
            }
        }
        Stmt::Return(value) => {
            if let Some(expr) = value {
                params.insert("value".into(), encode_expr(expr));
            }
        }
        Stmt::If {
            condition,
            then_body,
            else_body,
        } => {
            params.insert("condition".into(), encode_expr(condition));
            params.insert("then".into(), encode_body(then_body));
            if let Some(else_body) = else_body {
                params.insert("else".into(), encode_body(else_body));
            }
        }
        Stmt::For {
            iterator,
            iterable,
            body,
        } => {
            params.insert("iterator".into(), json!(iterator));
            params.insert("iterable".into(), encode_expr(iterable));
            params.insert("body".into(), encode_body(body));
        }
        Stmt::While { condition, body } => {
            params.insert("condition".into(), encode_expr(condition));
            params.insert("body".into(), encode_body(body));
        }
        Stmt::Try {
            body,
            handlers,
            finally,
        } => {
            params.insert("body".into(), encode_body(body));
            let handlers: Vec<Value> = handlers
                .iter()
                .map(|h| {
                    let mut hp = Map::new();
                    if let Some(ty) = &h.exception_type {
                        hp.insert("exception_type".into(), json!(ty));
                    }
                    if let Some(binding) = &h.binding {
                        hp.insert("binding".into(), json!(binding));
                    }
                    hp.insert("body".into(), encode_body(&h.body));
                    node("catch", hp)
                })
                .collect();
            params.insert("handlers".into(), Value::Array(handlers));
            if let Some(finally) = finally {
                params.insert("finally".into(), encode_body(finally));
            }
        }
        Stmt::Throw(expr) => {
            params.insert("value".into(), encode_expr(expr));
        }
        Stmt::Break | Stmt::Continue | Stmt::Pass => {}
        Stmt::Expr(expr) => {
            params.insert("value".into(), encode_expr(expr));
        }
        Stmt::Unrecognized { raw } => {
            params.insert("raw".into(), json!(raw));
        }
    }
    node(stmt.node_kind(), params)
}

fn encode_body(body: &[Stmt]) -> Value {
    Value::Array(body.iter().map(encode_stmt).collect())
}

pub fn decode_stmt(value: &Value) -> Result<Stmt> {
    let (kind, params) = unwrap_node(value, "statement")?;
    Ok(match kind {
        "assignment" => {
            let target = if let Some(name) = opt_str(params, "target") {
                AssignTarget::Symbol(name)
            } else if let Some(property) = opt_str(params, "target_property") {
                AssignTarget::Property {
                    object: decode_expr(req_field(params, kind, "target_object")?)?,
                    property,
                }
            } else {
                AssignTarget::Index {
                    object: decode_expr(req_field(params, kind, "target_object")?)?,
                    index: decode_expr(req_field(params, kind, "target_index")?)?,
                }
            };
            Stmt::Assign {
                target,
                value: decode_expr(req_field(params, kind, "value")?)?,
                type_annotation: opt_type(params, "type")?,
            }
        }
        "return" => Stmt::Return(match params.get("value") {
            Some(value) => Some(decode_expr(value)?),
            None => None,
        }),
        "if" => Stmt::If {
            condition: decode_expr(req_field(params, kind, "condition")?)?,
            then_body: decode_body(params, "then")?,
            else_body: match params.get("else") {
                Some(_) => Some(decode_body(params, "else")?),
                None => None,
            },
        },
        "for" => Stmt::For {
            iterator: str_field(params, kind, "iterator")?,
            iterable: decode_expr(req_field(params, kind, "iterable")?)?,
            body: decode_body(params, "body")?,
        },
        "while" => Stmt::While {
            condition: decode_expr(req_field(params, kind, "condition")?)?,
            body: decode_body(params, "body")?,
        },
        "try" => {
            let mut handlers = Vec::new();
            for handler in opt_array(params, "handlers") {
                let hp = expect_node(handler, "catch")?;
                handlers.push(CatchClause {
                    exception_type: opt_str(hp, "exception_type"),
                    binding: opt_str(hp, "binding"),
                    body: decode_body(hp, "body")?,
                });
            }
            Stmt::Try {
                body: decode_body(params, "body")?,
                handlers,
                finally: match params.get("finally") {
                    Some(_) => Some(decode_body(params, "finally")?),
                    None => None,
                },
            }
        }
        "throw" => Stmt::Throw(decode_expr(req_field(params, kind, "value")?)?),
        "break" => Stmt::Break,
        "continue" => Stmt::Continue,
        "pass" => Stmt::Pass,
        "expr_stmt" => Stmt::Expr(decode_expr(req_field(params, kind, "value")?)?),
        "unrecognized" => Stmt::Unrecognized {
            raw: str_field(params, kind, "raw")?,
        },
        other => {
            return Err(Error::decode(
                other.to_string(),
                "unknown statement kind",
            ))
        }
    })
}

fn decode_body(params: &Map<String, Value>, field: &str) -> Result<Vec<Stmt>> {
    let mut body = Vec::new();
    for stmt in opt_array(params, field) {
        body.push(decode_stmt(stmt)?);
    }
    Ok(body)
}

// ---------------------------------------------------------------------------
// Expressions

fn encode_literal(lit: &Literal) -> Value {
    let mut params = Map::new();
    params.insert("kind".into(), json!(lit.kind_name()));
    let value = match lit {
        Literal::String(s) => json!(s),
        Literal::Int(i) => json!(i),
        Literal::Float(f) => json!(f),
        Literal::Bool(b) => json!(b),
        Literal::Null => Value::Null,
    };
    params.insert("value".into(), value);
    node("literal", params)
}

fn decode_literal(value: &Value) -> Result<Literal> {
    let params = expect_node(value, "literal")?;
    let kind = str_field(params, "literal", "kind")?;
    let raw = req_field(params, "literal", "value")?;
    let mismatch = || Error::decode("literal", format!("value does not match kind `{kind}`"));
    Ok(match kind.as_str() {
        "string" => Literal::String(raw.as_str().ok_or_else(mismatch)?.to_string()),
        "integer" => Literal::Int(raw.as_i64().ok_or_else(mismatch)?),
        "float" => Literal::Float(raw.as_f64().ok_or_else(mismatch)?),
        "boolean" => Literal::Bool(raw.as_bool().ok_or_else(mismatch)?),
        "null" => Literal::Null,
        other => {
            return Err(Error::decode(
                "literal",
                format!("unknown literal kind `{other}`"),
            ))
        }
    })
}

pub fn encode_expr(expr: &Expr) -> Value {
    if let Expr::Literal(lit) = expr {
        return encode_literal(lit);
    }
    let mut params = Map::new();
    match expr {
        Expr::Literal(_) => unreachable!(),
        Expr::Ident(name) => {
            params.insert("name".into(), json!(name));
        }
        Expr::Binary { op, left, right } => {
            params.insert("op".into(), json!(op.symbol()));
            params.insert("left".into(), encode_expr(left));
            params.insert("right".into(), encode_expr(right));
        }
        Expr::Unary { op, operand } => {
            params.insert("op".into(), json!(op.symbol()));
            params.insert("operand".into(), encode_expr(operand));
        }
        Expr::Call {
            callee,
            args,
            kwargs,
        } => {
            params.insert("callee".into(), encode_expr(callee));
            params.insert(
                "args".into(),
                Value::Array(args.iter().map(encode_expr).collect()),
            );
            if !kwargs.is_empty() {
                let kwargs: Vec<Value> = kwargs
                    .iter()
                    .map(|(name, value)| json!({ "name": name, "value": encode_expr(value) }))
                    .collect();
                params.insert("kwargs".into(), Value::Array(kwargs));
            }
        }
        Expr::PropertyAccess { object, property } => {
            params.insert("object".into(), encode_expr(object));
            params.insert("property".into(), json!(property));
        }
        Expr::Index { object, index } => {
            params.insert("object".into(), encode_expr(object));
            params.insert("index".into(), encode_expr(index));
        }
        Expr::Array(elements) => {
            params.insert(
                "elements".into(),
                Value::Array(elements.iter().map(encode_expr).collect()),
            );
        }
        Expr::Map(entries) => {
            let entries: Vec<Value> = entries
                .iter()
                .map(|(key, value)| Value::Array(vec![encode_expr(key), encode_expr(value)]))
                .collect();
            params.insert("entries".into(), Value::Array(entries));
        }
        Expr::Ternary {
            condition,
            then_value,
            else_value,
        } => {
            params.insert("condition".into(), encode_expr(condition));
            params.insert("then".into(), encode_expr(then_value));
            params.insert("else".into(), encode_expr(else_value));
        }
        Expr::Lambda { params: lp, body } => {
            params.insert(
                "params".into(),
                Value::Array(lp.iter().map(encode_parameter).collect()),
            );
            params.insert("body".into(), encode_expr(body));
        }
        Expr::Comprehension {
            element,
            iterator,
            iterable,
            filter,
            kind,
        } => {
            params.insert("element".into(), encode_expr(element));
            params.insert("iterator".into(), json!(iterator));
            params.insert("iterable".into(), encode_expr(iterable));
            if let Some(filter) = filter {
                params.insert("filter".into(), encode_expr(filter));
            }
            params.insert("kind".into(), json!(kind.as_str()));
        }
        Expr::Await(inner) => {
            params.insert("value".into(), encode_expr(inner));
        }
        Expr::Unrecognized { raw } => {
            params.insert("raw".into(), json!(raw));
        }
    }
    node(expr.node_kind(), params)
}

pub fn decode_expr(value: &Value) -> Result<Expr> {
    let (kind, params) = unwrap_node(value, "expression")?;
    Ok(match kind {
        "literal" => Expr::Literal(decode_literal(value)?),
        "identifier" => Expr::Ident(str_field(params, kind, "name")?),
        "binary_op" => {
            let sym = str_field(params, kind, "op")?;
            let op = BinOp::from_symbol(&sym)
                .ok_or_else(|| Error::decode(kind, format!("unknown operator `{sym}`")))?;
            Expr::Binary {
                op,
                left: Box::new(decode_expr(req_field(params, kind, "left")?)?),
                right: Box::new(decode_expr(req_field(params, kind, "right")?)?),
            }
        }
        "unary_op" => {
            let sym = str_field(params, kind, "op")?;
            let op = UnaryOp::from_symbol(&sym)
                .ok_or_else(|| Error::decode(kind, format!("unknown operator `{sym}`")))?;
            Expr::Unary {
                op,
                operand: Box::new(decode_expr(req_field(params, kind, "operand")?)?),
            }
        }
        "call" => {
            let mut args = Vec::new();
            for arg in opt_array(params, "args") {
                args.push(decode_expr(arg)?);
            }
            let mut kwargs = Vec::new();
            for kwarg in opt_array(params, "kwargs") {
                let obj = kwarg
                    .as_object()
                    .ok_or_else(|| Error::decode("call", "malformed kwarg entry"))?;
                let name = obj
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::decode("call", "kwarg missing `name`"))?;
                let value = obj
                    .get("value")
                    .ok_or_else(|| Error::decode("call", "kwarg missing `value`"))?;
                kwargs.push((name.to_string(), decode_expr(value)?));
            }
            Expr::Call {
                callee: Box::new(decode_expr(req_field(params, kind, "callee")?)?),
                args,
                kwargs,
            }
        }
        "property_access" => Expr::PropertyAccess {
            object: Box::new(decode_expr(req_field(params, kind, "object")?)?),
            property: str_field(params, kind, "property")?,
        },
        "index" => Expr::Index {
            object: Box::new(decode_expr(req_field(params, kind, "object")?)?),
            index: Box::new(decode_expr(req_field(params, kind, "index")?)?),
        },
        "array" => {
            let mut elements = Vec::new();
            for element in opt_array(params, "elements") {
                elements.push(decode_expr(element)?);
            }
            Expr::Array(elements)
        }
        "map" => {
            let mut entries = Vec::new();
            for entry in opt_array(params, "entries") {
                let pair = entry
                    .as_array()
                    .filter(|p| p.len() == 2)
                    .ok_or_else(|| Error::decode("map", "entry must be a [key, value] pair"))?;
                entries.push((decode_expr(&pair[0])?, decode_expr(&pair[1])?));
            }
            Expr::Map(entries)
        }
        "ternary" => Expr::Ternary {
            condition: Box::new(decode_expr(req_field(params, kind, "condition")?)?),
            then_value: Box::new(decode_expr(req_field(params, kind, "then")?)?),
            else_value: Box::new(decode_expr(req_field(params, kind, "else")?)?),
        },
        "lambda" => {
            let mut lambda_params = Vec::new();
            for param in opt_array(params, "params") {
                lambda_params.push(decode_parameter(param)?);
            }
            Expr::Lambda {
                params: lambda_params,
                body: Box::new(decode_expr(req_field(params, kind, "body")?)?),
            }
        }
        "comprehension" => {
            let kind_name = str_field(params, kind, "kind")?;
            let comp_kind = ComprehensionKind::from_str(&kind_name).ok_or_else(|| {
                Error::decode(kind, format!("unknown comprehension kind `{kind_name}`"))
            })?;
            Expr::Comprehension {
                element: Box::new(decode_expr(req_field(params, kind, "element")?)?),
                iterator: str_field(params, kind, "iterator")?,
                iterable: Box::new(decode_expr(req_field(params, kind, "iterable")?)?),
                filter: match params.get("filter") {
                    Some(filter) => Some(Box::new(decode_expr(filter)?)),
                    None => None,
                },
                kind: comp_kind,
            }
        }
        "await" => Expr::Await(Box::new(decode_expr(req_field(params, kind, "value")?)?)),
        "unrecognized" => Expr::Unrecognized {
            raw: str_field(params, kind, "raw")?,
        },
        other => {
            return Err(Error::decode(
                other.to_string(),
                "unknown expression kind",
            ))
        }
    })
}
