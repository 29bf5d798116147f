use lingo_core::inference::join_types;
use lingo_core::ir::{BinOp, ComprehensionKind, Expr, IRType, Literal, UnaryOp};
use lingo_core::wire;
use proptest::prelude::*;
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;

// ---------------------------------------------------------------------------
// proptest: wire round trips over generated trees

fn arb_literal() -> impl Strategy<Value = Literal> {
    prop_oneof![
        "[a-z]{0,8}".prop_map(Literal::String),
        any::<i64>().prop_map(Literal::Int),
        // Finite floats only; NaN breaks structural equality, not the codec.
        (-1.0e9..1.0e9f64).prop_map(Literal::Float),
        any::<bool>().prop_map(Literal::Bool),
        Just(Literal::Null),
    ]
}

fn arb_binop() -> impl Strategy<Value = BinOp> {
    prop_oneof![
        Just(BinOp::Add),
        Just(BinOp::Sub),
        Just(BinOp::Mul),
        Just(BinOp::Div),
        Just(BinOp::Mod),
        Just(BinOp::Eq),
        Just(BinOp::Lt),
        Just(BinOp::And),
    ]
}

fn arb_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        arb_literal().prop_map(Expr::Literal),
        "[a-z]{1,6}".prop_map(Expr::Ident),
        "[a-z ]{0,12}".prop_map(|raw| Expr::Unrecognized { raw }),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            (arb_binop(), inner.clone(), inner.clone())
                .prop_map(|(op, l, r)| Expr::binary(op, l, r)),
            inner
                .clone()
                .prop_map(|operand| Expr::unary(UnaryOp::Neg, operand)),
            (inner.clone(), "[a-z]{1,6}").prop_map(|(object, prop)| Expr::property(object, prop)),
            (inner.clone(), inner.clone()).prop_map(|(object, index)| Expr::index(object, index)),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Expr::Array),
            prop::collection::vec((inner.clone(), inner.clone()), 0..3).prop_map(Expr::Map),
            ("[a-z]{1,6}", prop::collection::vec(inner.clone(), 0..3))
                .prop_map(|(name, args)| Expr::call_named(name, args)),
            (inner.clone(), "[a-z]{1,4}", inner.clone()).prop_map(|(element, iterator, iterable)| {
                Expr::Comprehension {
                    element: Box::new(element),
                    iterator,
                    iterable: Box::new(iterable),
                    filter: None,
                    kind: ComprehensionKind::Array,
                }
            }),
            inner.prop_map(|e| Expr::Await(Box::new(e))),
        ]
    })
}

fn arb_type() -> impl Strategy<Value = IRType> {
    let leaf = prop_oneof![
        Just(IRType::string()),
        Just(IRType::int()),
        Just(IRType::float()),
        Just(IRType::bool()),
        Just(IRType::null()),
        Just(IRType::any()),
        "[A-Z][a-z]{0,6}".prop_map(IRType::named),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(IRType::array),
            (inner.clone(), inner.clone()).prop_map(|(k, v)| IRType::map(k, v)),
            inner.prop_map(IRType::optional),
        ]
    })
}

proptest! {
    #[test]
    fn prop_expr_wire_round_trip(expr in arb_expr()) {
        let decoded = wire::decode_expr(&wire::encode_expr(&expr)).unwrap();
        prop_assert_eq!(decoded, expr);
    }

    #[test]
    fn prop_type_wire_round_trip(ty in arb_type()) {
        let decoded = wire::decode_type(&wire::encode_type(&ty)).unwrap();
        prop_assert_eq!(decoded, ty);
    }

    #[test]
    fn prop_every_envelope_is_tagged(expr in arb_expr()) {
        let encoded = wire::encode_expr(&expr);
        let tool = encoded["tool"].as_str().unwrap();
        prop_assert!(tool.starts_with("ir_"));
        prop_assert!(encoded["params"].is_object());
    }
}

// ---------------------------------------------------------------------------
// quickcheck: join laws

#[derive(Debug, Clone)]
struct SimpleType(IRType);

impl Arbitrary for SimpleType {
    fn arbitrary(g: &mut Gen) -> Self {
        let base = g
            .choose(&["string", "int", "float", "bool", "null", "any"])
            .unwrap()
            .to_string();
        let ty = match u8::arbitrary(g) % 4 {
            0 => IRType::array(IRType::named(&base)),
            1 => IRType::named(&base).optional(),
            _ => IRType::named(&base),
        };
        SimpleType(ty)
    }
}

#[quickcheck]
fn prop_join_is_idempotent(a: SimpleType) -> bool {
    join_types(&a.0, &a.0) == Some(a.0)
}

#[quickcheck]
fn prop_join_is_commutative(a: SimpleType, b: SimpleType) -> bool {
    join_types(&a.0, &b.0) == join_types(&b.0, &a.0)
}

#[quickcheck]
fn prop_any_absorbs(a: SimpleType) -> bool {
    join_types(&a.0, &IRType::any()) == Some(a.0)
}
