//! End-to-end scenarios driving the whole pipeline from a hand-built AST
//! through to rendered assembly text, mirroring the scenario sketches in
//! the project's own design document rather than round-tripping individual
//! passes in isolation.

use std::collections::HashMap;

use quackc::ast::{ClassDef, Expr, FormalArg, Method, Span, Stmt};
use quackc::error::ErrorKind;
use quackc::loader::CONSTRUCTOR_NAME;
use quackc::types::{ClassEntry, MethodSig, TypeWorld};
use quackc::{compile_program, emit, Program};

fn builtin_world() -> TypeWorld {
    let mut w = TypeWorld::new();
    for name in ["Obj", "String", "Bool", "Nothing"] {
        w.insert(
            name.to_string(),
            ClassEntry {
                super_name: "Obj".to_string(),
                ..Default::default()
            },
        );
    }

    let mut int_methods = HashMap::new();
    for (op, ret) in [("PLUS", "Int"), ("TIMES", "Int"), ("LESS", "Bool"), ("EQUALS", "Bool")] {
        int_methods.insert(
            op.to_string(),
            MethodSig {
                params: vec!["Int".into()],
                ret: ret.to_string(),
            },
        );
    }
    int_methods.insert(
        "print".to_string(),
        MethodSig {
            params: vec![],
            ret: "Nothing".to_string(),
        },
    );
    w.insert(
        "Int".to_string(),
        ClassEntry {
            super_name: "Obj".to_string(),
            methods: int_methods,
            fields: HashMap::new(),
        },
    );
    w
}

fn num(n: i64) -> Expr {
    Expr::LitNumber { value: n, ty: String::new(), span: Span::default() }
}

fn var(name: &str) -> Expr {
    Expr::Var { name: name.to_string(), ty: String::new(), span: Span::default() }
}

fn mcall(receiver: Expr, method: &str, args: Vec<Expr>) -> Expr {
    Expr::MCall {
        receiver: Box::new(receiver),
        method: method.to_string(),
        args,
        ty: String::new(),
        span: Span::default(),
    }
}

fn render_main(top_level: Vec<Stmt>, world: TypeWorld) -> String {
    let program = Program { classes: vec![] };
    let (classes, _world) = compile_program(program, top_level, "Main", world).unwrap();
    emit::render_class(&classes[0]).unwrap()
}

/// A. Integer arithmetic and a method call, evaluated left-to-right with
/// precedence already resolved by whatever built the tree (`2 + 3 * 4`).
#[test]
fn scenario_a_integer_arithmetic_and_print() {
    let times = mcall(num(3), "TIMES", vec![num(4)]);
    let plus = mcall(num(2), "PLUS", vec![times]);
    let top_level = vec![
        Stmt::Assign {
            name: "x".into(),
            declared_type: Some("Int".into()),
            value: plus,
            ty: String::new(),
            span: Span::default(),
        },
        Stmt::RawExpr {
            value: mcall(var("x"), "print", vec![]),
            span: Span::default(),
        },
    ];

    let asm = render_main(top_level, builtin_world());
    assert!(asm.contains(".local x"));
    for line in [
        "    const 3",
        "    const 4",
        "    roll 1",
        "    call Int:TIMES",
        "    roll 1",
        "    call Int:PLUS",
        "    store x",
        "    load x",
        "    call Int:print",
        "    pop",
        "    return 0",
    ] {
        assert!(asm.contains(line), "missing {line:?} in:\n{asm}");
    }
}

/// B. Short-circuit `and`: both operands land behind `jump_ifnot`.
#[test]
fn scenario_b_short_circuit_and() {
    let cond = Expr::And {
        left: Box::new(Expr::LitTrue { ty: "Bool".into(), span: Span::default() }),
        right: Box::new(Expr::LitFalse { ty: "Bool".into(), span: Span::default() }),
        ty: String::new(),
        span: Span::default(),
    };
    let top_level = vec![Stmt::Assign {
        name: "b".into(),
        declared_type: Some("Bool".into()),
        value: cond,
        ty: String::new(),
        span: Span::default(),
    }];

    let asm = render_main(top_level, builtin_world());
    assert!(asm.contains("    const true\n    jump_ifnot and_0"));
    assert!(asm.contains("and_0:\n    const false\nand_1:\n    store b"));
}

/// C. if/elif/else lowers to pre-minted labels with a shared join point.
#[test]
fn scenario_c_if_elif_else() {
    let if_stmt = Stmt::If {
        cond: mcall(var("x"), "LESS", vec![num(0)]),
        then_block: vec![Stmt::Assign {
            name: "y".into(),
            declared_type: Some("Int".into()),
            value: num(1),
            ty: String::new(),
            span: Span::default(),
        }],
        elifs: vec![(
            mcall(var("x"), "EQUALS", vec![num(0)]),
            vec![Stmt::Assign {
                name: "y".into(),
                declared_type: Some("Int".into()),
                value: num(2),
                ty: String::new(),
                span: Span::default(),
            }],
        )],
        else_block: Some(vec![Stmt::Assign {
            name: "y".into(),
            declared_type: Some("Int".into()),
            value: num(3),
            ty: String::new(),
            span: Span::default(),
        }]),
        span: Span::default(),
    };

    // `x` must be live before the `if`; assign it first.
    let top_level = vec![
        Stmt::Assign {
            name: "x".into(),
            declared_type: Some("Int".into()),
            value: num(0),
            ty: String::new(),
            span: Span::default(),
        },
        if_stmt,
    ];

    let asm = render_main(top_level, builtin_world());
    assert!(asm.contains("jump_ifnot elif_0"));
    assert!(asm.contains("jump join_0"));
    assert!(asm.contains("elif_0:"));
    assert!(asm.contains("jump_ifnot else_0"));
    assert!(asm.contains("else_0:"));
    assert!(asm.contains("join_0:"));
}

/// D. while loop: jump to the condition first, test-at-bottom.
#[test]
fn scenario_d_while_loop() {
    let top_level = vec![
        Stmt::Assign {
            name: "i".into(),
            declared_type: Some("Int".into()),
            value: num(0),
            ty: String::new(),
            span: Span::default(),
        },
        Stmt::While {
            cond: mcall(var("i"), "LESS", vec![num(10)]),
            body: vec![Stmt::Assign {
                name: "i".into(),
                declared_type: Some("Int".into()),
                value: mcall(var("i"), "PLUS", vec![num(1)]),
                ty: String::new(),
                span: Span::default(),
            }],
            span: Span::default(),
        },
    ];

    let asm = render_main(top_level, builtin_world());
    assert!(asm.contains("jump while_cond_0"));
    assert!(asm.contains("while_block_0:"));
    assert!(asm.contains("while_cond_0:\n    load i\n    const 10\n    roll 1\n    call Int:LESS\n    jump_if while_block_0"));
}

/// E. A field stored with different types on different constructor
/// branches widens to their LCA.
#[test]
fn scenario_e_field_widening_via_lca() {
    let mut world = builtin_world();
    world.insert(
        "C".to_string(),
        ClassEntry { super_name: "Obj".to_string(), ..Default::default() },
    );

    let program = Program {
        classes: vec![ClassDef {
            name: "C".into(),
            super_name: None,
            formal_args: vec![],
            constructor_body: vec![
                Stmt::StoreField {
                    object: var("this"),
                    field: "v".into(),
                    value: num(1),
                    span: Span::default(),
                },
                Stmt::StoreField {
                    object: var("this"),
                    field: "v".into(),
                    value: Expr::LitString { value: "\"x\"".into(), ty: String::new(), span: Span::default() },
                    span: Span::default(),
                },
            ],
            methods: vec![],
            span: Span::default(),
        }],
    };

    let (_classes, world) = compile_program(program, vec![], "Main", world).unwrap();
    assert_eq!(world.require("C").unwrap().fields.get("v").unwrap(), "Obj");
}

/// Constructor calls push their arguments, then emit `new`/`call` with no
/// `roll` in between — unlike method calls, which do `roll` the receiver.
#[test]
fn constructor_call_with_args_emits_no_roll() {
    let mut world = builtin_world();
    world.insert(
        "Point".to_string(),
        ClassEntry { super_name: "Obj".to_string(), ..Default::default() },
    );

    let program = Program {
        classes: vec![ClassDef {
            name: "Point".into(),
            super_name: None,
            formal_args: vec![
                FormalArg { name: "x".into(), type_name: "Int".into() },
                FormalArg { name: "y".into(), type_name: "Int".into() },
            ],
            constructor_body: vec![
                Stmt::StoreField {
                    object: var("this"),
                    field: "x".into(),
                    value: var("x"),
                    span: Span::default(),
                },
                Stmt::StoreField {
                    object: var("this"),
                    field: "y".into(),
                    value: var("y"),
                    span: Span::default(),
                },
            ],
            methods: vec![],
            span: Span::default(),
        }],
    };

    let top_level = vec![Stmt::Assign {
        name: "p".into(),
        declared_type: Some("Point".into()),
        value: Expr::CCall {
            class_name: "Point".into(),
            args: vec![num(1), num(2)],
            ty: String::new(),
            span: Span::default(),
        },
        ty: String::new(),
        span: Span::default(),
    }];

    let (classes, _world) = compile_program(program, top_level, "Main", world).unwrap();
    let asm = emit::render_class(classes.iter().find(|c| c.name == "Main").unwrap()).unwrap();
    assert!(asm.contains("    const 1\n    const 2\n    new Point\n    call Point:$constructor"));
    assert!(!asm.contains("roll"));
}

/// F. Storing a field on only one branch of an `if` (no `else`), then
/// reading it unconditionally afterwards, is a definite-assignment error.
#[test]
fn scenario_f_field_not_defined_on_all_paths() {
    let world = builtin_world();
    let program = Program {
        classes: vec![ClassDef {
            name: "C".into(),
            super_name: None,
            formal_args: vec![],
            constructor_body: vec![
                Stmt::If {
                    cond: Expr::LitTrue { ty: "Bool".into(), span: Span::default() },
                    then_block: vec![Stmt::StoreField {
                        object: var("this"),
                        field: "a".into(),
                        value: num(1),
                        span: Span::default(),
                    }],
                    elifs: vec![],
                    else_block: None,
                    span: Span::default(),
                },
                Stmt::RawExpr {
                    value: Expr::LoadField {
                        object: Box::new(var("this")),
                        field: "a".into(),
                        ty: String::new(),
                        span: Span::default(),
                    },
                    span: Span::default(),
                },
            ],
            methods: vec![],
            span: Span::default(),
        }],
    };

    let err = compile_program(program, vec![], "Main", world).unwrap_err();
    assert_eq!(err.kind, ErrorKind::FieldNotOnAllPaths);
}

/// Constructor emission: every generated class has exactly one
/// `$constructor` method whose body ends in `return 0`.
#[test]
fn every_class_has_exactly_one_constructor_ending_in_return_0() {
    let world = builtin_world();
    let program = Program {
        classes: vec![ClassDef {
            name: "Empty".into(),
            super_name: None,
            formal_args: vec![FormalArg { name: "n".into(), type_name: "Int".into() }],
            constructor_body: vec![],
            methods: vec![Method {
                name: "noop".into(),
                params: vec![],
                ret_type: None,
                body: vec![],
                span: Span::default(),
            }],
            span: Span::default(),
        }],
    };

    let (classes, _world) = compile_program(program, vec![], "Main", world).unwrap();
    let empty = classes.iter().find(|c| c.name == "Empty").unwrap();
    let ctors: Vec<_> = empty.methods.iter().filter(|m| m.name == CONSTRUCTOR_NAME).collect();
    assert_eq!(ctors.len(), 1);
    assert_eq!(ctors[0].code.last().unwrap(), "    return 0");
}
