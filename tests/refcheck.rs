// tests/refcheck.rs
//! End-to-end checks through the public API: build a small symbol table
//! and annotated tree, run the pass, inspect diagnostics and rewrites.

use stoat_refcheck::check_unit;
use stoat_refcheck::errors::CheckError;
use stoat_refcheck::symtab::{Definitions, Flags, SymbolId, SymbolKind, Variance};
use stoat_refcheck::tree::{BinOp, CompilationUnit, Lit, Span, Tree};
use stoat_refcheck::types::Type;

fn class(defs: &mut Definitions, name: &str, parents: Vec<Type>, flags: Flags) -> SymbolId {
    let c = defs.new_symbol(SymbolKind::Class, None, name, flags);
    defs.set_class_info(c, parents, vec![]);
    c
}

fn method(defs: &mut Definitions, owner: SymbolId, name: &str, ty: Type, flags: Flags) -> SymbolId {
    let m = defs.new_symbol(SymbolKind::Method, Some(owner), name, flags);
    defs.set_type(m, ty);
    defs.enter_decl(owner, m);
    m
}

fn class_def(sym: SymbolId, body: Vec<Tree>) -> Tree {
    Tree::ClassDef {
        sym,
        body,
        span: Span::default(),
    }
}

fn run(defs: &mut Definitions, body: Vec<Tree>) -> (Vec<CheckError>, CompilationUnit) {
    let mut unit = CompilationUnit::new(body);
    let errors = check_unit(defs, &mut unit);
    (errors, unit)
}

#[test]
fn concrete_override_without_modifier_is_the_only_diagnostic() {
    let mut defs = Definitions::new();
    let int = class(&mut defs, "Int", vec![], Flags::empty());
    let a = class(&mut defs, "A", vec![], Flags::empty());
    let af = method(
        &mut defs,
        a,
        "f",
        Type::method(vec![], Type::named(int)),
        Flags::empty(),
    );
    let b = class(&mut defs, "B", vec![Type::named(a)], Flags::empty());
    let bf = method(
        &mut defs,
        b,
        "f",
        Type::method(vec![], Type::named(int)),
        Flags::empty(),
    );

    let lit = Tree::Literal {
        value: Lit::Int(1),
        span: Span::default(),
    };
    let (errors, _) = run(
        &mut defs,
        vec![
            class_def(
                a,
                vec![Tree::DefDef {
                    sym: af,
                    rhs: Some(Box::new(lit.clone())),
                    span: Span::default(),
                }],
            ),
            class_def(
                b,
                vec![Tree::DefDef {
                    sym: bf,
                    rhs: Some(Box::new(lit)),
                    span: Span::default(),
                }],
            ),
        ],
    );
    assert_eq!(errors.len(), 1, "got {errors:?}");
    assert!(matches!(
        errors[0],
        CheckError::MissingOverrideModifier { .. }
    ));
}

#[test]
fn conflicting_ancestor_instantiations_are_illegal_inheritance() {
    let mut defs = Definitions::new();
    let int = class(&mut defs, "Int", vec![], Flags::empty());
    let bool_ = class(&mut defs, "Bool", vec![], Flags::empty());
    let seq = defs.new_symbol(SymbolKind::Class, None, "Seq", Flags::TRAIT);
    let t = defs.new_symbol(SymbolKind::TypeParam, Some(seq), "T", Flags::empty());
    defs.set_type_params(seq, [t]);
    defs.set_class_info(seq, vec![], vec![]);

    let a = class(
        &mut defs,
        "A",
        vec![Type::app(seq, vec![Type::named(int)])],
        Flags::empty(),
    );
    let bad = class(
        &mut defs,
        "Bad",
        vec![Type::named(a), Type::app(seq, vec![Type::named(bool_)])],
        Flags::empty(),
    );
    let good = class(
        &mut defs,
        "Good",
        vec![Type::named(a), Type::app(seq, vec![Type::named(int)])],
        Flags::empty(),
    );

    let (errors, _) = run(&mut defs, vec![class_def(bad, vec![])]);
    assert_eq!(errors.len(), 1, "got {errors:?}");
    assert!(matches!(errors[0], CheckError::IllegalInheritance { .. }));

    let (errors, _) = run(&mut defs, vec![class_def(good, vec![])]);
    assert!(errors.is_empty(), "got {errors:?}");
}

#[test]
fn two_distinct_case_ancestors_are_rejected_one_shared_is_not() {
    let mut defs = Definitions::new();
    let p = class(&mut defs, "P", vec![], Flags::CASE);
    let q = class(&mut defs, "Q", vec![], Flags::CASE);
    let bad = class(
        &mut defs,
        "Bad",
        vec![Type::named(p), Type::named(q)],
        Flags::empty(),
    );

    let m = class(&mut defs, "M", vec![Type::named(p)], Flags::TRAIT);
    let n = class(&mut defs, "N", vec![Type::named(p)], Flags::TRAIT);
    let good = class(
        &mut defs,
        "Good",
        vec![Type::named(m), Type::named(n)],
        Flags::empty(),
    );

    let (errors, _) = run(&mut defs, vec![class_def(bad, vec![])]);
    assert_eq!(errors.len(), 1, "got {errors:?}");
    assert!(matches!(errors[0], CheckError::CaseClassCombination { .. }));

    let (errors, _) = run(&mut defs, vec![class_def(good, vec![])]);
    assert!(errors.is_empty(), "got {errors:?}");
}

#[test]
fn covariant_parameter_in_parameter_position_is_flagged() {
    let mut defs = Definitions::new();
    let source = defs.new_symbol(SymbolKind::Class, None, "Source", Flags::ABSTRACT);
    let t = defs.new_symbol(SymbolKind::TypeParam, Some(source), "T", Flags::empty());
    defs.set_variance(t, Variance::Covariant);
    defs.set_type_params(source, [t]);
    defs.set_class_info(source, vec![], vec![]);

    let put = method(
        &mut defs,
        source,
        "put",
        Type::method(vec![Type::named(t)], Type::named(source)),
        Flags::DEFERRED,
    );
    let get = method(
        &mut defs,
        source,
        "get",
        Type::method(vec![], Type::named(t)),
        Flags::DEFERRED,
    );

    let def = |sym| Tree::DefDef {
        sym,
        rhs: None,
        span: Span::default(),
    };
    let (errors, _) = run(&mut defs, vec![class_def(source, vec![def(put), def(get)])]);
    assert_eq!(errors.len(), 1, "got {errors:?}");
    match &errors[0] {
        CheckError::VarianceViolation {
            declared,
            occurring,
            param,
            ..
        } => {
            assert_eq!(declared, "covariant");
            assert_eq!(occurring, "contravariant");
            assert_eq!(param, "T");
        }
        other => panic!("expected variance violation, got {other:?}"),
    }
}

#[test]
fn value_used_before_its_definition_is_a_forward_reference() {
    let mut defs = Definitions::new();
    let int = class(&mut defs, "Int", vec![], Flags::empty());
    let y = defs.new_symbol(SymbolKind::Value, None, "y", Flags::LOCAL);
    defs.set_type(y, Type::named(int));
    let x = defs.new_symbol(SymbolKind::Value, None, "x", Flags::LOCAL);
    defs.set_type(x, Type::named(int));

    let block = Tree::Block {
        stats: vec![
            Tree::ValDef {
                sym: y,
                rhs: Some(Box::new(Tree::Ident {
                    sym: x,
                    tpe: Type::named(int),
                    span: Span::new(10, 11),
                })),
                span: Span::new(0, 11),
            },
            Tree::ValDef {
                sym: x,
                rhs: Some(Box::new(Tree::Literal {
                    value: Lit::Int(1),
                    span: Span::new(20, 21),
                })),
                span: Span::new(12, 21),
            },
        ],
        span: Span::new(0, 21),
    };
    let (errors, _) = run(&mut defs, vec![block]);
    assert_eq!(errors.len(), 1, "got {errors:?}");
    match &errors[0] {
        CheckError::ForwardReference { definition, span } => {
            assert!(definition.contains("value y"), "got {definition}");
            // Reported at the offending reference, not the definition.
            assert_eq!(span.offset(), 10);
        }
        other => panic!("expected forward reference, got {other:?}"),
    }
}

#[test]
fn reference_after_definition_is_not_flagged() {
    let mut defs = Definitions::new();
    let int = class(&mut defs, "Int", vec![], Flags::empty());
    let x = defs.new_symbol(SymbolKind::Value, None, "x", Flags::LOCAL);
    defs.set_type(x, Type::named(int));
    let y = defs.new_symbol(SymbolKind::Value, None, "y", Flags::LOCAL);
    defs.set_type(y, Type::named(int));

    let block = Tree::Block {
        stats: vec![
            Tree::ValDef {
                sym: x,
                rhs: Some(Box::new(Tree::Literal {
                    value: Lit::Int(1),
                    span: Span::default(),
                })),
                span: Span::default(),
            },
            Tree::ValDef {
                sym: y,
                rhs: Some(Box::new(Tree::Ident {
                    sym: x,
                    tpe: Type::named(int),
                    span: Span::default(),
                })),
                span: Span::default(),
            },
        ],
        span: Span::default(),
    };
    let (errors, _) = run(&mut defs, vec![block]);
    assert!(errors.is_empty(), "got {errors:?}");
}

#[test]
fn early_reference_to_a_method_is_not_a_forward_reference() {
    let mut defs = Definitions::new();
    let int = class(&mut defs, "Int", vec![], Flags::empty());
    let m = defs.new_symbol(SymbolKind::Method, None, "m", Flags::LOCAL);
    let m_ty = Type::method(vec![], Type::named(int));
    defs.set_type(m, m_ty.clone());
    let x = defs.new_symbol(SymbolKind::Value, None, "x", Flags::LOCAL);
    defs.set_type(x, Type::named(int));

    let lit = Tree::Literal {
        value: Lit::Int(1),
        span: Span::default(),
    };
    // The method is referenced before its definition; no value
    // definition is crossed, so nothing is flagged.
    let block = Tree::Block {
        stats: vec![
            Tree::Ident {
                sym: m,
                tpe: m_ty,
                span: Span::default(),
            },
            Tree::DefDef {
                sym: m,
                rhs: Some(Box::new(lit.clone())),
                span: Span::default(),
            },
            Tree::ValDef {
                sym: x,
                rhs: Some(Box::new(lit)),
                span: Span::default(),
            },
        ],
        span: Span::default(),
    };
    let (errors, _) = run(&mut defs, vec![block]);
    assert!(errors.is_empty(), "got {errors:?}");
}

#[test]
fn stacked_trait_override_is_accepted() {
    let mut defs = Definitions::new();
    let int = class(&mut defs, "Int", vec![], Flags::empty());
    let base = class(&mut defs, "Base", vec![], Flags::TRAIT);
    let _base_f = method(
        &mut defs,
        base,
        "f",
        Type::method(vec![], Type::named(int)),
        Flags::DEFERRED,
    );
    let concrete = class(&mut defs, "Concrete", vec![Type::named(base)], Flags::empty());
    let _concrete_f = method(
        &mut defs,
        concrete,
        "f",
        Type::method(vec![], Type::named(int)),
        Flags::empty(),
    );
    let mixin = class(&mut defs, "Mixin", vec![Type::named(base)], Flags::TRAIT);
    let _mixin_f = method(
        &mut defs,
        mixin,
        "f",
        Type::method(vec![], Type::named(int)),
        Flags::ABSTRACT_OVERRIDE,
    );
    let d = class(
        &mut defs,
        "D",
        vec![Type::named(concrete), Type::named(mixin)],
        Flags::empty(),
    );

    let (errors, _) = run(&mut defs, vec![class_def(d, vec![])]);
    assert!(errors.is_empty(), "got {errors:?}");
}

#[test]
fn nonstatic_singleton_expands_into_three_siblings() {
    let mut defs = Definitions::new();
    let outer = class(&mut defs, "Outer", vec![], Flags::empty());
    let mclass = defs.new_symbol(SymbolKind::Class, Some(outer), "Registry", Flags::MODULE);
    defs.set_class_info(mclass, vec![], vec![]);
    let module = defs.new_symbol(SymbolKind::Value, Some(outer), "Registry", Flags::MODULE);
    defs.set_module_class(module, mclass);
    defs.enter_decl(outer, module);

    let (errors, unit) = run(
        &mut defs,
        vec![class_def(
            outer,
            vec![Tree::ModuleDef {
                sym: module,
                body: vec![],
                span: Span::default(),
            }],
        )],
    );
    assert!(errors.is_empty(), "got {errors:?}");

    let Tree::ClassDef { body, .. } = &unit.body[0] else {
        panic!("expected outer class");
    };
    assert_eq!(body.len(), 3, "got {body:?}");
    let Tree::ClassDef { sym, .. } = &body[0] else {
        panic!("expected backing class first");
    };
    assert_eq!(*sym, mclass);
    let Tree::ValDef { sym: var, rhs, .. } = &body[1] else {
        panic!("expected backing variable second");
    };
    assert_eq!(defs.name_str(*var), "Registry$module");
    assert!(matches!(
        rhs.as_deref(),
        Some(Tree::Literal {
            value: Lit::Null,
            ..
        })
    ));
    let Tree::DefDef { sym: acc, rhs, .. } = &body[2] else {
        panic!("expected accessor third");
    };
    assert_eq!(*acc, module);
    // Accessor body: lazily assign once behind a null test, then read.
    let Some(Tree::Block { stats, .. }) = rhs.as_deref() else {
        panic!("expected accessor block");
    };
    assert_eq!(stats.len(), 2);
    let Tree::If { cond, then_branch, .. } = &stats[0] else {
        panic!("expected lazy-init test");
    };
    assert!(matches!(
        cond.as_ref(),
        Tree::Binary {
            op: BinOp::EqEq,
            ..
        }
    ));
    let Tree::Assign { rhs: init, .. } = then_branch.as_ref() else {
        panic!("expected assignment on first access");
    };
    assert!(matches!(init.as_ref(), Tree::Apply { .. }));
    assert!(matches!(&stats[1], Tree::Ident { sym, .. } if sym == var));
}

#[test]
fn case_factory_application_becomes_a_constructor_call() {
    let mut defs = Definitions::new();
    let int = class(&mut defs, "Int", vec![], Flags::empty());
    let point = class(&mut defs, "Point", vec![], Flags::CASE);
    let factory = defs.new_symbol(
        SymbolKind::Method,
        None,
        "Point",
        Flags::CASE | Flags::SYNTHETIC,
    );
    let factory_ty = Type::method(
        vec![Type::named(int), Type::named(int)],
        Type::named(point),
    );
    defs.set_type(factory, factory_ty.clone());

    let arg = |v| Tree::Literal {
        value: Lit::Int(v),
        span: Span::default(),
    };
    let call = Tree::Apply {
        fun: Box::new(Tree::Ident {
            sym: factory,
            tpe: factory_ty,
            span: Span::default(),
        }),
        args: vec![arg(1), arg(2)],
        tpe: Type::named(point),
        span: Span::default(),
    };
    let (errors, unit) = run(&mut defs, vec![call]);
    assert!(errors.is_empty(), "got {errors:?}");

    let Tree::Apply { fun, args, .. } = &unit.body[0] else {
        panic!("expected application");
    };
    assert!(
        matches!(fun.as_ref(), Tree::New { tpe, .. } if *tpe == Type::named(point)),
        "got {fun:?}"
    );
    assert_eq!(args.len(), 2);
}

#[test]
fn unqualified_trait_super_goes_through_an_accessor() {
    let mut defs = Definitions::new();
    let int = class(&mut defs, "Int", vec![], Flags::empty());
    let base = class(&mut defs, "Base", vec![], Flags::TRAIT);
    let base_f = method(
        &mut defs,
        base,
        "f",
        Type::method(vec![], Type::named(int)),
        Flags::empty(),
    );
    let tr = class(&mut defs, "Mixin", vec![Type::named(base)], Flags::TRAIT);
    let g = method(
        &mut defs,
        tr,
        "g",
        Type::method(vec![], Type::named(int)),
        Flags::empty(),
    );

    let super_call = Tree::Select {
        qual: Box::new(Tree::Super {
            this_sym: tr,
            mix: None,
            span: Span::default(),
        }),
        sym: base_f,
        tpe: Type::method(vec![], Type::named(int)),
        span: Span::default(),
    };
    let (errors, unit) = run(
        &mut defs,
        vec![class_def(
            tr,
            vec![Tree::DefDef {
                sym: g,
                rhs: Some(Box::new(super_call)),
                span: Span::default(),
            }],
        )],
    );
    assert!(errors.is_empty(), "got {errors:?}");

    let Tree::ClassDef { body, .. } = &unit.body[0] else {
        panic!("expected trait");
    };
    let Tree::DefDef { rhs: Some(rhs), .. } = &body[0] else {
        panic!("expected method");
    };
    let Tree::Select { qual, sym, .. } = rhs.as_ref() else {
        panic!("expected selection, got {rhs:?}");
    };
    assert!(matches!(qual.as_ref(), Tree::This { .. }));
    assert_eq!(defs.name_str(*sym), "super$f");
    assert!(defs.flags(*sym).contains(Flags::SYNTHETIC | Flags::FINAL));
}

#[test]
fn super_access_to_abstract_member_is_an_error() {
    let mut defs = Definitions::new();
    let int = class(&mut defs, "Int", vec![], Flags::empty());
    let base = class(&mut defs, "Base", vec![], Flags::ABSTRACT);
    let base_f = method(
        &mut defs,
        base,
        "f",
        Type::method(vec![], Type::named(int)),
        Flags::DEFERRED,
    );
    let sub = class(&mut defs, "Sub", vec![Type::named(base)], Flags::ABSTRACT);
    let g = method(
        &mut defs,
        sub,
        "g",
        Type::method(vec![], Type::named(int)),
        Flags::empty(),
    );

    let super_call = Tree::Select {
        qual: Box::new(Tree::Super {
            this_sym: sub,
            mix: None,
            span: Span::default(),
        }),
        sym: base_f,
        tpe: Type::method(vec![], Type::named(int)),
        span: Span::default(),
    };
    let (errors, _) = run(
        &mut defs,
        vec![class_def(
            sub,
            vec![Tree::DefDef {
                sym: g,
                rhs: Some(Box::new(super_call)),
                span: Span::default(),
            }],
        )],
    );
    assert_eq!(errors.len(), 1, "got {errors:?}");
    assert!(matches!(errors[0], CheckError::AbstractSuperAccess { .. }));
}

#[test]
fn incomplete_abstract_override_may_access_abstract_super() {
    let mut defs = Definitions::new();
    let int = class(&mut defs, "Int", vec![], Flags::empty());
    let base = class(&mut defs, "Base", vec![], Flags::TRAIT);
    let base_f = method(
        &mut defs,
        base,
        "f",
        Type::method(vec![], Type::named(int)),
        Flags::DEFERRED,
    );
    let mixin = class(&mut defs, "Mixin", vec![Type::named(base)], Flags::TRAIT);
    let mixin_f = method(
        &mut defs,
        mixin,
        "f",
        Type::method(vec![], Type::named(int)),
        Flags::ABSTRACT_OVERRIDE,
    );

    let super_call = Tree::Select {
        qual: Box::new(Tree::Super {
            this_sym: mixin,
            mix: None,
            span: Span::default(),
        }),
        sym: base_f,
        tpe: Type::method(vec![], Type::named(int)),
        span: Span::default(),
    };
    let (errors, unit) = run(
        &mut defs,
        vec![class_def(
            mixin,
            vec![Tree::DefDef {
                sym: mixin_f,
                rhs: Some(Box::new(super_call)),
                span: Span::default(),
            }],
        )],
    );
    assert!(errors.is_empty(), "got {errors:?}");

    // The access is tolerated and still goes through the trait accessor.
    let Tree::ClassDef { body, .. } = &unit.body[0] else {
        panic!("expected trait");
    };
    let Tree::DefDef { rhs: Some(rhs), .. } = &body[0] else {
        panic!("expected method");
    };
    let Tree::Select { sym, .. } = rhs.as_ref() else {
        panic!("expected selection, got {rhs:?}");
    };
    assert_eq!(defs.name_str(*sym), "super$f");
}

#[test]
fn completed_abstract_override_chain_rejects_abstract_super() {
    let mut defs = Definitions::new();
    let int = class(&mut defs, "Int", vec![], Flags::empty());
    let base = class(&mut defs, "Base", vec![], Flags::TRAIT);
    let base_f = method(
        &mut defs,
        base,
        "f",
        Type::method(vec![], Type::named(int)),
        Flags::DEFERRED,
    );
    let cbase = class(&mut defs, "CBase", vec![Type::named(base)], Flags::empty());
    let _cbase_f = method(
        &mut defs,
        cbase,
        "f",
        Type::method(vec![], Type::named(int)),
        Flags::OVERRIDE,
    );
    let mixin = class(&mut defs, "Mixin", vec![Type::named(cbase)], Flags::TRAIT);
    let mixin_f = method(
        &mut defs,
        mixin,
        "f",
        Type::method(vec![], Type::named(int)),
        Flags::ABSTRACT_OVERRIDE,
    );

    let super_call = Tree::Select {
        qual: Box::new(Tree::Super {
            this_sym: mixin,
            mix: None,
            span: Span::default(),
        }),
        sym: base_f,
        tpe: Type::method(vec![], Type::named(int)),
        span: Span::default(),
    };
    let (errors, _) = run(
        &mut defs,
        vec![class_def(
            mixin,
            vec![Tree::DefDef {
                sym: mixin_f,
                rhs: Some(Box::new(super_call)),
                span: Span::default(),
            }],
        )],
    );
    assert_eq!(errors.len(), 1, "got {errors:?}");
    assert!(matches!(errors[0], CheckError::AbstractSuperAccess { .. }));
}

#[test]
fn parameter_accessor_alias_redirects_through_super() {
    let mut defs = Definitions::new();
    let int = class(&mut defs, "Int", vec![], Flags::empty());
    let parent = class(&mut defs, "Parent", vec![], Flags::empty());
    let inherited = method(
        &mut defs,
        parent,
        "size",
        Type::method(vec![], Type::named(int)),
        Flags::PARAM_ACCESSOR,
    );
    let child = class(&mut defs, "Child", vec![Type::named(parent)], Flags::empty());
    let own = method(
        &mut defs,
        child,
        "size",
        Type::method(vec![], Type::named(int)),
        Flags::PARAM_ACCESSOR | Flags::OVERRIDE,
    );
    defs.set_alias(own, inherited);

    let read = Tree::Select {
        qual: Box::new(Tree::This {
            sym: child,
            span: Span::default(),
        }),
        sym: own,
        tpe: Type::named(int),
        span: Span::default(),
    };
    let (errors, unit) = run(&mut defs, vec![read]);
    assert!(errors.is_empty(), "got {errors:?}");

    let Tree::Select { qual, sym, tpe, .. } = &unit.body[0] else {
        panic!("expected selection");
    };
    assert_eq!(*sym, inherited);
    assert_eq!(*tpe, Type::named(int));
    let Tree::Super { this_sym, mix, .. } = qual.as_ref() else {
        panic!("expected super qualifier, got {qual:?}");
    };
    assert_eq!(*this_sym, child);
    assert_eq!(*mix, Some(defs.name_of(parent)));
}

#[test]
fn type_arguments_are_checked_against_declared_bounds() {
    let mut defs = Definitions::new();
    let animal = class(&mut defs, "Animal", vec![], Flags::empty());
    let dog = class(&mut defs, "Dog", vec![Type::named(animal)], Flags::empty());
    let int = class(&mut defs, "Int", vec![], Flags::empty());

    let f = defs.new_symbol(SymbolKind::Method, None, "walk", Flags::empty());
    let t = defs.new_symbol(SymbolKind::TypeParam, Some(f), "T", Flags::empty());
    defs.set_type(t, Type::bounds(Type::NoType, Type::named(animal)));
    defs.set_type_params(f, [t]);
    let f_ty = Type::poly(vec![t], Type::method(vec![Type::named(t)], Type::named(t)));
    defs.set_type(f, f_ty.clone());

    let apply_to = |arg: Type| Tree::TypeApply {
        fun: Box::new(Tree::Ident {
            sym: f,
            tpe: f_ty.clone(),
            span: Span::default(),
        }),
        args: vec![arg],
        tpe: Type::method(vec![], Type::named(dog)),
        span: Span::default(),
    };

    let bad = apply_to(Type::named(int));
    let good = apply_to(Type::named(dog));

    let (errors, _) = run(&mut defs, vec![bad]);
    assert_eq!(errors.len(), 1, "got {errors:?}");
    assert!(matches!(errors[0], CheckError::TypeArgumentBounds { .. }));

    let (errors, _) = run(&mut defs, vec![good]);
    assert!(errors.is_empty(), "got {errors:?}");
}
