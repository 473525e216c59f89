use pretty_assertions::assert_eq;

use crate::{
    BranchOp, ClassAccess, Condition, Constant, FieldAccess, Instruction, MethodAccess,
    ProgramBuilder, ProgramError, SimpleOp, ValueKind, VariableOp,
};

#[test]
fn labels_resolve_to_offsets() {
    let mut builder = ProgramBuilder::with_java_lang();
    builder.class("app/Abs", |c| {
        c.method("abs", "(I)I", MethodAccess::STATIC, |code| {
            let positive = code.label();
            code.iload(0).if_(Condition::Ge, positive).iload(0);
            code.simple(SimpleOp::Neg(crate::NumKind::Int)).ireturn();
            code.bind(positive).iload(0).ireturn();
        });
    });
    let program = builder.build().unwrap();
    let m = program.method_by_name("app/Abs", "abs", "(I)I").unwrap();
    let code = program.method(m).code.as_ref().unwrap();

    assert_eq!(
        code.instructions[1],
        Instruction::Branch {
            op: BranchOp::If(Condition::Ge),
            target: 5,
        }
    );
    assert_eq!(code.len(), 7);
}

#[test]
fn max_locals_covers_parameters_and_wide_stores() {
    let mut builder = ProgramBuilder::with_java_lang();
    builder.class("app/Locals", |c| {
        c.method("f", "(JI)V", MethodAccess::empty(), |code| {
            code.lconst(0).lstore(4).return_void();
        });
        c.method("g", "(J)V", MethodAccess::STATIC, |code| {
            code.return_void();
        });
    });
    let program = builder.build().unwrap();

    let f = program.method_by_name("app/Locals", "f", "(JI)V").unwrap();
    assert_eq!(program.method(f).code.as_ref().unwrap().max_locals, 6);
    let g = program.method_by_name("app/Locals", "g", "(J)V").unwrap();
    assert_eq!(program.method(g).code.as_ref().unwrap().max_locals, 2);
}

#[test]
fn constants_are_interned_per_class() {
    let mut builder = ProgramBuilder::with_java_lang();
    builder.class("app/Strings", |c| {
        c.method("twice", "()V", MethodAccess::STATIC, |code| {
            code.ldc_string("x").pop().ldc_string("x").pop().return_void();
        });
    });
    let program = builder.build().unwrap();
    let m = program.method_by_name("app/Strings", "twice", "()V").unwrap();
    let code = program.method(m).code.as_ref().unwrap();

    let first = code.instructions[0].constant_operand().unwrap().1;
    let second = code.instructions[2].constant_operand().unwrap().1;
    assert_eq!(first, second);
    let class = program.class(program.method(m).class);
    assert_eq!(
        class.constant_pool.get(first),
        Some(&Constant::String("x".to_owned()))
    );
}

#[test]
fn exception_handlers_are_recorded_with_catch_type() {
    let mut builder = ProgramBuilder::with_java_lang();
    builder.class("app/Guard", |c| {
        c.method("run", "()V", MethodAccess::STATIC, |code| {
            let (start, end, handler, done) = (code.label(), code.label(), code.label(), code.label());
            code.bind(start)
                .invokestatic("app/Guard", "work", "()V")
                .bind(end)
                .goto(done);
            code.bind(handler).astore(0);
            code.bind(done).return_void();
            code.try_catch(start, end, handler, Some("java/lang/RuntimeException"));
        });
        c.method("work", "()V", MethodAccess::STATIC, |code| {
            code.return_void();
        });
    });
    let program = builder.build().unwrap();
    let m = program.method_by_name("app/Guard", "run", "()V").unwrap();
    let code = program.method(m).code.as_ref().unwrap();
    let class = program.class(program.method(m).class);

    let entry = code.exception_table[0];
    assert_eq!((entry.start, entry.end, entry.handler), (0, 1, 2));
    let catch = entry.catch_type.unwrap();
    assert_eq!(
        class.constant_pool.class_name(catch),
        Some("java/lang/RuntimeException")
    );
    assert_eq!(code.max_locals, 1);
    assert_eq!(
        code.instructions[2],
        Instruction::Variable {
            op: VariableOp::Store(ValueKind::Reference),
            slot: 0,
        }
    );
}

#[test]
fn unbound_label_is_an_error() {
    let mut builder = ProgramBuilder::new();
    builder.class("app/Broken", |c| {
        c.method("f", "()V", MethodAccess::STATIC, |code| {
            let nowhere = code.label();
            code.goto(nowhere);
        });
    });
    assert!(matches!(
        builder.build(),
        Err(ProgramError::UnboundLabel { .. })
    ));
}

#[test]
fn label_bound_past_the_end_is_out_of_range() {
    let mut builder = ProgramBuilder::new();
    builder.class("app/Broken", |c| {
        c.method("f", "()V", MethodAccess::STATIC, |code| {
            let end = code.label();
            code.goto(end).bind(end);
        });
    });
    assert!(matches!(
        builder.build(),
        Err(ProgramError::OffsetOutOfRange { offset: 1, len: 1, .. })
    ));
}

#[test]
fn duplicate_classes_and_members_are_rejected() {
    let mut builder = ProgramBuilder::new();
    builder.class("app/A", |_| {});
    builder.class("app/A", |_| {});
    assert_eq!(
        builder.build().err(),
        Some(ProgramError::DuplicateClass("app/A".to_owned()))
    );

    let mut builder = ProgramBuilder::new();
    builder.class("app/B", |c| {
        c.field("x", "I", FieldAccess::empty())
            .field("x", "I", FieldAccess::PRIVATE);
    });
    assert!(matches!(
        builder.build(),
        Err(ProgramError::DuplicateMember { .. })
    ));
}

#[test]
fn bodies_are_rejected_where_none_may_exist() {
    let mut builder = ProgramBuilder::new();
    builder.library_class("lib/L", |c| {
        c.method("f", "()V", MethodAccess::STATIC, |code| {
            code.return_void();
        });
    });
    assert!(matches!(builder.build(), Err(ProgramError::InvalidBody { .. })));

    let mut builder = ProgramBuilder::new();
    builder.class("app/Abstract", |c| {
        c.access(ClassAccess::PUBLIC | ClassAccess::ABSTRACT)
            .method("f", "()V", MethodAccess::ABSTRACT, |code| {
                code.return_void();
            });
    });
    assert!(matches!(builder.build(), Err(ProgramError::InvalidBody { .. })));
}

#[test]
fn malformed_descriptor_is_reported() {
    let mut builder = ProgramBuilder::new();
    builder.class("app/Bad", |c| {
        c.declare_method("f", "(Q)V", MethodAccess::empty());
    });
    assert!(matches!(
        builder.build(),
        Err(ProgramError::MalformedDescriptor { .. })
    ));
}

#[test]
fn classes_default_to_extending_object() {
    let mut builder = ProgramBuilder::with_java_lang();
    builder.class("app/Plain", |_| {});
    let program = builder.build().unwrap();

    let plain = program.class_by_name("app/Plain").unwrap();
    assert_eq!(
        program.class(plain).super_name.as_deref(),
        Some("java/lang/Object")
    );
    let object = program.class_by_name("java/lang/Object").unwrap();
    assert_eq!(program.class(object).super_name, None);
    assert!(!program.class(object).is_program());
}

#[test]
fn constant_field_stores_its_value_in_the_pool() {
    let mut builder = ProgramBuilder::new();
    builder.class("app/K", |c| {
        c.constant_field(
            "LIMIT",
            "I",
            FieldAccess::STATIC | FieldAccess::FINAL,
            Constant::Integer(10),
        );
    });
    let program = builder.build().unwrap();
    let f = program.field_by_name("app/K", "LIMIT", "I").unwrap();
    let field = program.field(f);
    let pool = &program.class(field.class).constant_pool;
    assert_eq!(
        field.constant_value.and_then(|i| pool.get(i)),
        Some(&Constant::Integer(10))
    );
}
