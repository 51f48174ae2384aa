//! SSA construction and optimization integration tests.
//!
//! These tests build programs through the public builder API and check the
//! structural properties the rest of the compiler relies on:
//! 1. Phi placement at if exits and loop heads
//! 2. Use lists matching the references after every pass
//! 3. Copy propagation and dead code elimination results
//! 4. Deterministic type propagation

use filterc::{
    analysis::propagate_types,
    builder::SsaBuilder,
    compiler::{
        ColorFusionPass, CopyPropagationPass, DeadCodeEliminationPass, EventKind, EventLog,
        SsaPass,
    },
    ir::{
        CompVarId, InternalTable, ListLoc, Operator, Primary, Program, Rhs, StmtId, StmtKind,
        ValueId, ValueType,
    },
    Result,
};

fn builder() -> SsaBuilder {
    SsaBuilder::new(Program::new(InternalTable::standard()))
}

/// Outputs `value` as a gray color.
fn output_gray(b: &mut SsaBuilder, value: ValueId) {
    let color = b.make_temporary();
    let v = Primary::Value(value);
    let packed = b.emit_assign(
        color,
        Rhs::op(Operator::MakeColor, vec![v, v, v, Primary::Float(1.0)]),
    );
    let out = b.make_temporary();
    b.emit_assign(out, Rhs::op(Operator::OutputColor, vec![packed.into()]));
}

fn read_internal(b: &mut SsaBuilder, name: &str) -> ValueId {
    let id = b.program().internals().lookup(name).unwrap();
    let t = b.make_temporary();
    b.emit_assign(t, Rhs::Internal(id))
}

fn statements_of(program: &Program, pred: impl Fn(&StmtKind) -> bool) -> Vec<StmtId> {
    program
        .preorder()
        .into_iter()
        .filter(|&s| pred(program.stmt(s).kind()))
        .collect()
}

fn phi_slots(program: &Program, phi: StmtId) -> (ValueId, [Rhs; 2]) {
    match program.stmt(phi).kind() {
        StmtKind::Phi { lhs, rhs, .. } => (*lhs, rhs.clone()),
        other => panic!("expected a phi, got {other:?}"),
    }
}

fn phis_of(program: &Program, loc: ListLoc, slot: CompVarId) -> Vec<StmtId> {
    program
        .list(loc)
        .iter()
        .copied()
        .filter(|&s| {
            program
                .stmt(s)
                .lhs()
                .is_some_and(|v| program.value(v).compvar() == slot)
        })
        .collect()
}

/// `if (0 < x) y = x else y = -x`, output y
fn abs_program() -> (Program, CompVarId, ValueId, ValueId) {
    let mut b = builder();
    let x = read_internal(&mut b, "x");
    let cond = b.make_temporary();
    let c = b.emit_assign(cond, Rhs::op(Operator::Less, vec![Primary::Int(0), x.into()]));

    let y = b.make_variable("y", 0);
    b.start_if(Rhs::value(c)).unwrap();
    let positive = b.emit_assign(y, Rhs::value(x));
    b.switch_branch();
    let negated = b.emit_assign(y, Rhs::op(Operator::Neg, vec![x.into()]));
    b.end_if();

    let merged = b.current(y);
    output_gray(&mut b, merged);
    (b.finish(), y, positive, negated)
}

#[test]
fn test_if_else_merges_through_one_phi() -> Result<()> {
    let (mut program, y, positive, negated) = abs_program();
    program.verify_ssa()?;
    program.verify_uses()?;

    let ifs = statements_of(&program, |k| matches!(k, StmtKind::If { .. }));
    assert_eq!(ifs.len(), 1);
    let construct = ifs[0];

    let consequent = program.list(ListLoc::Consequent(construct));
    let alternative = program.list(ListLoc::Alternative(construct));
    assert_eq!(program.stmt(consequent[0]).lhs(), Some(positive));
    assert_eq!(program.stmt(alternative[0]).lhs(), Some(negated));
    assert!(matches!(
        program.stmt(alternative[0]).kind(),
        StmtKind::Assign { rhs: Rhs::Op { op: Operator::Neg, .. }, .. }
    ));

    let phis = phis_of(&program, ListLoc::Exit(construct), y);
    assert_eq!(phis.len(), 1);
    let (merged, slots) = phi_slots(&program, phis[0]);
    assert_eq!(slots, [Rhs::value(positive), Rhs::value(negated)]);
    assert_eq!(program.current(y), merged);

    // both branches feed the phi, so nothing is dead
    let mut events = EventLog::new();
    assert!(!DeadCodeEliminationPass::new().run(&mut program, &mut events));
    assert!(!events.has(EventKind::StatementRemoved));
    Ok(())
}

#[test]
fn test_loop_head_phi_wiring() -> Result<()> {
    let mut b = builder();
    let i = b.make_variable("i", 0);
    let before = b.emit_assign(i, Rhs::Primary(Primary::Int(0)));
    let cond = b.make_temporary();
    let first_test = b.emit_assign(cond, Rhs::op(Operator::Less, vec![before.into(), Primary::Int(10)]));

    let construct = b.start_while(cond)?;
    let read = b.current(i);
    let incremented = b.emit_assign(i, Rhs::op(Operator::Add, vec![read.into(), Primary::Int(1)]));
    b.emit_assign(cond, Rhs::op(Operator::Less, vec![incremented.into(), Primary::Int(10)]));
    b.end_while();
    let after = b.current(i);
    output_gray(&mut b, after);
    let program = b.finish();
    program.verify_ssa()?;
    program.verify_uses()?;

    let phis = phis_of(&program, ListLoc::Entry(construct), i);
    assert_eq!(phis.len(), 1);
    let (carried, slots) = phi_slots(&program, phis[0]);
    assert_eq!(slots, [Rhs::value(before), Rhs::value(incremented)]);
    assert_eq!(after, carried);

    // the body's read of i observes the loop-carried value
    let body = program.list(ListLoc::Body(construct));
    assert_eq!(
        *program.stmt(body[0]).kind(),
        StmtKind::Assign {
            lhs: incremented,
            rhs: Rhs::op(Operator::Add, vec![carried.into(), Primary::Int(1)]),
        }
    );

    // the condition reads the merged condition, not the one computed before the loop
    let cond_phis = phis_of(&program, ListLoc::Entry(construct), cond);
    assert_eq!(cond_phis.len(), 1);
    let (cond_carried, cond_slots) = phi_slots(&program, cond_phis[0]);
    assert_eq!(cond_slots[0], Rhs::value(first_test));
    match program.stmt(construct).kind() {
        StmtKind::While { invariant, .. } => assert_eq!(*invariant, Rhs::value(cond_carried)),
        other => panic!("expected a loop, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_copy_propagation_round_trip() -> Result<()> {
    // a = b; c = a + 1
    let mut b = builder();
    let source = read_internal(&mut b, "t");
    let a = b.make_variable("a", 0);
    let av = b.emit_assign(a, Rhs::value(source));
    let c = b.make_variable("c", 0);
    let cv = b.emit_assign(c, Rhs::op(Operator::Add, vec![av.into(), Primary::Int(1)]));
    output_gray(&mut b, cv);
    let mut program = b.finish();

    let mut events = EventLog::new();
    assert!(CopyPropagationPass::new().run(&mut program, &mut events));

    let def = program.value(cv).def().unwrap();
    assert_eq!(
        *program.stmt(def).kind(),
        StmtKind::Assign {
            lhs: cv,
            rhs: Rhs::op(Operator::Add, vec![source.into(), Primary::Int(1)]),
        }
    );
    assert!(program.value(av).uses().is_empty());
    program.verify_uses()?;

    assert!(DeadCodeEliminationPass::new().run(&mut program, &mut events));
    assert!(program.stmt(program.value(av).def().unwrap()).is_nop());
    program.verify_ssa()?;
    Ok(())
}

#[test]
fn test_dead_code_elimination_is_idempotent() -> Result<()> {
    let mut b = builder();
    let x = read_internal(&mut b, "x");
    // three dead values in a chain, one dead phi
    let s = b.make_variable("s", 0);
    let sv = b.emit_assign(s, Rhs::op(Operator::Sin, vec![x.into()]));
    let t = b.make_variable("t", 0);
    b.emit_assign(t, Rhs::op(Operator::Mul, vec![sv.into(), sv.into()]));
    let cond = b.make_temporary();
    let c = b.emit_assign(cond, Rhs::op(Operator::Less, vec![x.into(), Primary::Float(0.5)]));
    b.start_if(Rhs::value(c))?;
    b.emit_assign(t, Rhs::Primary(Primary::Int(2)));
    b.end_if();
    output_gray(&mut b, x);
    let mut program = b.finish();

    let pass = DeadCodeEliminationPass::new();
    let mut events = EventLog::new();
    assert!(pass.run(&mut program, &mut events));
    assert_eq!(events.count_kind(EventKind::StatementRemoved), 4);
    program.verify_ssa()?;
    program.verify_uses()?;

    let dump = program.dump();
    let mut again = EventLog::new();
    assert!(!pass.run(&mut program, &mut again));
    assert!(again.is_empty());
    assert_eq!(program.dump(), dump);
    Ok(())
}

#[test]
fn test_use_lists_hold_after_every_pass() -> Result<()> {
    let (mut program, ..) = abs_program();
    propagate_types(&mut program);
    let passes: [Box<dyn SsaPass>; 3] = [
        Box::new(ColorFusionPass::new()),
        Box::new(CopyPropagationPass::new()),
        Box::new(DeadCodeEliminationPass::new()),
    ];

    let mut events = EventLog::new();
    for pass in &passes {
        pass.run(&mut program, &mut events);
        program.verify_uses()?;
        program.verify_ssa()?;
    }
    assert!(events.has(EventKind::CopyPropagated));
    Ok(())
}

#[test]
fn test_type_propagation_is_deterministic() {
    let promotable = [ValueType::Int, ValueType::Float, ValueType::Complex];
    for a in promotable {
        for b in promotable {
            assert_eq!(a.max(b), b.max(a));
        }
    }

    let build = || {
        let (mut program, ..) = abs_program();
        propagate_types(&mut program);
        program
    };
    let first = build();
    let second = build();
    let types = |p: &Program| p.values().map(|(_, v)| v.ty()).collect::<Vec<_>>();
    assert_eq!(types(&first), types(&second));

    let (_, y, positive, negated) = abs_program();
    assert_eq!(first.value(positive).ty(), ValueType::Float);
    assert_eq!(first.value(negated).ty(), ValueType::Float);
    assert_eq!(first.value(first.current(y)).ty(), ValueType::Float);
}
