//! Type propagation.
//!
//! Types only ever move up the promotion order, so the worklist reaches a
//! fixpoint no matter in which order statements are visited.

use tracing::debug;

use crate::{
    analysis::worklist::Worklist,
    ir::{Primary, Program, Rhs, StmtId, StmtKind, TypeRule, ValueType},
};

/// The type of an operand.
#[must_use]
pub fn primary_type(program: &Program, primary: Primary) -> ValueType {
    match primary {
        Primary::Value(value) => program.value(value).ty(),
        Primary::Int(_) => ValueType::Int,
        Primary::Float(_) => ValueType::Float,
    }
}

/// The type of a right-hand side under the current value types.
#[must_use]
pub fn rhs_type(program: &Program, rhs: &Rhs) -> ValueType {
    match rhs {
        Rhs::Primary(primary) => primary_type(program, *primary),
        Rhs::Internal(id) => program.internals().get(*id).ty,
        Rhs::Op { op, args } => match op.info().type_rule {
            TypeRule::Fixed(ty) => ty,
            TypeRule::Max => args
                .iter()
                .map(|arg| primary_type(program, *arg))
                .fold(ValueType::Int, ValueType::max),
        },
    }
}

/// The type of a phi slot, `None` for a value that is never defined.
fn slot_type(program: &Program, rhs: &Rhs) -> Option<ValueType> {
    match rhs {
        Rhs::Primary(Primary::Value(value)) if program.value(*value).def().is_none() => None,
        _ => Some(rhs_type(program, rhs)),
    }
}

// Until the fixpoint a defined slot may still carry the default type, so a
// composite wins here and the merge is checked once types are final.
fn join(a: ValueType, b: ValueType) -> ValueType {
    match (a.is_promotable(), b.is_promotable()) {
        (true, true) => a.max(b),
        (true, false) => b,
        (false, _) => a,
    }
}

fn stmt_type(program: &Program, stmt: StmtId) -> Option<ValueType> {
    match program.stmt(stmt).kind() {
        StmtKind::Assign { rhs, .. } => Some(rhs_type(program, rhs)),
        StmtKind::Phi { rhs, .. } => {
            match (slot_type(program, &rhs[0]), slot_type(program, &rhs[1])) {
                (Some(a), Some(b)) => Some(join(a, b)),
                (Some(ty), None) | (None, Some(ty)) => Some(ty),
                (None, None) => Some(ValueType::Int),
            }
        }
        _ => None,
    }
}

/// Checks that every phi merges slots of agreeing types.
///
/// # Panics
///
/// Panics if a phi merges a composite type with any other type.
fn check_merges(program: &Program) {
    for stmt in program.assign_statements() {
        let StmtKind::Phi { rhs, .. } = program.stmt(stmt).kind() else {
            continue;
        };
        let (Some(a), Some(b)) = (slot_type(program, &rhs[0]), slot_type(program, &rhs[1])) else {
            continue;
        };
        assert!(
            a == b || (a.is_promotable() && b.is_promotable()),
            "{stmt} merges {a} and {b}"
        );
    }
}

/// Infers the type of every defined value.
///
/// Returns the number of type updates made.
///
/// # Panics
///
/// Panics if an operator promotes a composite operand or a phi merges a
/// composite type with any other type. The front end never produces either.
pub fn propagate_types(program: &mut Program) -> usize {
    let mut worklist = Worklist::new();
    worklist.extend(program.assign_statements());
    let mut updates = 0;

    while let Some(stmt) = worklist.pop() {
        let (Some(ty), Some(lhs)) = (stmt_type(program, stmt), program.stmt(stmt).lhs()) else {
            continue;
        };
        if program.value(lhs).ty() == ty {
            continue;
        }
        program.value_mut(lhs).ty = ty;
        updates += 1;

        let compvar = program.compvar_of(lhs);
        for &value in compvar.values() {
            worklist.extend(program.value(value).uses().iter().copied());
        }
    }

    check_merges(program);
    debug!(updates, "types propagated");
    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::Operator,
        test::factories::{abs_program, builder, counter_loop_program, find_assign},
    };

    #[test]
    fn test_internal_reads_are_float() {
        let mut program = abs_program();
        propagate_types(&mut program);

        assert_eq!(program.value(find_assign(&program, "x[0]")).ty(), ValueType::Float);
        assert_eq!(program.value(find_assign(&program, "$t1")).ty(), ValueType::Int);
        let packed = find_assign(&program, "$t2");
        assert_eq!(program.value(packed).ty(), ValueType::Color);
        for (_, value) in program.values().filter(|(_, v)| v.def().is_some()) {
            if program.compvar(value.compvar()).to_string() == "y[0]" {
                assert_eq!(value.ty(), ValueType::Float);
            }
        }
    }

    #[test]
    fn test_loop_stays_int() {
        let mut program = counter_loop_program();
        propagate_types(&mut program);
        for (_, value) in program.values().filter(|(_, v)| v.def().is_some()) {
            if program.compvar(value.compvar()).to_string() == "i[0]" {
                assert_eq!(value.ty(), ValueType::Int);
            }
        }
    }

    #[test]
    fn test_float_reaches_loop_phi_through_back_edge() {
        let mut b = builder();
        let s = b.make_variable("s", 0);
        b.emit_assign(s, Rhs::Primary(Primary::Int(0)));
        let cond = b.make_temporary();
        b.emit_assign(cond, Rhs::Primary(Primary::Int(1)));
        let loop_stmt = b.start_while(cond).unwrap();
        let cur = b.current(s);
        b.emit_assign(s, Rhs::op(Operator::Add, vec![cur.into(), Primary::Float(0.5)]));
        b.emit_assign(cond, Rhs::Primary(Primary::Int(0)));
        b.end_while();
        let mut program = b.finish();

        propagate_types(&mut program);
        let phi = program
            .list(crate::ir::ListLoc::Entry(loop_stmt))
            .iter()
            .filter_map(|&p| program.stmt(p).lhs())
            .find(|&v| program.value(v).compvar() == s)
            .unwrap();
        assert_eq!(program.value(phi).ty(), ValueType::Float);
        assert_eq!(program.value(program.current(s)).ty(), ValueType::Float);
    }

    #[test]
    fn test_color_defined_in_one_branch_types_its_phi() {
        let mut b = builder();
        let packed = b.make_temporary();
        let if_stmt = b.start_if(Rhs::Primary(Primary::Int(1))).unwrap();
        b.emit_assign(packed, Rhs::op(Operator::UservalColor, vec![Primary::Int(0)]));
        b.end_if();
        let mut program = b.finish();

        propagate_types(&mut program);
        let phi = program.list(crate::ir::ListLoc::Exit(if_stmt))[0];
        let lhs = program.stmt(phi).lhs().unwrap();
        assert_eq!(program.value(lhs).ty(), ValueType::Color);
    }

    fn merge_in_if(then: Rhs, otherwise: Rhs) -> Program {
        let mut b = builder();
        let slot = b.make_temporary();
        b.start_if(Rhs::Primary(Primary::Int(1))).unwrap();
        b.emit_assign(slot, then);
        b.switch_branch();
        b.emit_assign(slot, otherwise);
        b.end_if();
        b.finish()
    }

    #[test]
    #[should_panic(expected = "merges color and float")]
    fn test_color_merged_with_defined_float_is_rejected() {
        let mut program = merge_in_if(
            Rhs::op(Operator::UservalColor, vec![Primary::Int(0)]),
            Rhs::Primary(Primary::Float(2.5)),
        );
        propagate_types(&mut program);
    }

    #[test]
    #[should_panic(expected = "merges color and matrix")]
    fn test_different_composites_are_rejected() {
        let one = Primary::Float(1.0);
        let mut program = merge_in_if(
            Rhs::op(Operator::UservalColor, vec![Primary::Int(0)]),
            Rhs::op(Operator::MakeM2x2, vec![one, one, one, one]),
        );
        propagate_types(&mut program);
    }

    #[test]
    fn test_numeric_merge_promotes() {
        let mut program = merge_in_if(
            Rhs::Primary(Primary::Int(1)),
            Rhs::Primary(Primary::Float(2.5)),
        );
        propagate_types(&mut program);
        let phi = *program
            .assign_statements()
            .iter()
            .find(|&&s| program.stmt(s).is_phi())
            .unwrap();
        let lhs = program.stmt(phi).lhs().unwrap();
        assert_eq!(program.value(lhs).ty(), ValueType::Float);
    }

    #[test]
    #[should_panic(expected = "cannot promote between")]
    fn test_arithmetic_on_color_is_rejected() {
        let mut b = builder();
        let color = b.make_temporary();
        let c = b.emit_assign(color, Rhs::op(Operator::UservalColor, vec![Primary::Int(0)]));
        let sum = b.make_temporary();
        b.emit_assign(sum, Rhs::op(Operator::Add, vec![c.into(), Primary::Float(1.0)]));
        let mut program = b.finish();
        propagate_types(&mut program);
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let mut program = counter_loop_program();
        assert!(propagate_types(&mut program) > 0);
        let first: Vec<ValueType> = program.values().map(|(_, v)| v.ty()).collect();
        assert_eq!(propagate_types(&mut program), 0);
        let second: Vec<ValueType> = program.values().map(|(_, v)| v.ty()).collect();
        assert_eq!(first, second);
    }
}
