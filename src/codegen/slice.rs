//! Partitioning of the statement tree into code regions.
//!
//! A region is the code run at one invariance level: once per invocation,
//! once per row, once per column or once per element. Slicing marks the
//! assignments and phis computing values needed in the region, plus every
//! if and while enclosing a marked statement, with the region's
//! [`SliceFlags`] bit. Emission then prints only marked statements.

use crate::ir::{ListLoc, Program, SliceFlags, StmtKind, ValueId};

/// Marks the statements whose result satisfies `needed` with `flag`.
///
/// Constructs are marked when any statement nested in them is. The flag is
/// cleared from every statement first, so slicing a region twice yields the
/// same marks.
///
/// # Returns
///
/// `true` if any statement was marked.
pub fn slice<F>(program: &mut Program, flag: SliceFlags, needed: F) -> bool
where
    F: Fn(&Program, ValueId) -> bool,
{
    clear(program, flag);
    slice_list(program, ListLoc::Root, flag, &needed)
}

/// Removes `flag` from every statement.
pub fn clear(program: &mut Program, flag: SliceFlags) {
    for stmt in program.preorder() {
        program.stmt_mut(stmt).slices.remove(flag);
    }
}

fn slice_list<F>(program: &mut Program, loc: ListLoc, flag: SliceFlags, needed: &F) -> bool
where
    F: Fn(&Program, ValueId) -> bool,
{
    let mut non_empty = false;

    for stmt in program.list(loc).to_vec() {
        let marked = match *program.stmt(stmt).kind() {
            StmtKind::Nop => false,
            StmtKind::Assign { lhs, .. } | StmtKind::Phi { lhs, .. } => needed(program, lhs),
            StmtKind::If { .. } => {
                let consequent = slice_list(program, ListLoc::Consequent(stmt), flag, needed);
                let alternative = slice_list(program, ListLoc::Alternative(stmt), flag, needed);
                let exit = slice_list(program, ListLoc::Exit(stmt), flag, needed);
                consequent || alternative || exit
            }
            StmtKind::While { .. } => {
                let entry = slice_list(program, ListLoc::Entry(stmt), flag, needed);
                let body = slice_list(program, ListLoc::Body(stmt), flag, needed);
                entry || body
            }
        };

        if marked {
            program.stmt_mut(stmt).slices.insert(flag);
            non_empty = true;
        }
    }

    non_empty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{Operator, Rhs, StmtId},
        test::factories::{abs_program, counter_loop_program, find_assign},
    };

    fn marked(program: &Program, flag: SliceFlags) -> Vec<StmtId> {
        program
            .preorder()
            .into_iter()
            .filter(|&s| program.stmt(s).slices().contains(flag))
            .collect()
    }

    #[test]
    fn test_if_is_marked_with_its_branch() {
        let mut program = abs_program();
        let neg = program
            .assign_statements()
            .into_iter()
            .find(|&s| {
                matches!(
                    program.stmt(s).kind(),
                    StmtKind::Assign {
                        rhs: Rhs::Op { op: Operator::Neg, .. },
                        ..
                    }
                )
            })
            .unwrap();
        let target = program.stmt(neg).lhs().unwrap();

        assert!(slice(&mut program, SliceFlags::VARYING, |_, v| v == target));
        let parent = program.stmt(neg).parent().unwrap();
        assert_eq!(marked(&program, SliceFlags::VARYING), [parent, neg]);
    }

    #[test]
    fn test_loop_is_marked_through_its_entry() {
        let mut program = counter_loop_program();
        let pre = find_assign(&program, "i[0]");
        let phi = program
            .value(pre)
            .uses()
            .iter()
            .copied()
            .find(|&s| program.stmt(s).is_phi())
            .unwrap();
        let phi_value = program.stmt(phi).lhs().unwrap();

        assert!(slice(&mut program, SliceFlags::X, |_, v| v == phi_value));
        let marks = marked(&program, SliceFlags::X);
        assert_eq!(marks, [program.stmt(phi).parent().unwrap(), phi]);
    }

    #[test]
    fn test_reslicing_replaces_old_marks() {
        let mut program = abs_program();
        slice(&mut program, SliceFlags::XY, |_, _| true);
        assert!(!marked(&program, SliceFlags::XY).is_empty());
        assert!(!slice(&mut program, SliceFlags::XY, |_, _| false));
        assert!(marked(&program, SliceFlags::XY).is_empty());
    }
}
