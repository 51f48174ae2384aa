//! Color fusion pass.
//!
//! Lowering unpacks every color into four channel values and packs results
//! back with `MAKE_COLOR`. A color that is unpacked and repacked unchanged
//! makes this round trip for nothing:
//!
//! ```text
//! $t3_1 = RED_FLOAT($t1_1)
//! $t4_1 = GREEN_FLOAT($t1_1)
//! $t5_1 = BLUE_FLOAT($t1_1)
//! $t6_1 = ALPHA_FLOAT($t1_1)
//! $t7_1 = MAKE_COLOR($t3_1, $t4_1, $t5_1, $t6_1)
//! ```
//!
//! The pass turns the repacking into the copy `$t7_1 = $t1_1`. Copy
//! propagation and dead code elimination then remove the copy and the
//! channel extractions.
//!
//! Only the consequent, alternative and body lists are searched. Merge lists
//! hold phis only.

use crate::{
    compiler::{pass::SsaPass, EventKind, EventLog},
    ir::{ListLoc, Operator, Primary, Program, Rhs, StmtId, StmtKind, ValueId},
};

/// Color fusion pass.
pub struct ColorFusionPass;

impl Default for ColorFusionPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorFusionPass {
    /// Creates a new color fusion pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// The color `arg` was extracted from, if `arg` is channel `index` of a color.
    fn channel_source(program: &Program, arg: Primary, index: usize) -> Option<ValueId> {
        let def = program.value(arg.value()?).def()?;
        match program.stmt(def).kind() {
            StmtKind::Assign {
                rhs: Rhs::Op { op, args },
                ..
            } if Some(*op) == Operator::channel(index) => args[0].value(),
            _ => None,
        }
    }

    /// The color a `MAKE_COLOR` statement merely repacks.
    fn repacked_color(program: &Program, stmt: StmtId) -> Option<ValueId> {
        let StmtKind::Assign {
            rhs: Rhs::Op {
                op: Operator::MakeColor,
                args,
            },
            ..
        } = program.stmt(stmt).kind()
        else {
            return None;
        };

        let source = Self::channel_source(program, args[0], 0)?;
        (1..4)
            .all(|i| Self::channel_source(program, args[i], i) == Some(source))
            .then_some(source)
    }

    fn fuse_list(&self, program: &mut Program, loc: ListLoc, events: &mut EventLog) -> usize {
        let mut fused = 0;
        for stmt in program.list(loc).to_vec() {
            match program.stmt(stmt).kind() {
                StmtKind::If { .. } => {
                    fused += self.fuse_list(program, ListLoc::Consequent(stmt), events);
                    fused += self.fuse_list(program, ListLoc::Alternative(stmt), events);
                }
                StmtKind::While { .. } => {
                    fused += self.fuse_list(program, ListLoc::Body(stmt), events);
                }
                StmtKind::Assign { .. } => {
                    let Some(source) = Self::repacked_color(program, stmt) else {
                        continue;
                    };
                    program.replace_rhs(stmt, Rhs::value(source));
                    fused += 1;
                    events
                        .record(EventKind::ColorFused)
                        .at(stmt)
                        .pass(self.name())
                        .message(format!("repacking of {}", program.value_name(source)));
                }
                StmtKind::Phi { .. } | StmtKind::Nop => {}
            }
        }
        fused
    }
}

impl SsaPass for ColorFusionPass {
    fn name(&self) -> &'static str {
        "color-fusion"
    }

    fn description(&self) -> &'static str {
        "Replaces colors rebuilt from their own channels with the original color"
    }

    fn run(&self, program: &mut Program, events: &mut EventLog) -> bool {
        self.fuse_list(program, ListLoc::Root, events) > 0
    }
}
