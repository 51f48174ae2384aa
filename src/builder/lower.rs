//! Lowering of expression trees into SSA statements.
//!
//! Every expression node produces one slot per result component. A caller
//! either supplies the slots the result must be assigned to, or lets the node
//! pick them: constants and operators allocate temporaries, a variable read
//! hands out the variable's own slots without emitting anything.

use std::collections::HashMap;

use tracing::trace;

use crate::{
    builder::SsaBuilder,
    expr::{Expr, ExprKind, UserValKind, Variable},
    ir::{CompVarId, Operator, Primary, Rhs, ValueId},
    Result,
};

/// Number of components of a color, the result of every filter.
pub const COLOR_COMPONENTS: usize = 4;

/// Lowers expression trees through an [`SsaBuilder`].
///
/// User variables keep their slots for the lifetime of the lowering, so
/// several expressions lowered through the same instance share variables.
pub struct Lowering<'a> {
    builder: &'a mut SsaBuilder,
    variables: HashMap<String, Vec<CompVarId>>,
}

impl<'a> Lowering<'a> {
    /// Creates a lowering emitting through `builder`.
    pub fn new(builder: &'a mut SsaBuilder) -> Self {
        Lowering {
            builder,
            variables: HashMap::new(),
        }
    }

    /// Lowers the body of a filter.
    ///
    /// The four result components are packed with `MAKE_COLOR` and handed to
    /// `OUTPUT_COLOR`. Returns the value holding the packed color.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NestingTooDeep`] if the tree nests constructs
    /// deeper than the builder allows.
    ///
    /// # Panics
    ///
    /// Panics if the expression does not yield four components.
    pub fn lower_filter(&mut self, expr: &Expr) -> Result<ValueId> {
        assert_eq!(
            expr.len, COLOR_COMPONENTS,
            "a filter must yield {COLOR_COMPONENTS} components"
        );
        let result = self.lower(expr, None)?;

        let channels = result
            .iter()
            .map(|&slot| Primary::Value(self.builder.current(slot)))
            .collect();
        let color = self.builder.make_temporary();
        let packed = self
            .builder
            .emit_assign(color, Rhs::op(Operator::MakeColor, channels));

        let output = self.builder.make_temporary();
        self.builder.emit_assign(
            output,
            Rhs::op(Operator::OutputColor, vec![Primary::Value(packed)]),
        );
        Ok(packed)
    }

    /// Lowers `expr` and returns the slots holding its components.
    ///
    /// With `dest`, the result is assigned to those slots, which are returned.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NestingTooDeep`] if the tree nests constructs
    /// deeper than the builder allows.
    pub fn lower(&mut self, expr: &Expr, dest: Option<&[CompVarId]>) -> Result<Vec<CompVarId>> {
        if let Some(dest) = dest {
            assert!(
                dest.len() >= expr.len,
                "{} destination slots for a result of {} components",
                dest.len(),
                expr.len
            );
        }

        match &expr.kind {
            ExprKind::IntConst(value) => {
                let target = self.target(dest, 0);
                self.builder
                    .emit_assign(target, Rhs::Primary(Primary::Int(*value)));
                Ok(vec![target])
            }
            ExprKind::FloatConst(value) => {
                let target = self.target(dest, 0);
                self.builder
                    .emit_assign(target, Rhs::Primary(Primary::Float(*value)));
                Ok(vec![target])
            }
            ExprKind::TupleConst(values) => Ok(values
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    let target = self.target(dest, i);
                    self.builder
                        .emit_assign(target, Rhs::Primary(Primary::Float(*value)));
                    target
                })
                .collect()),
            ExprKind::Tuple(elems) => {
                let mut slots = Vec::with_capacity(expr.len);
                for elem in elems {
                    let offset = slots.len();
                    let sub = dest.map(|d| &d[offset..offset + elem.len]);
                    slots.extend(self.lower(elem, sub)?);
                }
                Ok(slots)
            }
            ExprKind::Select { tuple, subscripts } => self.lower_select(tuple, subscripts, dest),
            ExprKind::Variable(var) => {
                let slots = self.variable(var);
                Ok(self.deliver(&slots, dest))
            }
            ExprKind::Internal(id) => {
                let target = self.target(dest, 0);
                self.builder.emit_assign(target, Rhs::Internal(*id));
                Ok(vec![target])
            }
            ExprKind::Assignment { var, value } => {
                let slots = self.variable(var);
                self.lower(value, Some(&slots))?;
                Ok(self.deliver(&slots[..expr.len], dest))
            }
            ExprKind::SubAssignment {
                var,
                subscripts,
                value,
            } => self.lower_sub_assignment(var, subscripts, value, dest),
            ExprKind::Cast(inner) => self.lower(inner, dest),
            ExprKind::Func { builtin, args } => {
                let mut lowered = Vec::with_capacity(args.len());
                for arg in args {
                    lowered.push(self.lower(arg, None)?);
                }
                let targets: Vec<CompVarId> = match dest {
                    Some(dest) => dest[..expr.len].to_vec(),
                    None => (0..expr.len).map(|_| self.builder.make_temporary()).collect(),
                };
                trace!(builtin = builtin.name(), args = args.len(), "generating builtin");
                builtin.generate(self.builder, &lowered, &targets)?;
                Ok(targets)
            }
            ExprKind::Sequence(first, second) => {
                self.lower(first, None)?;
                self.lower(second, dest)
            }
            ExprKind::If {
                condition,
                consequent,
                alternative,
            } => {
                let result: Vec<CompVarId> =
                    (0..expr.len).map(|_| self.builder.make_temporary()).collect();
                let condition = self.lower(condition, None)?[0];
                let test = Rhs::value(self.builder.current(condition));

                self.builder.start_if(test)?;
                self.lower(consequent, Some(&result))?;
                self.builder.switch_branch();
                if let Some(alternative) = alternative {
                    self.lower(alternative, Some(&result))?;
                }
                self.builder.end_if();

                Ok(self.deliver(&result, dest))
            }
            ExprKind::While {
                invariant,
                body,
                do_while,
            } => {
                let condition = self.builder.make_temporary();
                if *do_while {
                    self.lower(body, None)?;
                }
                self.lower(invariant, Some(&[condition]))?;
                self.builder.start_while(condition)?;
                self.lower(body, None)?;
                self.lower(invariant, Some(&[condition]))?;
                self.builder.end_while();

                let target = self.target(dest, 0);
                self.builder
                    .emit_assign(target, Rhs::Primary(Primary::Int(0)));
                Ok(vec![target])
            }
            ExprKind::UserVal(userval) => {
                let index = Primary::Int(userval.index);
                match &userval.kind {
                    UserValKind::Int => self.emit_single(dest, Rhs::op(Operator::UservalInt, vec![index])),
                    UserValKind::Float => {
                        self.emit_single(dest, Rhs::op(Operator::UservalFloat, vec![index]))
                    }
                    UserValKind::Bool => {
                        self.emit_single(dest, Rhs::op(Operator::UservalBool, vec![index]))
                    }
                    UserValKind::Curve(position) => {
                        let target = self.target(dest, 0);
                        let position = self.lower_scalar(position)?;
                        self.builder
                            .emit_assign(target, Rhs::op(Operator::UservalCurve, vec![index, position]));
                        Ok(vec![target])
                    }
                    UserValKind::Color => {
                        let packed = self.builder.make_temporary();
                        let targets = self.targets(dest, COLOR_COMPONENTS);
                        self.builder
                            .emit_assign(packed, Rhs::op(Operator::UservalColor, vec![index]));
                        Ok(self.unpack_color(packed, targets))
                    }
                    UserValKind::Gradient(position) => {
                        let packed = self.builder.make_temporary();
                        let targets = self.targets(dest, COLOR_COMPONENTS);
                        let position = self.lower_scalar(position)?;
                        self.builder.emit_assign(
                            packed,
                            Rhs::op(Operator::UservalGradient, vec![index, position]),
                        );
                        Ok(self.unpack_color(packed, targets))
                    }
                    UserValKind::Image => self.emit_single(dest, Rhs::Primary(index)),
                }
            }
        }
    }

    fn lower_select(
        &mut self,
        tuple: &Expr,
        subscripts: &[Expr],
        dest: Option<&[CompVarId]>,
    ) -> Result<Vec<CompVarId>> {
        let elems = self.lower(tuple, None)?;
        let mut slots = Vec::with_capacity(subscripts.len());

        for (i, subscript) in subscripts.iter().enumerate() {
            if let Some(index) = constant_subscript(subscript, elems.len()) {
                match dest {
                    Some(dest) => {
                        self.copy(dest[i], elems[index]);
                        slots.push(dest[i]);
                    }
                    None => slots.push(elems[index]),
                }
                continue;
            }

            let target = self.target(dest, i);
            let subscript = self.lower(subscript, None)?[0];
            self.dispatch(subscript, elems.len(), |lowering, j| {
                lowering.copy(target, elems[j]);
            })?;
            slots.push(target);
        }
        Ok(slots)
    }

    fn lower_sub_assignment(
        &mut self,
        var: &Variable,
        subscripts: &[Expr],
        value: &Expr,
        dest: Option<&[CompVarId]>,
    ) -> Result<Vec<CompVarId>> {
        let slots = self.variable(var);
        let values = self.lower(value, None)?;
        let mut result = Vec::with_capacity(subscripts.len());

        for (i, subscript) in subscripts.iter().enumerate() {
            if let Some(index) = constant_subscript(subscript, slots.len()) {
                self.copy(slots[index], values[i]);
            } else {
                let subscript = self.lower(subscript, None)?[0];
                let source = values[i];
                self.dispatch(subscript, slots.len(), |lowering, j| {
                    lowering.copy(slots[j], source);
                })?;
            }

            match dest {
                Some(dest) => {
                    self.copy(dest[i], values[i]);
                    result.push(dest[i]);
                }
                None => result.push(values[i]),
            }
        }
        Ok(result)
    }

    /// Emits a chain of ifs running `arm(j)` for the `j` selected by `subscript`.
    ///
    /// Subscripts below zero select the first arm, those past the end the last.
    fn dispatch(
        &mut self,
        subscript: CompVarId,
        arms: usize,
        mut arm: impl FnMut(&mut Self, usize),
    ) -> Result<()> {
        for j in 1..arms {
            let index = Primary::Value(self.builder.current(subscript));
            let test = Rhs::op(Operator::Less, vec![index, Primary::Int(j as i32)]);
            self.builder.start_if(test)?;
            arm(self, j - 1);
            self.builder.switch_branch();
        }
        arm(self, arms - 1);
        for _ in 1..arms {
            self.builder.end_if();
        }
        Ok(())
    }

    fn lower_scalar(&mut self, expr: &Expr) -> Result<Primary> {
        let slot = self.lower(expr, None)?[0];
        Ok(Primary::Value(self.builder.current(slot)))
    }

    fn unpack_color(&mut self, packed: CompVarId, targets: Vec<CompVarId>) -> Vec<CompVarId> {
        for (i, &target) in targets.iter().enumerate() {
            let color = Primary::Value(self.builder.current(packed));
            if let Some(channel) = Operator::channel(i) {
                self.builder.emit_assign(target, Rhs::op(channel, vec![color]));
            }
        }
        targets
    }

    fn emit_single(&mut self, dest: Option<&[CompVarId]>, rhs: Rhs) -> Result<Vec<CompVarId>> {
        let target = self.target(dest, 0);
        self.builder.emit_assign(target, rhs);
        Ok(vec![target])
    }

    /// Assigns the current value of `source` to `target`.
    fn copy(&mut self, target: CompVarId, source: CompVarId) {
        let value = self.builder.current(source);
        self.builder.emit_assign(target, Rhs::value(value));
    }

    fn deliver(&mut self, slots: &[CompVarId], dest: Option<&[CompVarId]>) -> Vec<CompVarId> {
        match dest {
            Some(dest) => {
                for (&target, &source) in dest.iter().zip(slots) {
                    self.copy(target, source);
                }
                dest[..slots.len()].to_vec()
            }
            None => slots.to_vec(),
        }
    }

    fn target(&mut self, dest: Option<&[CompVarId]>, index: usize) -> CompVarId {
        match dest {
            Some(dest) => dest[index],
            None => self.builder.make_temporary(),
        }
    }

    fn targets(&mut self, dest: Option<&[CompVarId]>, count: usize) -> Vec<CompVarId> {
        (0..count).map(|i| self.target(dest, i)).collect()
    }

    /// The slots of a user variable, allocated on first mention.
    fn variable(&mut self, var: &Variable) -> Vec<CompVarId> {
        if let Some(slots) = self.variables.get(&var.name) {
            assert_eq!(
                slots.len(),
                var.len,
                "variable {} used with {} and {} components",
                var.name,
                slots.len(),
                var.len
            );
            return slots.clone();
        }
        let slots: Vec<CompVarId> = (0..var.len)
            .map(|component| self.builder.make_variable(&var.name, component))
            .collect();
        self.variables.insert(var.name.clone(), slots.clone());
        slots
    }
}

/// The clamped index of a literal subscript, `None` for computed ones.
fn constant_subscript(subscript: &Expr, len: usize) -> Option<usize> {
    let value = match subscript.kind {
        ExprKind::IntConst(value) => i64::from(value),
        ExprKind::FloatConst(value) => value as i64,
        _ => return None,
    };
    let last = len.saturating_sub(1);
    Some(usize::try_from(value).map_or(0, |index| index.min(last)))
}
