//! The input expression tree.
//!
//! The parser and type checker of the filter language are external. They
//! hand the compiler an [`Expr`] tree in which every node already knows how
//! many components its result has (`len`), variables are resolved to a name
//! and a tuple length, internals to an [`InternalId`], and builtin functions
//! to a [`Builtin`] code generator.

use std::{fmt, sync::Arc};

use crate::{
    builder::SsaBuilder,
    ir::{CompVarId, InternalId, Operator, Primary, Rhs},
    Result,
};

/// Generates the SSA code of a builtin function.
pub trait Builtin: fmt::Debug + Send + Sync {
    /// Name of the function, for diagnostics.
    fn name(&self) -> &str;

    /// Emits code computing the function.
    ///
    /// `args` holds one slot per component of each argument; the generator
    /// reads their current values and assigns every slot in `dest`.
    ///
    /// # Errors
    ///
    /// Propagates builder errors when the generator opens constructs.
    fn generate(
        &self,
        builder: &mut SsaBuilder,
        args: &[Vec<CompVarId>],
        dest: &[CompVarId],
    ) -> Result<()>;
}

/// A builtin applying one operator component-wise.
///
/// Arguments with a single component are broadcast over all result components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpBuiltin(pub Operator);

impl Builtin for OpBuiltin {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn generate(
        &self,
        builder: &mut SsaBuilder,
        args: &[Vec<CompVarId>],
        dest: &[CompVarId],
    ) -> Result<()> {
        for (component, &target) in dest.iter().enumerate() {
            let operands = args
                .iter()
                .map(|arg| {
                    let slot = arg[component.min(arg.len() - 1)];
                    Primary::Value(builder.current(slot))
                })
                .collect();
            builder.emit_assign(target, Rhs::op(self.0, operands));
        }
        Ok(())
    }
}

/// A resolved user variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    /// Source name.
    pub name: String,
    /// Number of tuple components.
    pub len: usize,
}

/// Kinds of user-adjustable parameters.
#[derive(Debug, Clone)]
pub enum UserValKind {
    /// Integer slider.
    Int,
    /// Float slider.
    Float,
    /// Checkbox.
    Bool,
    /// Curve, evaluated at the position given by the expression.
    Curve(Box<Expr>),
    /// Color picker, yields four channels.
    Color,
    /// Gradient, evaluated at the position given by the expression; yields four channels.
    Gradient(Box<Expr>),
    /// Input image, yields its index.
    Image,
}

/// A user-adjustable parameter read.
#[derive(Debug, Clone)]
pub struct UserVal {
    /// Index of the parameter in the host's table.
    pub index: i32,
    /// What kind of parameter it is.
    pub kind: UserValKind,
}

/// Node kinds of the expression tree.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal.
    IntConst(i32),
    /// Float literal.
    FloatConst(f32),
    /// Tuple of float literals.
    TupleConst(Vec<f32>),
    /// Tuple built from sub-expressions, concatenating their components.
    Tuple(Vec<Expr>),
    /// `tuple[subscripts]`, one result component per subscript.
    Select {
        /// Indexed tuple
        tuple: Box<Expr>,
        /// One subscript per result component
        subscripts: Vec<Expr>,
    },
    /// Variable read.
    Variable(Variable),
    /// Internal read.
    Internal(InternalId),
    /// `var = value`.
    Assignment {
        /// Assigned variable
        var: Variable,
        /// Assigned value
        value: Box<Expr>,
    },
    /// `var[subscripts] = value`.
    SubAssignment {
        /// Assigned variable
        var: Variable,
        /// One subscript per value component
        subscripts: Vec<Expr>,
        /// Assigned value
        value: Box<Expr>,
    },
    /// Reinterprets a tuple under another tag; the components are unchanged.
    Cast(Box<Expr>),
    /// Builtin function call.
    Func {
        /// Code generator of the function
        builtin: Arc<dyn Builtin>,
        /// Arguments
        args: Vec<Expr>,
    },
    /// `first; second`, yielding `second`.
    Sequence(Box<Expr>, Box<Expr>),
    /// `if condition then consequent [else alternative] end`.
    If {
        /// Single component condition
        condition: Box<Expr>,
        /// Value when the condition holds
        consequent: Box<Expr>,
        /// Value otherwise
        alternative: Option<Box<Expr>>,
    },
    /// `while invariant do body end`, or `do body while invariant end`. Yields `0`.
    While {
        /// Loop condition
        invariant: Box<Expr>,
        /// Loop body
        body: Box<Expr>,
        /// Run the body once before the first test
        do_while: bool,
    },
    /// User parameter read.
    UserVal(UserVal),
}

/// An expression with the number of components of its result.
#[derive(Debug, Clone)]
pub struct Expr {
    /// What the node computes.
    pub kind: ExprKind,
    /// Number of result components.
    pub len: usize,
}

impl Expr {
    /// Wraps a node kind with its result length.
    #[must_use]
    pub fn new(kind: ExprKind, len: usize) -> Self {
        Expr { kind, len }
    }

    /// Integer literal.
    #[must_use]
    pub fn int(value: i32) -> Self {
        Expr::new(ExprKind::IntConst(value), 1)
    }

    /// Float literal.
    #[must_use]
    pub fn float(value: f32) -> Self {
        Expr::new(ExprKind::FloatConst(value), 1)
    }

    /// Tuple of float literals.
    #[must_use]
    pub fn tuple_const(values: Vec<f32>) -> Self {
        let len = values.len();
        Expr::new(ExprKind::TupleConst(values), len)
    }

    /// Tuple of sub-expressions.
    #[must_use]
    pub fn tuple(elems: Vec<Expr>) -> Self {
        let len = elems.iter().map(|e| e.len).sum();
        Expr::new(ExprKind::Tuple(elems), len)
    }

    /// Reads variable `name` with `len` components.
    #[must_use]
    pub fn var(name: &str, len: usize) -> Self {
        Expr::new(
            ExprKind::Variable(Variable {
                name: name.to_string(),
                len,
            }),
            len,
        )
    }

    /// Reads an internal.
    #[must_use]
    pub fn internal(id: InternalId) -> Self {
        Expr::new(ExprKind::Internal(id), 1)
    }

    /// Assigns `value` to variable `name`.
    #[must_use]
    pub fn assign(name: &str, value: Expr) -> Self {
        let len = value.len;
        Expr::new(
            ExprKind::Assignment {
                var: Variable {
                    name: name.to_string(),
                    len,
                },
                value: Box::new(value),
            },
            len,
        )
    }

    /// Calls `builtin` with a result of `len` components.
    #[must_use]
    pub fn func(builtin: Arc<dyn Builtin>, args: Vec<Expr>, len: usize) -> Self {
        Expr::new(ExprKind::Func { builtin, args }, len)
    }

    /// Applies `op` component-wise, with the length of the longest argument.
    #[must_use]
    pub fn op(op: Operator, args: Vec<Expr>) -> Self {
        let len = args.iter().map(|a| a.len).max().unwrap_or(1);
        Expr::func(Arc::new(OpBuiltin(op)), args, len)
    }

    /// Indexes `tuple` with one subscript per result component.
    #[must_use]
    pub fn select(tuple: Expr, subscripts: Vec<Expr>) -> Self {
        let len = subscripts.len();
        Expr::new(
            ExprKind::Select {
                tuple: Box::new(tuple),
                subscripts,
            },
            len,
        )
    }

    /// `first; second`.
    #[must_use]
    pub fn seq(first: Expr, second: Expr) -> Self {
        let len = second.len;
        Expr::new(ExprKind::Sequence(Box::new(first), Box::new(second)), len)
    }

    /// `if condition then consequent else alternative end`.
    #[must_use]
    pub fn if_else(condition: Expr, consequent: Expr, alternative: Option<Expr>) -> Self {
        let len = consequent.len;
        Expr::new(
            ExprKind::If {
                condition: Box::new(condition),
                consequent: Box::new(consequent),
                alternative: alternative.map(Box::new),
            },
            len,
        )
    }

    /// `while invariant do body end`.
    #[must_use]
    pub fn while_loop(invariant: Expr, body: Expr) -> Self {
        Expr::new(
            ExprKind::While {
                invariant: Box::new(invariant),
                body: Box::new(body),
                do_while: false,
            },
            1,
        )
    }

    /// `do body while invariant end`.
    #[must_use]
    pub fn do_while(body: Expr, invariant: Expr) -> Self {
        Expr::new(
            ExprKind::While {
                invariant: Box::new(invariant),
                body: Box::new(body),
                do_while: true,
            },
            1,
        )
    }

    /// Reads a user parameter.
    #[must_use]
    pub fn userval(index: i32, kind: UserValKind) -> Self {
        let len = match kind {
            UserValKind::Color | UserValKind::Gradient(_) => 4,
            _ => 1,
        };
        Expr::new(ExprKind::UserVal(UserVal { index, kind }), len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths_follow_the_tree() {
        let pair = Expr::tuple(vec![Expr::int(1), Expr::tuple_const(vec![0.5, 0.25])]);
        assert_eq!(pair.len, 3);
        assert_eq!(Expr::select(pair, vec![Expr::int(0)]).len, 1);
        assert_eq!(Expr::op(Operator::Add, vec![Expr::var("v", 3), Expr::int(1)]).len, 3);
        assert_eq!(Expr::userval(0, UserValKind::Color).len, 4);
        assert_eq!(Expr::while_loop(Expr::int(0), Expr::int(0)).len, 1);
    }
}
