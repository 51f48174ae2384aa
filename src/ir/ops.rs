//! The operator table.
//!
//! Every operator carries the C name it is emitted as, its arity, how its
//! result type is derived and whether it is pure. Purity matters twice: dead
//! code elimination only removes pure definitions, and only pure operators
//! pass the invariance of their arguments on to their result.

use strum::{EnumCount, EnumIter};

use super::types::ValueType;

/// Maximum number of arguments any operator takes.
pub const MAX_OP_ARGS: usize = 9;

/// How the result type of an operator application is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRule {
    /// Always this type.
    Fixed(ValueType),
    /// The promotion of all argument types.
    Max,
}

/// Static metadata for one [`Operator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorInfo {
    /// Name used when emitting C and dumping the IR.
    pub name: &'static str,
    /// Number of arguments.
    pub arity: usize,
    /// Result type rule.
    pub type_rule: TypeRule,
    /// `false` if evaluating the operator has side effects or allocates.
    pub is_pure: bool,
}

const fn pure(name: &'static str, arity: usize, type_rule: TypeRule) -> OperatorInfo {
    OperatorInfo {
        name,
        arity,
        type_rule,
        is_pure: true,
    }
}

const fn impure(name: &'static str, arity: usize, type_rule: TypeRule) -> OperatorInfo {
    OperatorInfo {
        name,
        arity,
        type_rule,
        is_pure: false,
    }
}

const INT: TypeRule = TypeRule::Fixed(ValueType::Int);
const FLOAT: TypeRule = TypeRule::Fixed(ValueType::Float);
const COMPLEX: TypeRule = TypeRule::Fixed(ValueType::Complex);
const COLOR: TypeRule = TypeRule::Fixed(ValueType::Color);
const MATRIX: TypeRule = TypeRule::Fixed(ValueType::Matrix);
const VECTOR: TypeRule = TypeRule::Fixed(ValueType::Vector);
const MAX: TypeRule = TypeRule::Max;

/// Operators available in operator applications.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum Operator {
    Nop,
    Add,
    Sub,
    Neg,
    Mul,
    Div,
    Mod,
    Abs,
    Min,
    Max,
    Sqrt,
    Hypot,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Pow,
    Exp,
    Log,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Gamma,
    Floor,
    Eq,
    Less,
    Leq,
    Not,
    Print,
    Newline,
    OrigVal,
    RedFloat,
    GreenFloat,
    BlueFloat,
    AlphaFloat,
    Complex,
    Creal,
    Cimag,
    Csqrt,
    Csin,
    Ccos,
    Ctan,
    Casin,
    Cacos,
    Catan,
    Cpow,
    Cexp,
    Clog,
    Carg,
    Csinh,
    Ccosh,
    Ctanh,
    Casinh,
    Cacosh,
    Catanh,
    Cgamma,
    MakeM2x2,
    MakeM3x3,
    FreeMatrix,
    MakeV2,
    MakeV3,
    FreeVector,
    VectorNth,
    SolveLinear2,
    SolveLinear3,
    Noise,
    Rand,
    UservalInt,
    UservalFloat,
    UservalBool,
    UservalCurve,
    UservalColor,
    UservalGradient,
    MakeColor,
    OutputColor,
}

impl Operator {
    /// Returns the static metadata of this operator.
    #[must_use]
    pub const fn info(self) -> OperatorInfo {
        match self {
            Operator::Nop => pure("NOP", 0, INT),
            Operator::Add => pure("ADD", 2, MAX),
            Operator::Sub => pure("SUB", 2, MAX),
            Operator::Neg => pure("NEG", 1, MAX),
            Operator::Mul => pure("MUL", 2, MAX),
            Operator::Div => pure("DIV", 2, FLOAT),
            Operator::Mod => pure("MOD", 2, FLOAT),
            Operator::Abs => pure("fabs", 1, MAX),
            Operator::Min => pure("MIN", 2, MAX),
            Operator::Max => pure("MAX", 2, MAX),
            Operator::Sqrt => pure("sqrt", 1, FLOAT),
            Operator::Hypot => pure("hypot", 2, FLOAT),
            Operator::Sin => pure("sin", 1, FLOAT),
            Operator::Cos => pure("cos", 1, FLOAT),
            Operator::Tan => pure("tan", 1, FLOAT),
            Operator::Asin => pure("asin", 1, FLOAT),
            Operator::Acos => pure("acos", 1, FLOAT),
            Operator::Atan => pure("atan", 1, FLOAT),
            Operator::Atan2 => pure("atan2", 2, FLOAT),
            Operator::Pow => pure("pow", 2, FLOAT),
            Operator::Exp => pure("exp", 1, FLOAT),
            Operator::Log => pure("log", 1, FLOAT),
            Operator::Sinh => pure("sinh", 1, FLOAT),
            Operator::Cosh => pure("cosh", 1, FLOAT),
            Operator::Tanh => pure("tanh", 1, FLOAT),
            Operator::Asinh => pure("asinh", 1, FLOAT),
            Operator::Acosh => pure("acosh", 1, FLOAT),
            Operator::Atanh => pure("atanh", 1, FLOAT),
            Operator::Gamma => pure("GAMMA", 1, FLOAT),
            Operator::Floor => pure("floor", 1, INT),
            Operator::Eq => pure("EQ", 2, INT),
            Operator::Less => pure("LESS", 2, INT),
            Operator::Leq => pure("LEQ", 2, INT),
            Operator::Not => pure("NOT", 1, INT),
            Operator::Print => impure("PRINT", 1, INT),
            Operator::Newline => impure("NEWLINE", 0, INT),
            Operator::OrigVal => pure("ORIG_VAL", 4, COLOR),
            Operator::RedFloat => pure("RED_FLOAT", 1, FLOAT),
            Operator::GreenFloat => pure("GREEN_FLOAT", 1, FLOAT),
            Operator::BlueFloat => pure("BLUE_FLOAT", 1, FLOAT),
            Operator::AlphaFloat => pure("ALPHA_FLOAT", 1, FLOAT),
            Operator::Complex => pure("COMPLEX", 2, COMPLEX),
            Operator::Creal => pure("crealf", 1, FLOAT),
            Operator::Cimag => pure("cimagf", 1, FLOAT),
            Operator::Csqrt => pure("csqrtf", 1, COMPLEX),
            Operator::Csin => pure("csinf", 1, COMPLEX),
            Operator::Ccos => pure("ccosf", 1, COMPLEX),
            Operator::Ctan => pure("ctanf", 1, COMPLEX),
            Operator::Casin => pure("casinf", 1, COMPLEX),
            Operator::Cacos => pure("cacosf", 1, COMPLEX),
            Operator::Catan => pure("catanf", 1, COMPLEX),
            Operator::Cpow => pure("cpowf", 2, COMPLEX),
            Operator::Cexp => pure("cexpf", 1, COMPLEX),
            Operator::Clog => pure("clogf", 1, COMPLEX),
            Operator::Carg => pure("cargf", 1, FLOAT),
            Operator::Csinh => pure("csinhf", 1, COMPLEX),
            Operator::Ccosh => pure("ccoshf", 1, COMPLEX),
            Operator::Ctanh => pure("ctanhf", 1, COMPLEX),
            Operator::Casinh => pure("casinhf", 1, COMPLEX),
            Operator::Cacosh => pure("cacoshf", 1, COMPLEX),
            Operator::Catanh => pure("catanhf", 1, COMPLEX),
            Operator::Cgamma => pure("cgamma", 1, COMPLEX),
            Operator::MakeM2x2 => impure("MAKE_M2X2", 4, MATRIX),
            Operator::MakeM3x3 => impure("MAKE_M3X3", 9, MATRIX),
            Operator::FreeMatrix => impure("FREE_MATRIX", 1, INT),
            Operator::MakeV2 => impure("MAKE_V2", 2, VECTOR),
            Operator::MakeV3 => impure("MAKE_V3", 3, VECTOR),
            Operator::FreeVector => impure("FREE_VECTOR", 1, INT),
            Operator::VectorNth => impure("VECTOR_NTH", 2, FLOAT),
            Operator::SolveLinear2 => impure("SOLVE_LINEAR_2", 2, VECTOR),
            Operator::SolveLinear3 => impure("SOLVE_LINEAR_3", 2, VECTOR),
            Operator::Noise => pure("noise", 3, FLOAT),
            Operator::Rand => impure("RAND", 2, FLOAT),
            Operator::UservalInt => pure("USERVAL_INT", 1, INT),
            Operator::UservalFloat => pure("USERVAL_FLOAT", 1, FLOAT),
            Operator::UservalBool => pure("USERVAL_BOOL", 1, INT),
            Operator::UservalCurve => pure("USERVAL_CURVE", 2, FLOAT),
            Operator::UservalColor => pure("USERVAL_COLOR", 1, COLOR),
            Operator::UservalGradient => pure("USERVAL_GRADIENT", 2, COLOR),
            Operator::MakeColor => pure("MAKE_COLOR", 4, COLOR),
            Operator::OutputColor => impure("OUTPUT_COLOR", 1, INT),
        }
    }

    /// The emitted name of this operator.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.info().name
    }

    /// The number of arguments this operator takes.
    #[must_use]
    pub const fn arity(self) -> usize {
        self.info().arity
    }

    /// Returns `true` if the operator has no side effects.
    #[must_use]
    pub const fn is_pure(self) -> bool {
        self.info().is_pure
    }

    /// The channel extraction operator for color channel `index` (0 = red .. 3 = alpha).
    #[must_use]
    pub const fn channel(index: usize) -> Option<Operator> {
        match index {
            0 => Some(Operator::RedFloat),
            1 => Some(Operator::GreenFloat),
            2 => Some(Operator::BlueFloat),
            3 => Some(Operator::AlphaFloat),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
