//! Small programs built straight through the builder.

use crate::{
    builder::SsaBuilder,
    ir::{InternalTable, Operator, Primary, Program, Rhs, ValueId},
};

pub fn builder() -> SsaBuilder {
    SsaBuilder::new(Program::new(InternalTable::standard()))
}

// Packs `gray` into a color and outputs it, the way every lowered filter ends
pub fn finish_gray(b: &mut SsaBuilder, gray: ValueId) -> ValueId {
    let color = b.make_temporary();
    let g = Primary::Value(gray);
    let packed = b.emit_assign(
        color,
        Rhs::op(Operator::MakeColor, vec![g, g, g, Primary::Float(1.0)]),
    );
    let output = b.make_temporary();
    b.emit_assign(output, Rhs::op(Operator::OutputColor, vec![packed.into()]));
    packed
}

// x = <x>; if x < 0 then y = -x else y = x end; output y
pub fn abs_program() -> Program {
    let mut b = builder();
    let internal = b.program().internals().lookup("x").unwrap();
    let x = b.make_variable("x", 0);
    let xv = b.emit_assign(x, Rhs::Internal(internal));
    let cond = b.make_temporary();
    let c = b.emit_assign(cond, Rhs::op(Operator::Less, vec![xv.into(), Primary::Int(0)]));

    let y = b.make_variable("y", 0);
    b.start_if(Rhs::value(c)).unwrap();
    b.emit_assign(y, Rhs::op(Operator::Neg, vec![xv.into()]));
    b.switch_branch();
    b.emit_assign(y, Rhs::value(xv));
    b.end_if();

    let merged = b.current(y);
    finish_gray(&mut b, merged);
    b.finish()
}

// i = 0; while i < 10 do i = i + 1 end; output i
pub fn counter_loop_program() -> Program {
    let mut b = builder();
    let i = b.make_variable("i", 0);
    let pre = b.emit_assign(i, Rhs::Primary(Primary::Int(0)));
    let cond = b.make_temporary();
    b.emit_assign(cond, Rhs::op(Operator::Less, vec![pre.into(), Primary::Int(10)]));

    b.start_while(cond).unwrap();
    let cur = b.current(i);
    let next = b.emit_assign(i, Rhs::op(Operator::Add, vec![cur.into(), Primary::Int(1)]));
    b.emit_assign(cond, Rhs::op(Operator::Less, vec![next.into(), Primary::Int(10)]));
    b.end_while();

    let last = b.current(i);
    finish_gray(&mut b, last);
    b.finish()
}

// u = x * 2; v = y + 1; w = u * v; output w
pub fn gradient_program() -> Program {
    let mut b = builder();
    let internals = b.program().internals().clone();
    let x = b.make_temporary();
    let xv = b.emit_assign(x, Rhs::Internal(internals.lookup("x").unwrap()));
    let y = b.make_temporary();
    let yv = b.emit_assign(y, Rhs::Internal(internals.lookup("y").unwrap()));

    let u = b.make_variable("u", 0);
    let uv = b.emit_assign(u, Rhs::op(Operator::Mul, vec![xv.into(), Primary::Float(2.0)]));
    let v = b.make_variable("v", 0);
    let vv = b.emit_assign(v, Rhs::op(Operator::Add, vec![yv.into(), Primary::Int(1)]));
    let w = b.make_variable("w", 0);
    let wv = b.emit_assign(w, Rhs::op(Operator::Mul, vec![uv.into(), vv.into()]));

    finish_gray(&mut b, wv);
    b.finish()
}

// The first assignment whose slot prints as `name`
pub fn find_assign(program: &Program, name: &str) -> ValueId {
    program
        .assign_statements()
        .into_iter()
        .filter_map(|s| program.stmt(s).lhs())
        .find(|&v| program.compvar_of(v).to_string() == name)
        .unwrap_or_else(|| panic!("no assignment to {name}"))
}

// Uses every built-in marker once
pub const TEMPLATE: &str = "\
#define TUPLE $l
#define CURVE_POINTS $p
#define GRADIENT_POINTS $q
typedef struct { $xy_decls } xy_vars_t;
typedef struct { $y_decls } y_vars_t;
static void init_frame (xy_vars_t *xy_vars) { $xy_code }
static void init_column (xy_vars_t *xy_vars, y_vars_t *y_vars) { $y_code }
static void calc_row (xy_vars_t *xy_vars, y_vars_t *y_vars)
{
$x_decls
$x_code
$m
}
";
