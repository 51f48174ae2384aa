//! C emission of the sliced statement tree.
//!
//! # Regions
//!
//! | Invariance | Runs | Declarations | Code | Cached values live in |
//! |------------|------|--------------|------|-----------------------|
//! | `XY` | once per invocation | `$xy_decls` | `$xy_code` | `xy_prefix` storage |
//! | `X`  | once per row        | `$x_decls`  | `$x_code`  | `x_prefix` storage  |
//! | `Y`  | once per column     | `$y_decls`  | `$y_code`  | `y_prefix` storage  |
//! | none | once per element    | (in `$m`)   | `$m`       | locals              |
//!
//! A region's code computes every value it needs that is not cached by a
//! more invariant region, together with the ifs and loops around them.
//! Permanently cached values are declared once by their `*_decls` marker
//! and referenced through their storage prefix everywhere else.

use tracing::debug;

use crate::{
    codegen::{slice::slice, template::expand_template},
    config::EmitConfig,
    ir::{
        CompVarKind, Invariance, ListLoc, Primary, Program, Rhs, SliceFlags, StmtKind, ValueId,
    },
    Error, Result,
};

/// Returns `true` if `value` must be computed in the code of `region`.
///
/// That is the region of its own invariance, and every more variant region
/// down to the least invariance it is used at repeatedly.
#[must_use]
pub fn is_value_needed(program: &Program, value: ValueId, region: Invariance) -> bool {
    let value = program.value(value);
    value.invariance() == region
        || region.is_within(value.least_multiple_use(), value.invariance())
}

/// Writes C code for one program.
pub struct CEmitter<'a> {
    program: &'a mut Program,
    config: &'a EmitConfig,
}

impl<'a> CEmitter<'a> {
    /// Creates an emitter over an analyzed program.
    pub fn new(program: &'a mut Program, config: &'a EmitConfig) -> Self {
        CEmitter { program, config }
    }

    /// Expands `template`, substituting the code and constants of this program.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMarker`] or [`Error::MalformedTemplate`] when
    /// the template cannot be expanded.
    pub fn expand(&mut self, template: &str) -> Result<String> {
        expand_template(template, |name, out| self.substitute(name, out))
    }

    fn substitute(&mut self, name: &str, out: &mut String) -> Result<()> {
        match name {
            "l" => out.push_str(&self.config.tuple_length.to_string()),
            "p" => out.push_str(&self.config.curve_points.to_string()),
            "q" => out.push_str(&self.config.gradient_points.to_string()),
            "m" => self.region_code(out, Invariance::NONE),
            "xy_decls" => self.permanent_declarations(out, Invariance::XY),
            "x_decls" => self.permanent_declarations(out, Invariance::X),
            "y_decls" => self.permanent_declarations(out, Invariance::Y),
            "xy_code" => self.region_code(out, Invariance::XY),
            "x_code" => self.region_code(out, Invariance::X),
            "y_code" => self.region_code(out, Invariance::Y),
            other => match self.config.extra_markers.get(other) {
                Some(text) => out.push_str(text),
                None => return Err(Error::UnknownMarker(other.to_string())),
            },
        }
        Ok(())
    }

    fn prefix(&self, invariance: Invariance) -> &str {
        if invariance == Invariance::XY {
            &self.config.xy_prefix
        } else if invariance == Invariance::Y {
            &self.config.y_prefix
        } else if invariance == Invariance::X {
            &self.config.x_prefix
        } else {
            ""
        }
    }

    /// The C name of `value`.
    ///
    /// Outside declarations, permanently cached values carry the storage
    /// prefix of their region. Values never assigned read as `0`.
    #[must_use]
    pub fn value_name(&self, value: ValueId, for_decl: bool) -> String {
        let info = self.program.value(value);
        let Some(version) = info.version() else {
            return "0 /* uninitialized */".to_string();
        };
        let prefix = if !for_decl && info.is_permanent() {
            self.prefix(info.invariance())
        } else {
            ""
        };
        match self.program.compvar(info.compvar()).kind() {
            CompVarKind::Variable { name, component } => {
                format!("{prefix}var_{name}_{component}_{version}")
            }
            CompVarKind::Temporary { number } => format!("{prefix}tmp_{number}_{version}"),
        }
    }

    fn primary(&self, primary: Primary) -> String {
        match primary {
            Primary::Value(value) => self.value_name(value, false),
            Primary::Int(i) => i.to_string(),
            Primary::Float(x) => format!("{x:.6}"),
        }
    }

    /// The C expression of a right-hand side.
    #[must_use]
    pub fn rhs(&self, rhs: &Rhs) -> String {
        match rhs {
            Rhs::Primary(primary) => self.primary(*primary),
            Rhs::Internal(id) => self.program.internals().get(*id).name.clone(),
            Rhs::Op { op, args } => {
                let args: Vec<String> = args.iter().map(|p| self.primary(*p)).collect();
                format!("{}({})", op.name(), args.join(","))
            }
        }
    }

    fn declare(&mut self, out: &mut String, value: ValueId) {
        let info = self.program.value(value);
        if info.declared || info.version().is_none() {
            return;
        }
        out.push_str(&format!(
            "{} {};\n",
            info.ty().c_type(),
            self.value_name(value, true)
        ));
        self.program.value_mut(value).declared = true;
    }

    fn reset_declared(&mut self) {
        for value in self.program.values.values_mut() {
            value.declared = false;
        }
    }

    /// Every value defined or read by a live statement, in tree order, with repeats.
    fn tree_values(&self) -> Vec<ValueId> {
        let mut values = Vec::new();
        for stmt in self.program.preorder() {
            let kind = self.program.stmt(stmt).kind();
            values.extend(kind.referenced_values());
            if let StmtKind::Assign { lhs, .. } | StmtKind::Phi { lhs, .. } = kind {
                values.push(*lhs);
            }
        }
        values
    }

    /// Declares the permanently cached values of exactly `invariance`.
    pub fn permanent_declarations(&mut self, out: &mut String, invariance: Invariance) {
        self.reset_declared();
        for value in self.tree_values() {
            let info = self.program.value(value);
            if info.invariance() == invariance && info.is_permanent() {
                self.declare(out, value);
            }
        }
    }

    /// Declares and computes the values the region of `invariance` needs.
    pub fn region_code(&mut self, out: &mut String, invariance: Invariance) {
        self.reset_declared();
        for value in self.tree_values() {
            let permanent = self.program.value(value).is_permanent();
            if (!permanent || invariance == Invariance::NONE)
                && is_value_needed(self.program, value, invariance)
            {
                self.declare(out, value);
            }
        }

        let flag = SliceFlags::for_invariance(invariance);
        slice(self.program, flag, |program, value| {
            is_value_needed(program, value, invariance)
        });

        let start = out.len();
        self.statements(out, ListLoc::Root, flag);
        debug!(
            region = %invariance,
            bytes = out.len() - start,
            "region emitted"
        );
    }

    fn phis(&self, out: &mut String, loc: ListLoc, slot: usize, flag: SliceFlags) {
        for &stmt in self.program.list(loc) {
            let statement = self.program.stmt(stmt);
            if !statement.slices().contains(flag) {
                continue;
            }
            let StmtKind::Phi { lhs, rhs, .. } = statement.kind() else {
                panic!("{stmt} is sliced into a merge list but is not a phi");
            };
            if rhs[slot] == Rhs::value(*lhs) {
                continue;
            }
            out.push_str(&format!(
                "{} = {};\n",
                self.value_name(*lhs, false),
                self.rhs(&rhs[slot])
            ));
        }
    }

    fn statements(&self, out: &mut String, loc: ListLoc, flag: SliceFlags) {
        for &stmt in self.program.list(loc) {
            let statement = self.program.stmt(stmt);
            if !statement.slices().contains(flag) {
                continue;
            }
            match statement.kind() {
                StmtKind::Nop => {}
                StmtKind::Assign { lhs, rhs } => {
                    out.push_str(&format!(
                        "{} = {};\n",
                        self.value_name(*lhs, false),
                        self.rhs(rhs)
                    ));
                }
                StmtKind::Phi { .. } => panic!("{stmt} is a phi outside a merge list"),
                StmtKind::If { condition, .. } => {
                    out.push_str(&format!("if ({})\n{{\n", self.rhs(condition)));
                    self.statements(out, ListLoc::Consequent(stmt), flag);
                    self.phis(out, ListLoc::Exit(stmt), 0, flag);
                    out.push_str("}\nelse\n{\n");
                    self.statements(out, ListLoc::Alternative(stmt), flag);
                    self.phis(out, ListLoc::Exit(stmt), 1, flag);
                    out.push_str("}\n");
                }
                StmtKind::While { invariant, .. } => {
                    self.phis(out, ListLoc::Entry(stmt), 0, flag);
                    out.push_str(&format!("while ({})\n{{\n", self.rhs(invariant)));
                    self.statements(out, ListLoc::Body(stmt), flag);
                    self.phis(out, ListLoc::Entry(stmt), 1, flag);
                    out.push_str("}\n");
                }
            }
        }
    }
}
