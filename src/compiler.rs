use curve25519_dalek::Scalar;

use crate::{
    circuit::{Circuit, CircuitValue},
    relation::{Relation, SignalName, TruncatedDivision, QUOTIENT_BITS},
    scalar::{from_u64, to_u64},
};

pub type Id = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Variable(Id),
    Constant(u64),
    Input(Id),
    Eq(Box<Expression>, Box<Expression>),
    Sum(Vec<Expression>),
    Product(Vec<Expression>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Compiler {
    variables_counter: Id,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            variables_counter: 0,
        }
    }

    pub fn new_with_counter(variables_counter: Id) -> Self {
        Compiler { variables_counter }
    }

    pub fn num_vars(&self) -> usize {
        self.variables_counter
    }

    fn fresh_var(&mut self) -> Id {
        let id = self.variables_counter;
        self.variables_counter += 1;
        id
    }

    pub fn flatten(&mut self, expression: Expression) -> Vec<Circuit> {
        let mut circuits = vec![];

        fn flatten_expr(
            compiler: &mut Compiler,
            expr: Expression,
            circuits: &mut Vec<Circuit>,
        ) -> CircuitValue {
            match expr {
                Expression::Constant(val) => CircuitValue::Constant(val),
                Expression::Variable(id) => CircuitValue::Variable(id),
                Expression::Input(id) => CircuitValue::Input(id),

                Expression::Eq(lhs, rhs) => {
                    let lhs_val = flatten_expr(compiler, *lhs, circuits);
                    let rhs_val = flatten_expr(compiler, *rhs, circuits);
                    let lhs_var = match lhs_val {
                        CircuitValue::Variable(id) => id,
                        _ => {
                            let tmp_var = compiler.fresh_var();
                            circuits.push(Circuit::Eq(tmp_var, lhs_val));
                            tmp_var
                        }
                    };
                    circuits.push(Circuit::Eq(lhs_var, rhs_val));
                    lhs_val
                }

                Expression::Sum(exprs) => {
                    let mut sum_var = None;
                    for expr in exprs {
                        let val = flatten_expr(compiler, expr, circuits);
                        sum_var = match sum_var {
                            Some(current_sum) => {
                                let tmp_var = compiler.fresh_var();
                                circuits.push(Circuit::Add(tmp_var, current_sum, val));
                                Some(CircuitValue::Variable(tmp_var))
                            }
                            None => Some(val),
                        };
                    }
                    sum_var.unwrap_or(CircuitValue::Constant(0))
                }

                Expression::Product(exprs) => {
                    let mut prod_var = None;
                    for expr in exprs {
                        let val = flatten_expr(compiler, expr, circuits);
                        prod_var = match prod_var {
                            Some(current_prod) => {
                                let tmp_var = compiler.fresh_var();
                                circuits.push(Circuit::Mult(tmp_var, current_prod, val));
                                Some(CircuitValue::Variable(tmp_var))
                            }
                            None => Some(val),
                        };
                    }
                    prod_var.unwrap_or(CircuitValue::Constant(1))
                }
            }
        }

        flatten_expr(self, expression, &mut circuits);

        circuits
    }
}

/// Where each relation signal and auxiliary wire lives in the lowered circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalLayout {
    pub private: Vec<(SignalName, Id)>,
    /// Variable mirroring public input `i` at position `i`.
    pub public: Vec<(SignalName, Id)>,
    pub division: TruncatedDivision,
    pub remainder: Id,
    pub slack: Id,
    pub remainder_bits: Vec<Id>,
    pub slack_bits: Vec<Id>,
    pub quotient_bits: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lowered {
    pub circuits: Vec<Circuit>,
    pub layout: SignalLayout,
    pub num_vars: usize,
    pub num_inputs: usize,
}

fn var(id: Id) -> Expression {
    Expression::Variable(id)
}

fn eq(lhs: Expression, rhs: Expression) -> Expression {
    Expression::Eq(Box::new(lhs), Box::new(rhs))
}

// x = sum(bit_i * 2^i)
fn packing(target: Id, bits: &[Id]) -> Expression {
    eq(
        var(target),
        Expression::Sum(
            bits.iter()
                .enumerate()
                .map(|(i, bit)| Expression::Product(vec![var(*bit), Expression::Constant(1 << i)]))
                .collect(),
        ),
    )
}

fn lookup(signals: &[(SignalName, Id)], name: &str) -> Result<Id, String> {
    signals
        .iter()
        .find(|(signal, _)| *signal == name)
        .map(|(_, id)| *id)
        .ok_or_else(|| format!("signal `{name}` is not declared"))
}

/// Lowers `quotient == dividend / divisor` into gates without field division:
///
/// dividend = quotient * divisor + remainder
/// remainder + slack = divisor - 1
/// remainder, slack, quotient are bit decomposed and every bit is boolean
pub fn lower(relation: &Relation) -> Result<Lowered, String> {
    relation.validate()?;
    let mut compiler = Compiler::new();

    let private: Vec<(SignalName, Id)> = relation
        .private_signals()
        .iter()
        .map(|name| (*name, compiler.fresh_var()))
        .collect();
    let public: Vec<(SignalName, Id)> = relation
        .public_signals()
        .iter()
        .map(|name| (*name, compiler.fresh_var()))
        .collect();

    let division = *relation.constraint();
    let dividend = lookup(&private, division.dividend)?;
    let quotient = lookup(&public, division.quotient)?;
    let remainder = compiler.fresh_var();
    let slack = compiler.fresh_var();
    let remainder_bits: Vec<Id> = (0..division.remainder_bits())
        .map(|_| compiler.fresh_var())
        .collect();
    let slack_bits: Vec<Id> = (0..division.remainder_bits())
        .map(|_| compiler.fresh_var())
        .collect();
    let quotient_bits: Vec<Id> = (0..QUOTIENT_BITS).map(|_| compiler.fresh_var()).collect();

    let mut exprs: Vec<Expression> = public
        .iter()
        .enumerate()
        .map(|(i, (_, id))| eq(var(*id), Expression::Input(i)))
        .collect();
    exprs.push(eq(
        var(dividend),
        Expression::Sum(vec![
            Expression::Product(vec![var(quotient), Expression::Constant(division.divisor)]),
            var(remainder),
        ]),
    ));
    exprs.push(eq(
        Expression::Constant(division.divisor - 1),
        Expression::Sum(vec![var(remainder), var(slack)]),
    ));
    exprs.push(packing(remainder, &remainder_bits));
    exprs.push(packing(slack, &slack_bits));
    exprs.push(packing(quotient, &quotient_bits));

    let mut circuits: Vec<Circuit> = exprs
        .into_iter()
        .flat_map(|expr| compiler.flatten(expr))
        .collect();
    // b * b = b
    circuits.extend(
        remainder_bits
            .iter()
            .chain(&slack_bits)
            .chain(&quotient_bits)
            .map(|bit| {
                Circuit::Mult(
                    *bit,
                    CircuitValue::Variable(*bit),
                    CircuitValue::Variable(*bit),
                )
            }),
    );

    Ok(Lowered {
        circuits,
        num_vars: compiler.num_vars(),
        num_inputs: public.len(),
        layout: SignalLayout {
            private,
            public,
            division,
            remainder,
            slack,
            remainder_bits,
            slack_bits,
            quotient_bits,
        },
    })
}

fn bit_hints(value: u64, ids: &[Id]) -> Result<Vec<(Id, Scalar)>, String> {
    if ids.len() < 64 && value >> ids.len() != 0 {
        return Err(format!("{value} does not fit in {} bits", ids.len()));
    }
    Ok(ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, from_u64((value >> i) & 1)))
        .collect())
}

impl SignalLayout {
    /// Seeds the solver with the signal values and the decomposition wires
    /// they imply.
    pub fn hints(&self, values: &[(SignalName, Scalar)]) -> Result<Vec<(Id, Scalar)>, String> {
        let value_of = |name: &str| -> Result<Scalar, String> {
            values
                .iter()
                .find(|(signal, _)| *signal == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| format!("no value bound to signal `{name}`"))
        };

        let mut hints = vec![];
        for (name, id) in self.private.iter().chain(&self.public) {
            hints.push((*id, value_of(*name)?));
        }

        let division = &self.division;
        let dividend = to_u64(&value_of(division.dividend)?)
            .ok_or_else(|| format!("`{}` does not fit in 64 bits", division.dividend))?;
        let quotient = to_u64(&value_of(division.quotient)?)
            .ok_or_else(|| format!("`{}` does not fit in 64 bits", division.quotient))?;
        let remainder = u128::from(dividend)
            .checked_sub(u128::from(quotient) * u128::from(division.divisor))
            .filter(|r| *r < u128::from(division.divisor))
            .ok_or_else(|| {
                format!(
                    "`{}` = {quotient} is not `{}` / {} for `{}` = {dividend}",
                    division.quotient, division.dividend, division.divisor, division.dividend
                )
            })? as u64;
        let slack = division.divisor - 1 - remainder;

        hints.push((self.remainder, from_u64(remainder)));
        hints.push((self.slack, from_u64(slack)));
        hints.extend(bit_hints(remainder, &self.remainder_bits)?);
        hints.extend(bit_hints(slack, &self.slack_bits)?);
        hints.extend(bit_hints(quotient, &self.quotient_bits)?);
        Ok(hints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        circuit::{self, solve},
        relation::{NUM_TOKENS, TICKET, TOKEN_ADDRESS, USER_ADDRESS},
    };

    fn cons(value: u64) -> Expression {
        Expression::Constant(value)
    }

    fn sum(exprs: &[Expression]) -> Expression {
        Expression::Sum(exprs.to_vec())
    }

    fn prod(exprs: &[Expression]) -> Expression {
        Expression::Product(exprs.to_vec())
    }

    fn input(id: Id) -> Expression {
        Expression::Input(id)
    }

    fn ceq(v1: usize, v2: CircuitValue) -> Circuit {
        Circuit::Eq(v1, v2)
    }

    fn cadd(v1: usize, v2: CircuitValue, v3: CircuitValue) -> Circuit {
        Circuit::Add(v1, v2, v3)
    }

    fn cmult(v1: usize, v2: CircuitValue, v3: CircuitValue) -> Circuit {
        Circuit::Mult(v1, v2, v3)
    }

    fn cvar(id: usize) -> CircuitValue {
        CircuitValue::Variable(id)
    }

    fn cinput(id: usize) -> CircuitValue {
        CircuitValue::Input(id)
    }

    fn ccons(value: u64) -> CircuitValue {
        CircuitValue::Constant(value)
    }

    fn battle_values(num_tokens: u64, ticket: u64) -> Vec<(SignalName, Scalar)> {
        vec![
            (USER_ADDRESS, Scalar::from(0xabcu32)),
            (TOKEN_ADDRESS, Scalar::from(0xdefu32)),
            (NUM_TOKENS, Scalar::from(num_tokens)),
            (TICKET, Scalar::from(ticket)),
        ]
    }

    #[test]
    fn test_flatten() {
        let mut compiler = Compiler::new_with_counter(10);
        // v0 = i0 * 1 + i1 * 2 + 3
        let expr = eq(
            var(0),
            sum(&[
                prod(&[input(0), cons(1)]),
                prod(&[input(1), cons(2)]),
                cons(3),
            ]),
        );
        assert_eq!(
            compiler.flatten(expr),
            // v10 = i0 * 1
            // v11 = i1 * 2
            // v12 = v10 + v11
            // v13 = v12 + 3
            // v0 = v13
            vec![
                cmult(10, cinput(0), ccons(1)),
                cmult(11, cinput(1), ccons(2)),
                cadd(12, cvar(10), cvar(11)),
                cadd(13, cvar(12), ccons(3)),
                ceq(0, cvar(13)),
            ]
        );
        assert_eq!(compiler.num_vars(), 14);
    }

    #[test]
    fn test_flatten_constant_lhs() {
        let mut compiler = Compiler::new_with_counter(2);
        // 9 = v0 + v1
        assert_eq!(
            compiler.flatten(eq(cons(9), sum(&[var(0), var(1)]))),
            vec![
                cadd(2, cvar(0), cvar(1)),
                ceq(3, ccons(9)),
                ceq(3, cvar(2)),
            ]
        );
    }

    #[test]
    fn test_lower_battle_ticket() {
        let lowered = lower(&Relation::battle_ticket()).unwrap();
        let layout = &lowered.layout;
        assert_eq!(
            layout.private,
            vec![(USER_ADDRESS, 0), (TOKEN_ADDRESS, 1), (NUM_TOKENS, 2)]
        );
        assert_eq!(layout.public, vec![(TICKET, 3)]);
        assert_eq!(layout.remainder_bits.len(), 4);
        assert_eq!(layout.slack_bits.len(), 4);
        assert_eq!(layout.quotient_bits.len(), QUOTIENT_BITS);
        assert_eq!(lowered.num_inputs, 1);
        assert_eq!(circuit::num_inputs(&lowered.circuits), 1);
        // the address signals are declared but unconstrained
        assert_eq!(circuit::num_vars(&lowered.circuits), lowered.num_vars - 2);
        assert_eq!(lowered.circuits[0], ceq(3, cinput(0)));
    }

    #[test]
    fn test_lower_rejects_invalid_relation() {
        let relation = Relation::new(
            crate::relation::RelationId::new("broken"),
            vec![NUM_TOKENS],
            vec![],
            *Relation::battle_ticket().constraint(),
        );
        assert!(lower(&relation).is_err());
    }

    #[test]
    fn test_hints_solve_the_circuit() {
        let lowered = lower(&Relation::battle_ticket()).unwrap();
        for (num_tokens, ticket) in [(30, 3), (35, 3), (9, 0), (0, 0), (u64::MAX, u64::MAX / 10)] {
            let hints = lowered
                .layout
                .hints(&battle_values(num_tokens, ticket))
                .unwrap();
            let vars = solve(
                &lowered.circuits,
                lowered.num_vars,
                &[Scalar::from(ticket)],
                &hints,
            )
            .unwrap();
            assert_eq!(vars[lowered.layout.remainder], Scalar::from(num_tokens % 10));
            assert_eq!(vars[lowered.layout.slack], Scalar::from(9 - num_tokens % 10));
        }
    }

    #[test]
    fn test_hints_reject_wrong_quotient() {
        let layout = lower(&Relation::battle_ticket()).unwrap().layout;
        assert!(layout.hints(&battle_values(30, 4)).is_err());
        assert!(layout.hints(&battle_values(35, 4)).is_err());
        assert!(layout.hints(&battle_values(30, 2)).is_err());

        let mut values = battle_values(30, 3);
        values[3].1 = -Scalar::ONE;
        assert!(layout.hints(&values).is_err());
        values.pop();
        assert!(layout.hints(&values).is_err());
    }

    #[test]
    fn test_public_input_mismatch_is_unsatisfied() {
        let lowered = lower(&Relation::battle_ticket()).unwrap();
        let hints = lowered.layout.hints(&battle_values(30, 3)).unwrap();
        assert!(solve(
            &lowered.circuits,
            lowered.num_vars,
            &[Scalar::from(4u32)],
            &hints
        )
        .is_err());
    }
}
