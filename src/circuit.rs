use std::collections::HashSet;

use curve25519_dalek::Scalar;
use serde::{Deserialize, Serialize};

use crate::{compiler::Id, scalar::from_u64};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Circuit {
    // x = a
    Eq(Id, CircuitValue),
    // x = a * b
    Mult(Id, CircuitValue, CircuitValue),
    // x = a + b
    Add(Id, CircuitValue, CircuitValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum CircuitValue {
    Variable(Id),
    Input(Id),
    Constant(u64),
}

impl Circuit {
    pub fn output(&self) -> Id {
        match *self {
            Circuit::Eq(id, _) | Circuit::Mult(id, _, _) | Circuit::Add(id, _, _) => id,
        }
    }
}

pub fn num_vars(circuits: &[Circuit]) -> usize {
    let mut variables = HashSet::new();

    for circuit in circuits {
        match circuit {
            Circuit::Eq(id, value) => {
                variables.insert(*id);
                if let CircuitValue::Variable(var_id) = value {
                    variables.insert(*var_id);
                }
            }
            Circuit::Add(id, value1, value2) | Circuit::Mult(id, value1, value2) => {
                variables.insert(*id);
                if let CircuitValue::Variable(var_id) = value1 {
                    variables.insert(*var_id);
                }
                if let CircuitValue::Variable(var_id) = value2 {
                    variables.insert(*var_id);
                }
            }
        }
    }

    variables.len()
}

pub fn num_inputs(circuits: &[Circuit]) -> usize {
    circuits
        .iter()
        .filter_map(|c| match c {
            Circuit::Eq(_, CircuitValue::Input(id))
            | Circuit::Add(_, CircuitValue::Input(id), _)
            | Circuit::Mult(_, CircuitValue::Input(id), _)
            | Circuit::Add(_, _, CircuitValue::Input(id))
            | Circuit::Mult(_, _, CircuitValue::Input(id)) => Some(*id),
            _ => None,
        })
        .max()
        .map(|max_id| max_id + 1)
        .unwrap_or(0)
}

/// Assigns every variable by walking the gates in order.
///
/// `hints` seed the variables no gate defines (the private signals and the
/// decomposition wires). A gate whose output is already assigned is checked
/// instead, so a successful solve means every gate holds.
pub fn solve(
    circuits: &[Circuit],
    num_vars: usize,
    inputs: &[Scalar],
    hints: &[(Id, Scalar)],
) -> Result<Vec<Scalar>, String> {
    let mut values: Vec<Option<Scalar>> = vec![None; num_vars];
    for &(id, value) in hints {
        let slot = values
            .get_mut(id)
            .ok_or_else(|| format!("hint for unknown variable v{id}"))?;
        *slot = Some(value);
    }

    for (row, circuit) in circuits.iter().enumerate() {
        let read = |value: &CircuitValue| -> Result<Scalar, String> {
            match *value {
                CircuitValue::Variable(id) => values
                    .get(id)
                    .copied()
                    .flatten()
                    .ok_or_else(|| format!("gate {row} reads v{id} before it is assigned")),
                CircuitValue::Input(id) => inputs
                    .get(id)
                    .copied()
                    .ok_or_else(|| format!("gate {row} reads missing input i{id}")),
                CircuitValue::Constant(con) => Ok(from_u64(con)),
            }
        };
        let computed = match circuit {
            Circuit::Eq(_, x) => read(x)?,
            Circuit::Add(_, x1, x2) => read(x1)? + read(x2)?,
            Circuit::Mult(_, x1, x2) => read(x1)? * read(x2)?,
        };
        let out = circuit.output();
        let slot = values
            .get_mut(out)
            .ok_or_else(|| format!("gate {row} writes unknown variable v{out}"))?;
        match slot {
            Some(existing) if *existing != computed => {
                return Err(format!("gate {row} is not satisfied: {circuit:?}"));
            }
            Some(_) => {}
            None => *slot = Some(computed),
        }
    }

    values
        .into_iter()
        .enumerate()
        .map(|(id, value)| value.ok_or_else(|| format!("v{id} is never assigned")))
        .collect()
}
