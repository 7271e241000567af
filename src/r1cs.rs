use curve25519_dalek::Scalar;
use libspartan::Instance;
use sha2::{Digest, Sha256};

use crate::{
    circuit::{Circuit, CircuitValue},
    scalar::from_u64,
};

type Entry = (usize, usize, [u8; 32]);

pub struct R1CS {
    pub num_consts: usize,
    pub num_vars: usize,
    pub num_inputs: usize,
    pub num_non_zero_entries: usize,
    /// SHA-256 over the shape and the A, B, C entries.
    pub digest: [u8; 32],
    pub instance: Instance,
}

// Column layout is z = (vars, 1, inputs).
fn push_value(matrix: &mut Vec<Entry>, row: usize, value: CircuitValue, num_vars: usize) {
    let one = Scalar::ONE.to_bytes();
    match value {
        CircuitValue::Constant(con) => matrix.push((row, num_vars, from_u64(con).to_bytes())),
        CircuitValue::Variable(var) => matrix.push((row, var, one)),
        CircuitValue::Input(input) => matrix.push((row, num_vars + 1 + input, one)),
    }
}

fn digest(num_consts: usize, num_vars: usize, num_inputs: usize, matrices: [&[Entry]; 3]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for size in [num_consts, num_vars, num_inputs] {
        hasher.update((size as u64).to_le_bytes());
    }
    for matrix in matrices {
        hasher.update((matrix.len() as u64).to_le_bytes());
        for (row, col, value) in matrix {
            hasher.update((*row as u64).to_le_bytes());
            hasher.update((*col as u64).to_le_bytes());
            hasher.update(value);
        }
    }
    hasher.finalize().into()
}

pub fn into_r1cs(circuits: &[Circuit], num_inputs: usize, num_vars: usize) -> Result<R1CS, String> {
    let mut a: Vec<Entry> = Vec::new();
    let mut b: Vec<Entry> = Vec::new();
    let mut c: Vec<Entry> = Vec::new();

    let num_consts = circuits.len();

    for (i, circuit) in circuits.iter().enumerate() {
        match *circuit {
            // x * 1 = y
            Circuit::Eq(y, x) => {
                push_value(&mut a, i, x, num_vars);
                push_value(&mut b, i, CircuitValue::Constant(1), num_vars);
                push_value(&mut c, i, CircuitValue::Variable(y), num_vars);
            }
            // x1 * x2 = y
            Circuit::Mult(y, x1, x2) => {
                push_value(&mut a, i, x1, num_vars);
                push_value(&mut b, i, x2, num_vars);
                push_value(&mut c, i, CircuitValue::Variable(y), num_vars);
            }
            // (x1 + x2) * 1 = y
            Circuit::Add(y, x1, x2) => {
                push_value(&mut a, i, x1, num_vars);
                push_value(&mut a, i, x2, num_vars);
                push_value(&mut b, i, CircuitValue::Constant(1), num_vars);
                push_value(&mut c, i, CircuitValue::Variable(y), num_vars);
            }
        }
    }

    let instance = Instance::new(num_consts, num_vars, num_inputs, &a, &b, &c)
        .map_err(|err| format!("R1CS instance rejected: {err:?}"))?;

    let num_non_zero_entries = a.len().max(b.len()).max(c.len());
    let digest = digest(
        num_consts,
        num_vars,
        num_inputs,
        [a.as_slice(), b.as_slice(), c.as_slice()],
    );

    Ok(R1CS {
        num_consts,
        num_vars,
        num_inputs,
        num_non_zero_entries,
        digest,
        instance,
    })
}
