use std::sync::Arc;

use curve25519_dalek::Scalar;
use libspartan::{
    ComputationCommitment, ComputationDecommitment, InputsAssignment, SNARKGens, VarsAssignment,
    SNARK,
};
use bincode::Options;
use merlin::Transcript;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{
    circuit::solve,
    compiler::{lower, Lowered},
    error::BackendError,
    r1cs::{into_r1cs, R1CS},
    relation::{Relation, RelationId},
    witness::Assignment,
};

use super::SnarkBackend;

pub const TRANSCRIPT_LABEL: &[u8] = b"battle-ticket";
pub const DEFAULT_CONTRACT_NAME: &str = "BattleTicketVerifier";

/// Upper bound on an encoded proof. Ticket proofs are a few tens of KiB.
pub const MAX_PROOF_BYTES: u64 = 1 << 20;

// Same wire format as `bincode::serialize`, with a length limit.
fn proof_codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_PROOF_BYTES)
}

fn to_bytes(values: &[Scalar]) -> Vec<[u8; 32]> {
    values.iter().map(|x| x.to_bytes()).collect()
}

pub struct SpartanConstraintSystem {
    relation: RelationId,
    lowered: Lowered,
    r1cs: R1CS,
}

impl SpartanConstraintSystem {
    pub fn relation(&self) -> RelationId {
        self.relation
    }

    pub fn num_constraints(&self) -> usize {
        self.r1cs.num_consts
    }

    pub fn num_vars(&self) -> usize {
        self.r1cs.num_vars
    }

    pub fn num_inputs(&self) -> usize {
        self.r1cs.num_inputs
    }

    pub fn digest(&self) -> [u8; 32] {
        self.r1cs.digest
    }
}

pub struct SpartanProvingKey {
    gens: Arc<SNARKGens>,
    commitment: Arc<ComputationCommitment>,
    decommitment: ComputationDecommitment,
}

/// Everything the verifier contract pins about a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyShape {
    pub relation: String,
    pub num_constraints: usize,
    pub num_vars: usize,
    pub num_inputs: usize,
    pub num_non_zero_entries: usize,
    pub divisor: u64,
    pub r1cs_digest: [u8; 32],
    pub transcript_label: Vec<u8>,
}

impl KeyShape {
    pub fn digest(&self) -> Result<[u8; 32], BackendError> {
        let encoded = bincode::serialize(self)
            .map_err(|err| BackendError::new(format!("failed to encode key shape: {err}")))?;
        Ok(Sha256::digest(&encoded).into())
    }
}

pub struct SpartanVerifyingKey {
    gens: Arc<SNARKGens>,
    commitment: Arc<ComputationCommitment>,
    shape: KeyShape,
}

impl SpartanVerifyingKey {
    pub fn shape(&self) -> &KeyShape {
        &self.shape
    }
}

pub struct SpartanWitness {
    vars: VarsAssignment,
    inputs: InputsAssignment,
}

pub struct SpartanProof {
    snark: SNARK,
}

impl SpartanProof {
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        proof_codec().serialize(&self.snark)
    }

    /// Rejects inputs whose decoding would exceed `MAX_PROOF_BYTES`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        Ok(Self {
            snark: proof_codec().deserialize(bytes)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpartanBackend {
    contract_name: String,
}

impl Default for SpartanBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CONTRACT_NAME)
    }
}

impl SpartanBackend {
    pub fn new(contract_name: impl Into<String>) -> Self {
        Self {
            contract_name: contract_name.into(),
        }
    }

    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn render_verifier(contract_name: &str, shape: &KeyShape, key_digest: &[u8; 32]) -> String {
    format!(
        r#"// SPDX-License-Identifier: MIT
// Generated from the {relation} verifying key. Do not edit.
pragma solidity ^0.8.20;

/// @notice Pins the Spartan verifying key battle tickets are proven against.
/// @dev This contract does not verify proofs. Proofs are checked off-chain
/// against the key whose digest is pinned here.
contract {contract_name} {{
    string public constant RELATION = "{relation}";
    bytes32 public constant VERIFYING_KEY_DIGEST = 0x{key_digest};
    bytes32 public constant R1CS_DIGEST = 0x{r1cs_digest};
    uint256 public constant NUM_CONSTRAINTS = {num_constraints};
    uint256 public constant NUM_VARIABLES = {num_vars};
    uint256 public constant NUM_PUBLIC_INPUTS = {num_inputs};
    uint256 public constant NUM_NON_ZERO_ENTRIES = {num_non_zero_entries};
    uint256 public constant TICKET_DIVISOR = {divisor};

    function matchesKey(bytes32 keyDigest) external pure returns (bool) {{
        return keyDigest == VERIFYING_KEY_DIGEST;
    }}
}}
"#,
        relation = shape.relation,
        key_digest = hex::encode(key_digest),
        r1cs_digest = hex::encode(shape.r1cs_digest),
        num_constraints = shape.num_constraints,
        num_vars = shape.num_vars,
        num_inputs = shape.num_inputs,
        num_non_zero_entries = shape.num_non_zero_entries,
        divisor = shape.divisor,
    )
}

impl SnarkBackend for SpartanBackend {
    type ConstraintSystem = SpartanConstraintSystem;
    type ProvingKey = SpartanProvingKey;
    type VerifyingKey = SpartanVerifyingKey;
    type Witness = SpartanWitness;
    type Proof = SpartanProof;

    fn compile(&self, relation: &Relation) -> Result<SpartanConstraintSystem, BackendError> {
        let lowered = lower(relation).map_err(BackendError::new)?;
        let r1cs = into_r1cs(&lowered.circuits, lowered.num_inputs, lowered.num_vars)
            .map_err(BackendError::new)?;
        debug!(
            relation = %relation.id(),
            num_constraints = r1cs.num_consts,
            num_vars = r1cs.num_vars,
            num_inputs = r1cs.num_inputs,
            "compiled relation"
        );
        Ok(SpartanConstraintSystem {
            relation: relation.id(),
            lowered,
            r1cs,
        })
    }

    fn setup(
        &self,
        cs: &SpartanConstraintSystem,
    ) -> Result<(SpartanProvingKey, SpartanVerifyingKey), BackendError> {
        let r1cs = &cs.r1cs;
        let gens = Arc::new(SNARKGens::new(
            r1cs.num_consts,
            r1cs.num_vars,
            r1cs.num_inputs,
            r1cs.num_non_zero_entries,
        ));
        let (comm, decomm) = SNARK::encode(&r1cs.instance, &gens);
        let commitment = Arc::new(comm);

        let shape = KeyShape {
            relation: cs.relation.to_string(),
            num_constraints: r1cs.num_consts,
            num_vars: r1cs.num_vars,
            num_inputs: r1cs.num_inputs,
            num_non_zero_entries: r1cs.num_non_zero_entries,
            divisor: cs.lowered.layout.division.divisor,
            r1cs_digest: r1cs.digest,
            transcript_label: TRANSCRIPT_LABEL.to_vec(),
        };

        Ok((
            SpartanProvingKey {
                gens: Arc::clone(&gens),
                commitment: Arc::clone(&commitment),
                decommitment: decomm,
            },
            SpartanVerifyingKey {
                gens,
                commitment,
                shape,
            },
        ))
    }

    fn build_witness(
        &self,
        cs: &SpartanConstraintSystem,
        assignment: &Assignment,
        public_inputs: &[Scalar],
    ) -> Result<SpartanWitness, BackendError> {
        let lowered = &cs.lowered;
        if public_inputs.len() != lowered.num_inputs {
            return Err(BackendError::new(format!(
                "expected {} public inputs, got {}",
                lowered.num_inputs,
                public_inputs.len()
            )));
        }
        for ((name, _), input) in lowered.layout.public.iter().zip(public_inputs) {
            if assignment.get(name) != Some(*input) {
                return Err(BackendError::new(format!(
                    "public input for `{name}` disagrees with the assignment"
                )));
            }
        }

        let hints = lowered
            .layout
            .hints(assignment.values())
            .map_err(BackendError::new)?;
        let vars = solve(&lowered.circuits, lowered.num_vars, public_inputs, &hints)
            .map_err(BackendError::new)?;

        let vars = VarsAssignment::new(&to_bytes(&vars))
            .map_err(|err| BackendError::new(format!("invalid variable assignment: {err:?}")))?;
        let inputs = InputsAssignment::new(&to_bytes(public_inputs))
            .map_err(|err| BackendError::new(format!("invalid input assignment: {err:?}")))?;
        Ok(SpartanWitness { vars, inputs })
    }

    fn prove(
        &self,
        cs: &SpartanConstraintSystem,
        pk: &SpartanProvingKey,
        witness: SpartanWitness,
    ) -> Result<SpartanProof, BackendError> {
        // SNARK::prove does not check satisfiability itself
        match cs.r1cs.instance.is_sat(&witness.vars, &witness.inputs) {
            Ok(true) => {}
            Ok(false) => {
                return Err(BackendError::new(
                    "witness does not satisfy the constraint system",
                ))
            }
            Err(err) => return Err(BackendError::new(format!("{err:?}"))),
        }

        let mut transcript = Transcript::new(TRANSCRIPT_LABEL);
        let snark = SNARK::prove(
            &cs.r1cs.instance,
            &pk.commitment,
            &pk.decommitment,
            witness.vars,
            &witness.inputs,
            &pk.gens,
            &mut transcript,
        );
        Ok(SpartanProof { snark })
    }

    fn verify(
        &self,
        vk: &SpartanVerifyingKey,
        proof: &SpartanProof,
        public_inputs: &[Scalar],
    ) -> Result<bool, BackendError> {
        if public_inputs.len() != vk.shape.num_inputs {
            return Err(BackendError::new(format!(
                "expected {} public inputs, got {}",
                vk.shape.num_inputs,
                public_inputs.len()
            )));
        }
        let inputs = InputsAssignment::new(&to_bytes(public_inputs))
            .map_err(|err| BackendError::new(format!("invalid input assignment: {err:?}")))?;
        let mut transcript = Transcript::new(TRANSCRIPT_LABEL);
        match proof
            .snark
            .verify(&vk.commitment, &inputs, &mut transcript, &vk.gens)
        {
            Ok(()) => Ok(true),
            Err(err) => {
                debug!("proof rejected: {:?}", err);
                Ok(false)
            }
        }
    }

    fn export_verifier_artifact(&self, vk: &SpartanVerifyingKey) -> Result<Vec<u8>, BackendError> {
        if !is_identifier(&self.contract_name) {
            return Err(BackendError::new(format!(
                "`{}` is not a valid contract name",
                self.contract_name
            )));
        }
        let key_digest = vk.shape.digest()?;
        Ok(render_verifier(&self.contract_name, &vk.shape, &key_digest).into_bytes())
    }
}
