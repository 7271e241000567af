//! Capabilities the issuance pipeline needs from a SNARK proof system.
//!
//! The pipeline never looks inside the associated types: it compiles the
//! relation once, derives a key pair once, then builds witnesses and proofs
//! against that cached material.

pub mod spartan;

use curve25519_dalek::Scalar;

use crate::{error::BackendError, relation::Relation, witness::Assignment};

pub use spartan::SpartanBackend;

pub trait SnarkBackend: Send + Sync {
    type ConstraintSystem: Send + Sync;
    type ProvingKey: Send + Sync;
    type VerifyingKey: Send + Sync;
    type Witness;
    type Proof;

    fn compile(&self, relation: &Relation) -> Result<Self::ConstraintSystem, BackendError>;

    fn setup(
        &self,
        cs: &Self::ConstraintSystem,
    ) -> Result<(Self::ProvingKey, Self::VerifyingKey), BackendError>;

    /// Materializes `assignment` for proving. `public_inputs` are in the
    /// relation's public signal order and must agree with the assignment.
    fn build_witness(
        &self,
        cs: &Self::ConstraintSystem,
        assignment: &Assignment,
        public_inputs: &[Scalar],
    ) -> Result<Self::Witness, BackendError>;

    fn prove(
        &self,
        cs: &Self::ConstraintSystem,
        pk: &Self::ProvingKey,
        witness: Self::Witness,
    ) -> Result<Self::Proof, BackendError>;

    /// `Ok(false)` means the proof was checked and rejected.
    fn verify(
        &self,
        vk: &Self::VerifyingKey,
        proof: &Self::Proof,
        public_inputs: &[Scalar],
    ) -> Result<bool, BackendError>;

    /// Verifier contract source. Must be a pure function of `vk`.
    fn export_verifier_artifact(&self, vk: &Self::VerifyingKey) -> Result<Vec<u8>, BackendError>;
}
