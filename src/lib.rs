pub mod address;
pub mod backend;
pub mod circuit;
pub mod compiler;
pub mod config;
pub mod error;
pub mod exporter;
pub mod issuer;
pub mod keys;
pub mod r1cs;
pub mod relation;
pub mod scalar;
pub mod witness;

// Operator, Issuer, Holder
//
// Relation(private) -> ticket
// R1CS: Relation(userAddress, tokenAddress, numTokens) = ticket
//
// 1. Operator
// Relation -> Circuit -> R1CS
// R1CS -> Gens, Commitment
// Gens, Commitment -> VerifierArtifact
//
// 2. Issuer
// Holder -> userAddress, tokenAddress, numTokens
// numTokens -> ticket
// R1CS, Assignment, ticket -> Proof
//
// 3. Verifier
// Issuer -> Proof, ticket
// Gens, Commitment, ticket, Proof -> Verify

pub use address::Address;
pub use backend::{SnarkBackend, SpartanBackend};
pub use config::TicketConfig;
pub use error::{BackendError, Result, TicketError};
pub use exporter::{ExportOutcome, VerifierExporter, VERIFIER_ARTIFACT_NAME};
pub use issuer::{IssuedTicket, ProofIssuer};
pub use keys::{KeySetupManager, Keys};
pub use relation::Relation;
