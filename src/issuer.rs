use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::{
    address::Address,
    backend::SnarkBackend,
    error::TicketError,
    keys::KeySetupManager,
    scalar::from_u64,
    witness::WitnessAssembler,
};

/// A proof together with the public ticket it was issued for.
pub struct IssuedTicket<P> {
    pub proof: P,
    pub ticket: u64,
}

pub struct ProofIssuer<B: SnarkBackend> {
    keys: Arc<KeySetupManager<B>>,
    assembler: WitnessAssembler,
}

impl<B: SnarkBackend> ProofIssuer<B> {
    pub fn new(keys: Arc<KeySetupManager<B>>) -> Self {
        let assembler = WitnessAssembler::new(keys.relation());
        Self { keys, assembler }
    }

    pub fn keys(&self) -> &KeySetupManager<B> {
        &self.keys
    }

    /// Parses both addresses and issues a ticket proof for `num_tokens`.
    pub fn issue_proof(
        &self,
        user_address: &str,
        token_address: &str,
        num_tokens: i128,
    ) -> Result<IssuedTicket<B::Proof>, TicketError> {
        let user_address: Address = user_address.parse()?;
        let token_address: Address = token_address.parse()?;
        self.issue(&user_address, &token_address, num_tokens)
    }

    #[instrument(skip_all, fields(user = %user_address, token = %token_address))]
    pub fn issue(
        &self,
        user_address: &Address,
        token_address: &Address,
        num_tokens: i128,
    ) -> Result<IssuedTicket<B::Proof>, TicketError> {
        // Input errors surface before the backend is touched.
        let assignment = self
            .assembler
            .assemble(user_address, token_address, num_tokens)?;
        let keys = self.keys.ensure_keys()?;
        let backend = self.keys.backend();

        let public_inputs = assignment.public_inputs();
        let witness = backend
            .build_witness(&keys.constraint_system, &assignment, &public_inputs)
            .map_err(|err| {
                warn!("witness construction failed: {err}");
                TicketError::WitnessConstruction(err)
            })?;
        debug!("built witness");

        let proof = backend
            .prove(&keys.constraint_system, &keys.proving_key, witness)
            .map_err(|err| {
                warn!("proving failed: {err}");
                TicketError::Proving(err)
            })?;

        info!(ticket = assignment.ticket(), "issued battle ticket proof");
        Ok(IssuedTicket {
            proof,
            ticket: assignment.ticket(),
        })
    }

    /// Checks `proof` against the cached verifying key for a claimed ticket.
    pub fn verify(&self, proof: &B::Proof, ticket: u64) -> Result<bool, TicketError> {
        let keys = self.keys.ensure_keys()?;
        self.keys
            .backend()
            .verify(&keys.verifying_key, proof, &[from_u64(ticket)])
            .map_err(TicketError::Verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::testing::CountingBackend, relation::Relation};

    const DEMO: &str = "0x35134987bB541607Cd45e62Dd1feA4F587607817";

    fn issuer() -> ProofIssuer<CountingBackend> {
        ProofIssuer::new(Arc::new(KeySetupManager::new(
            Arc::new(CountingBackend::default()),
            Relation::battle_ticket(),
        )))
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let issued = issuer.issue_proof(DEMO, DEMO, 30).unwrap();
        assert_eq!(issued.ticket, 3);
        assert!(issuer.verify(&issued.proof, 3).unwrap());
        assert!(!issuer.verify(&issued.proof, 4).unwrap());
    }

    #[test]
    fn test_retries_reuse_keys() {
        let issuer = issuer();
        for (num_tokens, ticket) in [(35, 3), (9, 0), (120, 12)] {
            let issued = issuer.issue_proof(DEMO, DEMO, num_tokens).unwrap();
            assert_eq!(issued.ticket, ticket);
            assert!(issuer.verify(&issued.proof, ticket).unwrap());
        }
        assert_eq!(issuer.keys().backend().setups(), 1);
        assert_eq!(issuer.keys().backend().proves(), 3);
    }

    #[test]
    fn test_invalid_input_never_reaches_backend() {
        let issuer = issuer();
        assert!(matches!(
            issuer.issue_proof(DEMO, DEMO, -1),
            Err(TicketError::InvalidInput(_))
        ));
        assert!(matches!(
            issuer.issue_proof("0xabc", DEMO, 30),
            Err(TicketError::InvalidInput(_))
        ));
        let backend = issuer.keys().backend();
        assert_eq!(backend.compiles(), 0);
        assert_eq!(backend.setups(), 0);
        assert_eq!(backend.proves(), 0);
        assert!(issuer.keys().cached().is_none());
    }

    #[test]
    fn test_setup_failure_then_recovery() {
        let issuer = ProofIssuer::new(Arc::new(KeySetupManager::new(
            Arc::new(CountingBackend::failing_setups(1)),
            Relation::battle_ticket(),
        )));
        assert!(matches!(
            issuer.issue_proof(DEMO, DEMO, 30),
            Err(TicketError::Setup(_))
        ));
        let issued = issuer.issue_proof(DEMO, DEMO, 30).unwrap();
        assert_eq!(issued.ticket, 3);
    }
}
