use curve25519_dalek::Scalar;
use tracing::debug;

use crate::{
    address::Address,
    error::{BackendError, TicketError},
    relation::{Relation, SignalName, TruncatedDivision, NUM_TOKENS, TICKET, TOKEN_ADDRESS, USER_ADDRESS},
    scalar::from_u64,
};

/// A value for every signal of one request, private signals first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    values: Vec<(SignalName, Scalar)>,
    public: Vec<SignalName>,
    ticket: u64,
}

impl Assignment {
    pub fn values(&self) -> &[(SignalName, Scalar)] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<Scalar> {
        self.values
            .iter()
            .find(|(signal, _)| *signal == name)
            .map(|(_, value)| *value)
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Public signal values in the relation's declared order.
    pub fn public_inputs(&self) -> Vec<Scalar> {
        self.public
            .iter()
            .filter_map(|name| self.get(name))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn with_value(mut self, name: &str, value: Scalar) -> Self {
        for (signal, slot) in self.values.iter_mut() {
            if *signal == name {
                *slot = value;
            }
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct WitnessAssembler {
    private: Vec<SignalName>,
    public: Vec<SignalName>,
    division: TruncatedDivision,
}

impl WitnessAssembler {
    pub fn new(relation: &Relation) -> Self {
        Self {
            private: relation.private_signals().to_vec(),
            public: relation.public_signals().to_vec(),
            division: *relation.constraint(),
        }
    }

    /// Binds the request to every relation signal. The ticket is computed with
    /// the relation's own division, so the result satisfies it by construction.
    pub fn assemble(
        &self,
        user_address: &Address,
        token_address: &Address,
        num_tokens: i128,
    ) -> Result<Assignment, TicketError> {
        if num_tokens < 0 {
            return Err(TicketError::InvalidInput(format!(
                "token balance must be non-negative, got {num_tokens}"
            )));
        }
        let num_tokens = u64::try_from(num_tokens).map_err(|_| {
            TicketError::InvalidInput(format!(
                "token balance {num_tokens} exceeds the supported maximum {}",
                u64::MAX
            ))
        })?;
        let ticket = self.division.evaluate(num_tokens);

        let value_of = |name: SignalName| -> Result<Scalar, TicketError> {
            match name {
                USER_ADDRESS => Ok(user_address.to_scalar()),
                TOKEN_ADDRESS => Ok(token_address.to_scalar()),
                NUM_TOKENS => Ok(from_u64(num_tokens)),
                TICKET => Ok(from_u64(ticket)),
                other => Err(TicketError::WitnessConstruction(BackendError::new(format!(
                    "no request value for signal `{other}`"
                )))),
            }
        };
        let values = self
            .private
            .iter()
            .chain(&self.public)
            .map(|name| Ok((*name, value_of(*name)?)))
            .collect::<Result<Vec<_>, TicketError>>()?;

        debug!(num_tokens, ticket, "assembled ticket assignment");
        Ok(Assignment {
            values,
            public: self.public.clone(),
            ticket,
        })
    }
}
