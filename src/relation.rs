use std::fmt;

pub type SignalName = &'static str;

pub const USER_ADDRESS: SignalName = "userAddress";
pub const TOKEN_ADDRESS: SignalName = "tokenAddress";
pub const NUM_TOKENS: SignalName = "numTokens";
pub const TICKET: SignalName = "ticket";

/// One ticket per this many tokens.
pub const TICKET_DIVISOR: u64 = 10;

/// Width of the range check on the quotient. Keeps `divisor * quotient + remainder`
/// far below the field modulus so the field equation is plain integer division.
pub const QUOTIENT_BITS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId(&'static str);

impl RelationId {
    pub const BATTLE_TICKET: RelationId = RelationId("battle-ticket/v1");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// `quotient == dividend / divisor`, truncating toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncatedDivision {
    pub quotient: SignalName,
    pub dividend: SignalName,
    pub divisor: u64,
}

impl TruncatedDivision {
    /// The integer semantics the compiled constraint enforces.
    pub fn evaluate(&self, dividend: u64) -> u64 {
        dividend / self.divisor
    }

    /// Bits needed to range check a remainder in `0..divisor`.
    pub fn remainder_bits(&self) -> usize {
        (u64::BITS - (self.divisor - 1).leading_zeros()) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    id: RelationId,
    private_signals: Vec<SignalName>,
    public_signals: Vec<SignalName>,
    constraint: TruncatedDivision,
}

impl Relation {
    /// Builds a relation without checking it; `validate` runs at compile time.
    pub fn new(
        id: RelationId,
        private_signals: Vec<SignalName>,
        public_signals: Vec<SignalName>,
        constraint: TruncatedDivision,
    ) -> Self {
        Self {
            id,
            private_signals,
            public_signals,
            constraint,
        }
    }

    pub fn battle_ticket() -> Self {
        Self::new(
            RelationId::BATTLE_TICKET,
            vec![USER_ADDRESS, TOKEN_ADDRESS, NUM_TOKENS],
            vec![TICKET],
            TruncatedDivision {
                quotient: TICKET,
                dividend: NUM_TOKENS,
                divisor: TICKET_DIVISOR,
            },
        )
    }

    pub fn id(&self) -> RelationId {
        self.id
    }

    pub fn private_signals(&self) -> &[SignalName] {
        &self.private_signals
    }

    pub fn public_signals(&self) -> &[SignalName] {
        &self.public_signals
    }

    pub fn constraint(&self) -> &TruncatedDivision {
        &self.constraint
    }

    pub fn is_public(&self, name: &str) -> bool {
        self.public_signals.iter().any(|s| *s == name)
    }

    pub fn is_private(&self, name: &str) -> bool {
        self.private_signals.iter().any(|s| *s == name)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.public_signals.is_empty() {
            return Err(format!("relation {} declares no public signal", self.id));
        }
        let mut seen: Vec<SignalName> = Vec::new();
        for name in self.private_signals.iter().chain(&self.public_signals) {
            if seen.contains(name) {
                return Err(format!(
                    "signal `{name}` is declared more than once in relation {}",
                    self.id
                ));
            }
            seen.push(*name);
        }
        if !self.is_private(self.constraint.dividend) {
            return Err(format!(
                "dividend `{}` must be a private signal",
                self.constraint.dividend
            ));
        }
        if !self.is_public(self.constraint.quotient) {
            return Err(format!(
                "quotient `{}` must be a public signal",
                self.constraint.quotient
            ));
        }
        if self.constraint.divisor < 2 {
            return Err(format!(
                "divisor must be at least 2, got {}",
                self.constraint.divisor
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battle_ticket_relation() {
        let relation = Relation::battle_ticket();
        assert_eq!(relation.validate(), Ok(()));
        assert_eq!(
            relation.private_signals(),
            &[USER_ADDRESS, TOKEN_ADDRESS, NUM_TOKENS]
        );
        assert_eq!(relation.public_signals(), &[TICKET]);
        assert!(relation.is_public(TICKET));
        assert!(!relation.is_public(NUM_TOKENS));
    }

    #[test]
    fn test_truncated_division() {
        let division = Relation::battle_ticket().constraint;
        assert_eq!(division.evaluate(30), 3);
        assert_eq!(division.evaluate(35), 3);
        assert_eq!(division.evaluate(39), 3);
        assert_eq!(division.evaluate(9), 0);
        assert_eq!(division.evaluate(0), 0);
        assert_eq!(division.evaluate(u64::MAX), u64::MAX / 10);
    }

    #[test]
    fn test_remainder_bits() {
        let mut division = Relation::battle_ticket().constraint;
        assert_eq!(division.remainder_bits(), 4);
        division.divisor = 2;
        assert_eq!(division.remainder_bits(), 1);
        division.divisor = 16;
        assert_eq!(division.remainder_bits(), 4);
        division.divisor = 17;
        assert_eq!(division.remainder_bits(), 5);
    }

    #[test]
    fn test_validate_rejects_overlapping_signals() {
        let relation = Relation::new(
            RelationId::new("overlap"),
            vec![NUM_TOKENS, TICKET],
            vec![TICKET],
            TruncatedDivision {
                quotient: TICKET,
                dividend: NUM_TOKENS,
                divisor: 10,
            },
        );
        assert!(relation.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_constraint() {
        let private_quotient = Relation::new(
            RelationId::new("private-quotient"),
            vec![NUM_TOKENS, TICKET],
            vec![USER_ADDRESS],
            TruncatedDivision {
                quotient: TICKET,
                dividend: NUM_TOKENS,
                divisor: 10,
            },
        );
        assert!(private_quotient.validate().is_err());

        let mut unit_divisor = Relation::battle_ticket();
        unit_divisor.constraint.divisor = 1;
        assert!(unit_divisor.validate().is_err());
    }
}
