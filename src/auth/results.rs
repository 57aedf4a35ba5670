//! Authentication result types

/// Outcome of a credential check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Accepted,
    Rejected,
}

impl AuthDecision {
    pub fn is_accepted(self) -> bool {
        self == AuthDecision::Accepted
    }
}
