//! Roles and capabilities for the Metro Fare Engine
//!
//! Authorization is a closed role → capability mapping checked at the request
//! boundary (the replay layer here). The settlement engine itself is
//! role-agnostic.

use serde::{Deserialize, Serialize};

/// Acting role of an operator driving the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Back-office administrator; holds every capability
    Admin,

    /// Station staff; may issue cards and top them up
    Staff,

    /// Card holder; may only top up
    Passenger,
}

/// Privileged operations gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Issue a new card
    IssueCard,

    /// Add money to a card
    TopUp,

    /// Return money to a card
    Refund,
}

impl Role {
    /// Whether this role holds the given capability
    ///
    /// Refund is admin-only. Issuing cards requires admin or staff. Top-up is
    /// open to every role.
    pub fn permits(&self, capability: Capability) -> bool {
        match capability {
            Capability::TopUp => true,
            Capability::IssueCard => matches!(self, Role::Admin | Role::Staff),
            Capability::Refund => matches!(self, Role::Admin),
        }
    }

    /// Stable lowercase name used in log fields and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Passenger => "passenger",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Capability {
    /// Stable name used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::IssueCard => "issue-card",
            Capability::TopUp => "top-up",
            Capability::Refund => "refund",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::admin_refund(Role::Admin, Capability::Refund, true)]
    #[case::admin_issue(Role::Admin, Capability::IssueCard, true)]
    #[case::admin_topup(Role::Admin, Capability::TopUp, true)]
    #[case::staff_refund(Role::Staff, Capability::Refund, false)]
    #[case::staff_issue(Role::Staff, Capability::IssueCard, true)]
    #[case::staff_topup(Role::Staff, Capability::TopUp, true)]
    #[case::passenger_refund(Role::Passenger, Capability::Refund, false)]
    #[case::passenger_issue(Role::Passenger, Capability::IssueCard, false)]
    #[case::passenger_topup(Role::Passenger, Capability::TopUp, true)]
    fn test_role_permits(#[case] role: Role, #[case] capability: Capability, #[case] allowed: bool) {
        assert_eq!(role.permits(capability), allowed);
    }
}
