//! Capability checks for administrators and sources.
//!
//! Access control is a plain capability set: one administrator and an
//! allow-list of sources. Components ask a single question ("may this
//! principal do X?") through [`AccessControl::require_admin`] or
//! [`AccessControl::require_source`]; nothing inherits from it.
//!
//! The administrator is never the null principal. Construction rejects a
//! null deployer and [`AccessControl::set_admin`] rejects a null successor.

use std::collections::BTreeSet;

use crate::error::OracleError;
use crate::principal::Principal;

/// Administrator plus source allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControl {
    admin: Principal,
    sources: BTreeSet<Principal>,
}

impl AccessControl {
    /// Creates the capability set with `deployer` as administrator.
    ///
    /// The deployer is also authorized as a source.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::InvalidArgument` if `deployer` is null.
    pub fn new(deployer: Principal) -> Result<Self, OracleError> {
        if deployer.is_null() {
            return Err(OracleError::invalid_argument(
                "administrator must not be the null principal",
            ));
        }
        let mut sources = BTreeSet::new();
        sources.insert(deployer.clone());
        Ok(Self {
            admin: deployer,
            sources,
        })
    }

    /// Returns the current administrator.
    #[must_use]
    pub const fn admin(&self) -> &Principal {
        &self.admin
    }

    /// Returns `true` if `principal` is the administrator.
    #[must_use]
    pub fn is_admin(&self, principal: &Principal) -> bool {
        !principal.is_null() && *principal == self.admin
    }

    /// Returns `true` if `principal` may submit severities.
    #[must_use]
    pub fn is_source(&self, principal: &Principal) -> bool {
        self.sources.contains(principal)
    }

    /// Iterates over the authorized sources in identity order.
    pub fn sources(&self) -> impl Iterator<Item = &Principal> {
        self.sources.iter()
    }

    /// Fails unless `caller` is the administrator.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::Unauthorized` naming `action`.
    pub fn require_admin(
        &self,
        caller: &Principal,
        action: &'static str,
    ) -> Result<(), OracleError> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            Err(OracleError::unauthorized(caller, action))
        }
    }

    /// Fails unless `caller` is an authorized source.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::Unauthorized`.
    pub fn require_source(&self, caller: &Principal) -> Result<(), OracleError> {
        if self.is_source(caller) {
            Ok(())
        } else {
            Err(OracleError::unauthorized(caller, "submit severity"))
        }
    }

    /// Replaces the administrator.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::Unauthorized` if `caller` is not the current
    /// administrator, or `OracleError::InvalidArgument` if `new_admin` is
    /// null.
    pub fn set_admin(
        &mut self,
        caller: &Principal,
        new_admin: Principal,
    ) -> Result<(), OracleError> {
        self.require_admin(caller, "set admin")?;
        if new_admin.is_null() {
            return Err(OracleError::invalid_argument(
                "administrator must not be the null principal",
            ));
        }
        self.admin = new_admin;
        Ok(())
    }

    /// Grants or revokes submission rights for `source`.
    ///
    /// Setting a membership that already holds is a successful no-op.
    /// Returns `true` if the membership changed.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::Unauthorized` if `caller` is not the
    /// administrator, or `OracleError::InvalidArgument` if `source` is null.
    pub fn set_source(
        &mut self,
        caller: &Principal,
        source: Principal,
        allowed: bool,
    ) -> Result<bool, OracleError> {
        self.require_admin(caller, "set source")?;
        if source.is_null() {
            return Err(OracleError::invalid_argument(
                "source must not be the null principal",
            ));
        }
        Ok(if allowed {
            self.sources.insert(source)
        } else {
            self.sources.remove(&source)
        })
    }
}
