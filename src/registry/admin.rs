use rust_decimal::Decimal;

use super::{Registry, RegistryError, Role};
use crate::models::{Identity, RegistryEvent};

/// Owner-gated configuration and treasury operations. None of these touch
/// market records.
impl Registry {
    fn require_owner(&self, caller: &Identity) -> Result<(), RegistryError> {
        if caller != &self.state.owner {
            return Err(RegistryError::Unauthorized {
                required: Role::Owner,
            });
        }
        Ok(())
    }

    pub fn set_fee(&mut self, new_fee: Decimal, caller: &Identity) -> Result<(), RegistryError> {
        self.require_owner(caller)?;
        if new_fee < Decimal::ZERO {
            return Err(RegistryError::InvalidFee(new_fee));
        }

        let old = std::mem::replace(&mut self.state.fee, new_fee);
        let now = self.clock.now();
        self.commit(RegistryEvent::FeeUpdated { old, new: new_fee }, now);

        tracing::info!(old = %old, new = %new_fee, "Creation fee updated");
        Ok(())
    }

    pub fn set_resolver(
        &mut self,
        new_resolver: Identity,
        caller: &Identity,
    ) -> Result<(), RegistryError> {
        self.require_owner(caller)?;
        if new_resolver.is_zero() {
            return Err(RegistryError::ZeroIdentity);
        }

        let old = std::mem::replace(&mut self.state.resolver, new_resolver.clone());
        let now = self.clock.now();
        tracing::info!(old = %old, new = %new_resolver, "Resolver rotated");
        self.commit(
            RegistryEvent::ResolverUpdated {
                old,
                new: new_resolver,
            },
            now,
        );
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        new_owner: Identity,
        caller: &Identity,
    ) -> Result<(), RegistryError> {
        self.require_owner(caller)?;
        if new_owner.is_zero() {
            return Err(RegistryError::ZeroIdentity);
        }

        let old = std::mem::replace(&mut self.state.owner, new_owner.clone());
        let now = self.clock.now();
        tracing::info!(old = %old, new = %new_owner, "Ownership transferred");
        self.commit(
            RegistryEvent::OwnershipTransferred {
                old,
                new: new_owner,
            },
            now,
        );
        Ok(())
    }

    /// Pay `amount` of the collected balance out to `to`. The balance is only
    /// debited once the payout backend has accepted the transfer.
    pub fn withdraw(
        &mut self,
        to: Identity,
        amount: Decimal,
        caller: &Identity,
    ) -> Result<(), RegistryError> {
        self.require_owner(caller)?;
        if to.is_zero() {
            return Err(RegistryError::ZeroIdentity);
        }
        if amount <= Decimal::ZERO {
            return Err(RegistryError::InvalidAmount(amount));
        }
        if amount > self.state.balance {
            return Err(RegistryError::InsufficientBalance {
                requested: amount,
                available: self.state.balance,
            });
        }

        self.payout
            .transfer(&to, amount)
            .map_err(|e| RegistryError::TransferFailed {
                to: to.clone(),
                reason: e.to_string(),
            })?;

        self.state.balance -= amount;
        self.state.surplus_retained = self.state.surplus_retained.min(self.state.balance);
        let now = self.clock.now();
        tracing::info!(
            to = %to,
            amount = %amount,
            remaining = %self.state.balance,
            "Fees withdrawn"
        );
        self.commit(RegistryEvent::FeesWithdrawn { to, amount }, now);
        Ok(())
    }
}
