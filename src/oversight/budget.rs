use anyhow::Result;
use tracing::info;

use super::hierarchy::{descendants_deepest_first, is_ancestor};
use super::Controller;
use crate::error::PolicyError;
use crate::fs::SessionMap;
use crate::models::session::Session;

/// One row of `budget show`
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetLine {
    pub name: String,
    pub budget_usd: Option<f64>,
    pub spend_usd: f64,
    pub remaining_usd: Option<f64>,
    /// Own spend plus every descendant's
    pub subtree_spend_usd: f64,
}

fn check_amount(amount: f64, allow_zero: bool) -> Result<()> {
    let ok = amount.is_finite() && (amount > 0.0 || (allow_zero && amount == 0.0));
    if !ok {
        return Err(PolicyError::InvalidAmount(amount.to_string()).into());
    }
    Ok(())
}

impl Controller {
    /// Set a session's budget; zero clears it.
    pub fn set_budget(&self, name: &str, amount: f64) -> Result<Session> {
        check_amount(amount, true)?;
        self.registry.update(name, |session| {
            session.budget_usd = (amount > 0.0).then_some(amount);
            Ok(session.clone())
        })
    }

    /// Move `amount` of budget from `source` to its descendant `target`.
    ///
    /// An unlimited source simply sets the target's budget. A limited
    /// source must have at least `amount` unspent. On any error neither
    /// session changes.
    ///
    /// # Arguments
    ///
    /// * `source` - Direct or transitive ancestor of `target`
    /// * `target` - Receiving session
    /// * `amount` - Positive USD amount
    ///
    /// # Returns
    ///
    /// `Ok(())` once both budgets are updated. Fails with `NotAncestor`,
    /// `InsufficientBudget`, `InvalidAmount` or `UnknownSession`.
    pub fn transfer_budget(&self, source: &str, target: &str, amount: f64) -> Result<()> {
        check_amount(amount, false)?;
        self.registry.transaction(|sessions| {
            for name in [source, target] {
                if !sessions.contains_key(name) {
                    return Err(PolicyError::UnknownSession(name.to_string()).into());
                }
            }
            if !is_ancestor(sessions, source, target) {
                return Err(PolicyError::NotAncestor {
                    source_name: source.to_string(),
                    target: target.to_string(),
                }
                .into());
            }

            let (source_budget, source_remaining) = match sessions.get(source) {
                Some(s) => (s.effective_budget(), s.remaining_budget()),
                None => return Err(PolicyError::UnknownSession(source.to_string()).into()),
            };

            match (source_budget, source_remaining) {
                (Some(budget), Some(remaining)) => {
                    if amount > remaining + f64::EPSILON {
                        return Err(PolicyError::InsufficientBudget {
                            name: source.to_string(),
                            remaining,
                            requested: amount,
                        }
                        .into());
                    }
                    if let Some(s) = sessions.get_mut(source) {
                        s.budget_usd = Some(budget - amount);
                    }
                    if let Some(t) = sessions.get_mut(target) {
                        t.budget_usd = Some(t.effective_budget().unwrap_or(0.0) + amount);
                    }
                }
                _ => {
                    if let Some(t) = sessions.get_mut(target) {
                        t.budget_usd = Some(amount);
                    }
                }
            }
            Ok(())
        })?;

        info!(source, target, amount, "budget transferred");
        Ok(())
    }

    /// Budget rows for `name`, or for every session.
    pub fn budget_lines(&self, name: Option<&str>) -> Result<Vec<BudgetLine>> {
        budget_lines(&self.registry.load()?, name)
    }
}

/// Budget rows for `name`, or for every session in `sessions`.
pub fn budget_lines(sessions: &SessionMap, name: Option<&str>) -> Result<Vec<BudgetLine>> {
    let names: Vec<String> = match name {
        Some(name) if sessions.contains_key(name) => vec![name.to_string()],
        Some(name) => return Err(PolicyError::UnknownSession(name.to_string()).into()),
        None => sessions.keys().cloned().collect(),
    };

    Ok(names
        .into_iter()
        .filter_map(|name| {
            let session = sessions.get(&name)?;
            let subtree: f64 = descendants_deepest_first(sessions, &name)
                .iter()
                .filter_map(|d| sessions.get(d))
                .map(|d| d.spend_usd)
                .sum();
            Some(BudgetLine {
                budget_usd: session.effective_budget(),
                spend_usd: session.spend_usd,
                remaining_usd: session.remaining_budget(),
                subtree_spend_usd: session.spend_usd + subtree,
                name,
            })
        })
        .collect())
}
