//! Loan book: the caller-owned collection of active loans
//!
//! Cross-loan operations (compare, consolidate) take their inputs from the
//! book by id. When a store is attached, creation can auto-save and edits and
//! deletions of saved loans are mirrored to it.

mod store;

pub use store::{InMemoryStore, LoanStore, StoreError};

use std::collections::HashSet;

use log::{debug, info};

use crate::consolidation::{consolidate, ConsolidatedLoanSpec};
use crate::error::{LoanError, Result};
use crate::loan::{Loan, LoanId, LoanSummary};
use crate::rates::VariableRateSource;
use crate::terms::{LoanSpec, PaymentFrequency, RateType};

#[derive(Default)]
pub struct LoanBook {
    loans: Vec<Loan>,
    store: Option<Box<dyn LoanStore>>,
    persisted: HashSet<LoanId>,
}

impl LoanBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty book backed by `store`
    pub fn with_store(store: Box<dyn LoanStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    /// Rebuild every stored loan, with its costs and expenses
    pub fn load(store: Box<dyn LoanStore>, rates: &dyn VariableRateSource) -> Result<Self> {
        let mut loans = Vec::new();
        let mut persisted = HashSet::new();

        for (id, spec) in store.load_all()? {
            let mut loan = Loan::with_id(id.clone(), spec, rates)?;
            loan.replace_costs(store.load_additional_costs(&id)?, store.load_periodic_expenses(&id)?);
            persisted.insert(id);
            loans.push(loan);
        }

        info!("loaded {} loans from store", loans.len());
        Ok(Self { loans, store: Some(store), persisted })
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Loan> {
        self.loans.iter()
    }

    pub fn store(&self) -> Option<&dyn LoanStore> {
        self.store.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Loan> {
        self.loans.iter().find(|l| l.id() == id)
    }

    /// Mutable access for cost and expense changes
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Loan> {
        self.loans.iter_mut().find(|l| l.id() == id)
    }

    pub fn is_persisted(&self, id: &str) -> bool {
        self.persisted.contains(id)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.loans
            .iter()
            .position(|l| l.id() == id)
            .ok_or_else(|| LoanError::LoanNotFound { id: id.to_string() })
    }

    /// Build a loan and add it to the book.
    ///
    /// With `auto_save` and a store attached, the loan takes the store's id;
    /// if saving fails the loan is discarded and the book is unchanged.
    pub fn create(&mut self, spec: LoanSpec, rates: &dyn VariableRateSource, auto_save: bool) -> Result<LoanId> {
        let loan = Loan::new(spec, rates)?;
        self.insert(loan, auto_save)
    }

    fn insert(&mut self, mut loan: Loan, auto_save: bool) -> Result<LoanId> {
        match self.store.as_mut() {
            Some(store) if auto_save => {
                let id = store.save(loan.spec())?;
                loan.set_id(id.clone());
                self.persisted.insert(id);
            }
            _ => debug!("loan {} kept in memory only", loan.id()),
        }

        let id = loan.id().to_string();
        info!("added loan {}: principal {:.2}", id, loan.principal());
        self.loans.push(loan);
        Ok(id)
    }

    /// Replace a loan's terms; a failed store update restores the old loan
    pub fn edit(&mut self, id: &str, spec: LoanSpec, rates: &dyn VariableRateSource) -> Result<()> {
        let idx = self.position(id)?;
        let previous = self.loans[idx].clone();
        self.loans[idx].edit(spec, rates)?;

        if self.persisted.contains(id) {
            if let Some(store) = self.store.as_mut() {
                if let Err(e) = store.update(id, self.loans[idx].spec()) {
                    self.loans[idx] = previous;
                    return Err(e.into());
                }
            }
        }

        info!("edited loan {}", id);
        Ok(())
    }

    /// Recompute every variable-rate loan against a fresh rate source.
    /// Returns how many loans were recomputed.
    pub fn refresh_rates(&mut self, rates: &dyn VariableRateSource) -> Result<usize> {
        let mut refreshed = 0;
        for loan in self.loans.iter_mut().filter(|l| l.spec().rate_type == RateType::Variable) {
            loan.recompute(rates)?;
            refreshed += 1;
        }
        info!("refreshed rates on {} loans", refreshed);
        Ok(refreshed)
    }

    /// Remove a loan from the book (and the store, when saved there)
    pub fn delete(&mut self, id: &str) -> Result<Loan> {
        let idx = self.position(id)?;

        if self.persisted.contains(id) {
            if let Some(store) = self.store.as_mut() {
                store.delete(id)?;
            }
            self.persisted.remove(id);
        }

        info!("deleted loan {}", id);
        Ok(self.loans.remove(idx))
    }

    pub fn compare(&self, ids: &[&str]) -> Result<Vec<LoanSummary>> {
        ids.iter()
            .map(|id| {
                self.get(id)
                    .map(Loan::summary)
                    .ok_or_else(|| LoanError::LoanNotFound { id: id.to_string() })
            })
            .collect()
    }

    /// Consolidation terms for the given loans, without changing the book
    pub fn consolidation_spec(&self, ids: &[&str], target: PaymentFrequency) -> Result<ConsolidatedLoanSpec> {
        let loans = ids
            .iter()
            .map(|id| self.get(id).ok_or_else(|| LoanError::LoanNotFound { id: id.to_string() }))
            .collect::<Result<Vec<_>>>()?;
        consolidate(loans, target)
    }

    /// Add the consolidated loan of `ids` to the book; the inputs stay active
    pub fn consolidate(
        &mut self,
        ids: &[&str],
        target: PaymentFrequency,
        rates: &dyn VariableRateSource,
        auto_save: bool,
    ) -> Result<LoanId> {
        let spec = self.consolidation_spec(ids, target)?;
        let loan = Loan::from_consolidated(&spec, rates)?;
        self.insert(loan, auto_save)
    }
}
