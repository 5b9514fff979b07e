//! Persistence collaborator interface and an in-memory implementation

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::loan::LoanId;
use crate::terms::LoanSpec;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Backend(String),
}

/// Storage for loan terms and their cost items.
///
/// The engine calls these synchronously; failures are propagated unchanged.
pub trait LoanStore {
    fn save(&mut self, spec: &LoanSpec) -> Result<LoanId, StoreError>;

    fn update(&mut self, id: &str, spec: &LoanSpec) -> Result<(), StoreError>;

    fn delete(&mut self, id: &str) -> Result<(), StoreError>;

    fn load_all(&self) -> Result<Vec<(LoanId, LoanSpec)>, StoreError>;

    fn load_additional_costs(&self, id: &str) -> Result<BTreeMap<String, f64>, StoreError>;

    fn load_periodic_expenses(&self, id: &str) -> Result<BTreeMap<String, f64>, StoreError>;
}

#[derive(Debug, Clone, Default)]
struct StoredLoan {
    spec: Option<LoanSpec>,
    additional_costs: BTreeMap<String, f64>,
    periodic_expenses: BTreeMap<String, f64>,
}

/// Process-local store, ids assigned sequentially ("loan-1", "loan-2", ...)
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    next_id: u64,
    order: Vec<LoanId>,
    records: HashMap<LoanId, StoredLoan>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Record an upfront cost for a stored loan
    pub fn put_additional_cost(&mut self, id: &str, name: &str, amount: f64) -> Result<(), StoreError> {
        let record = self.records.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.additional_costs.insert(name.to_string(), amount);
        Ok(())
    }

    /// Record a periodic expense for a stored loan
    pub fn put_periodic_expense(&mut self, id: &str, name: &str, amount: f64) -> Result<(), StoreError> {
        let record = self.records.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.periodic_expenses.insert(name.to_string(), amount);
        Ok(())
    }

    fn record(&self, id: &str) -> Result<&StoredLoan, StoreError> {
        self.records.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

impl LoanStore for InMemoryStore {
    fn save(&mut self, spec: &LoanSpec) -> Result<LoanId, StoreError> {
        self.next_id += 1;
        let id = format!("loan-{}", self.next_id);
        self.records.insert(
            id.clone(),
            StoredLoan { spec: Some(spec.clone()), ..Default::default() },
        );
        self.order.push(id.clone());
        Ok(id)
    }

    fn update(&mut self, id: &str, spec: &LoanSpec) -> Result<(), StoreError> {
        let record = self.records.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.spec = Some(spec.clone());
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.records.remove(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.order.retain(|stored| stored != id);
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<(LoanId, LoanSpec)>, StoreError> {
        self.order
            .iter()
            .map(|id| {
                let spec = self
                    .record(id)?
                    .spec
                    .clone()
                    .ok_or_else(|| StoreError::Backend(format!("{} has no terms", id)))?;
                Ok((id.clone(), spec))
            })
            .collect()
    }

    fn load_additional_costs(&self, id: &str) -> Result<BTreeMap<String, f64>, StoreError> {
        Ok(self.record(id)?.additional_costs.clone())
    }

    fn load_periodic_expenses(&self, id: &str) -> Result<BTreeMap<String, f64>, StoreError> {
        Ok(self.record(id)?.periodic_expenses.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terms::{AmortizationMethod, PaymentFrequency};
    use chrono::NaiveDate;

    fn spec(amount: f64) -> LoanSpec {
        LoanSpec::fixed(
            amount,
            0.05,
            10,
            AmortizationMethod::French,
            PaymentFrequency::Monthly,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    #[test]
    fn test_crud() {
        let mut store = InMemoryStore::new();
        let a = store.save(&spec(1_000.0)).unwrap();
        let b = store.save(&spec(2_000.0)).unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("loan-1", "loan-2"));

        store.update(&a, &spec(1_500.0)).unwrap();
        store.put_additional_cost(&a, "fee", 25.0).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].1.amount, 1_500.0);
        assert_eq!(store.load_additional_costs(&a).unwrap().get("fee"), Some(&25.0));
        assert!(store.load_periodic_expenses(&b).unwrap().is_empty());

        store.delete(&a).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.delete(&a), Err(StoreError::NotFound(a.clone())));
    }
}
