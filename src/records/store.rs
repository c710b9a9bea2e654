//! In-memory record storage.
//!
//! Nothing is persisted; records live as long as the process.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::observability::metrics;
use crate::records::types::{AnalysisResult, BusinessProfile, Consultation, Record};

/// A thread-safe keyed collection of one record type.
#[derive(Clone)]
pub struct Collection<T: Record> {
    name: &'static str,
    inner: Arc<DashMap<Uuid, T>>,
}

impl<T: Record> Collection<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Arc::new(DashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn insert(&self, record: T) -> T {
        self.inner.insert(record.id(), record.clone());
        metrics::record_created(self.name);
        tracing::debug!(collection = self.name, id = %record.id(), "Record created");
        record
    }

    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.inner.get(id).map(|r| r.value().clone())
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.inner.contains_key(id)
    }

    /// Apply `f` to the stored record and return the updated copy.
    pub fn update<F>(&self, id: &Uuid, f: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        self.inner.get_mut(id).map(|mut r| {
            f(r.value_mut());
            r.value().clone()
        })
    }

    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.inner.remove(id).map(|(_, record)| record)
    }

    /// All records matching `filter`, newest first.
    pub fn list_where<F>(&self, filter: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut records: Vec<T> = self
            .inner
            .iter()
            .filter(|r| filter(r.value()))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| std::cmp::Reverse(r.created_at()));
        records
    }

    pub fn list(&self) -> Vec<T> {
        self.list_where(|_| true)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// All collections served by the API.
#[derive(Clone)]
pub struct Store {
    pub consultations: Collection<Consultation>,
    pub business_profiles: Collection<BusinessProfile>,
    pub analyses: Collection<AnalysisResult>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            consultations: Collection::new("consultations"),
            business_profiles: Collection::new("business_profiles"),
            analyses: Collection::new("analyses"),
        }
    }

    pub fn analyses_for(&self, profile_id: &Uuid) -> Vec<AnalysisResult> {
        self.analyses
            .list_where(|a| &a.business_profile_id == profile_id)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
