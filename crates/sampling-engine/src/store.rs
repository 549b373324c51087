//! Slot storage
//!
//! A slot is the unit of sampling work: one config, its current plan, at
//! most one sample, and the ids of plans it replaced. Stores hand out
//! copies; all mutation goes through [`SlotStore::update`], which runs the
//! closure on a draft and commits only on success.

use crate::error::SamplingError;
use crate::sample::Sample;
use crate::state_machine::LifecycleState;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use sampling_plan::{PlanId, SamplingConfig, SamplingPlan};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Unique slot identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub Uuid);

impl SlotId {
    /// Generate new slot ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything stored for one slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRecord {
    /// Slot identity
    pub slot: SlotId,
    /// Lifecycle state
    pub state: LifecycleState,
    /// Config of the current plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SamplingConfig>,
    /// Current plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<SamplingPlan>,
    /// Current sample, bound to `plan`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<Sample>,
    /// Ids of superseded plans, oldest first
    #[serde(default)]
    pub history: Vec<PlanId>,
    /// Last mutation
    pub updated_at: DateTime<Utc>,
}

impl SlotRecord {
    /// Create an unconfigured record
    #[inline]
    #[must_use]
    pub fn new(slot: SlotId, at: DateTime<Utc>) -> Self {
        Self {
            slot,
            state: LifecycleState::Unconfigured,
            config: None,
            plan: None,
            sample: None,
            history: Vec::new(),
            updated_at: at,
        }
    }

    /// Check if the record is frozen
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state == LifecycleState::Locked || self.sample.as_ref().is_some_and(Sample::is_locked)
    }
}

/// Proof of a successful lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockReceipt {
    /// Locked slot
    pub slot: SlotId,
    /// Plan the locked sample belongs to
    pub plan_id: PlanId,
    /// Lock time
    pub locked_at: DateTime<Utc>,
    /// Fingerprint of the locked sample
    pub fingerprint: String,
    /// Rows in the locked sample
    pub sample_size: usize,
}

/// Storage for slot records
///
/// Implementations must make [`SlotStore::update`] atomic per slot; the
/// default [`SlotStore::compare_and_set_lock`] relies on it.
pub trait SlotStore: Send + Sync {
    /// Copy of a slot record
    fn get(&self, slot: SlotId) -> Option<SlotRecord>;

    /// Insert or replace a record
    ///
    /// # Errors
    /// [`SamplingError::AlreadyLocked`] if the stored record is locked
    fn put(&self, record: SlotRecord) -> Result<(), SamplingError>;

    /// Mutate a record atomically
    ///
    /// `f` works on a draft; the draft replaces the stored record only when
    /// `f` returns `Ok`.
    ///
    /// # Errors
    /// - [`SamplingError::InvalidState`] for an unknown slot
    /// - [`SamplingError::AlreadyLocked`] if the record is locked
    /// - Whatever `f` returns
    fn update<R, F>(&self, slot: SlotId, f: F) -> Result<R, SamplingError>
    where
        F: FnOnce(&mut SlotRecord) -> Result<R, SamplingError>;

    /// Lock the slot's sample if, and only if, it is not locked yet
    ///
    /// # Errors
    /// - [`SamplingError::InvalidState`] if the slot has no sample
    /// - [`SamplingError::AlreadyLocked`] if another caller locked first
    fn compare_and_set_lock(
        &self,
        slot: SlotId,
        at: DateTime<Utc>,
    ) -> Result<LockReceipt, SamplingError> {
        self.update(slot, |record| {
            let sample = record
                .sample
                .as_mut()
                .ok_or_else(|| SamplingError::invalid_state(format!("slot {slot} has no sample to lock")))?;
            if sample.is_locked() {
                return Err(SamplingError::AlreadyLocked { slot });
            }
            sample.locked_at = Some(at);

            let receipt = LockReceipt {
                slot,
                plan_id: sample.plan_id,
                locked_at: at,
                fingerprint: sample.fingerprint(),
                sample_size: sample.sample_size(),
            };
            record.state = LifecycleState::Locked;
            record.updated_at = at;
            Ok(receipt)
        })
    }
}

/// Process-local slot store
///
/// Each record sits behind its own mutex, so slots never contend with
/// each other.
#[derive(Debug, Default)]
pub struct InMemorySlotStore {
    slots: DashMap<SlotId, Arc<Mutex<SlotRecord>>>,
}

impl InMemorySlotStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no slot exists
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn handle(&self, slot: SlotId) -> Option<Arc<Mutex<SlotRecord>>> {
        // clone the handle so the shard lock is released before the mutex is taken
        self.slots.get(&slot).map(|entry| Arc::clone(entry.value()))
    }
}

impl SlotStore for InMemorySlotStore {
    fn get(&self, slot: SlotId) -> Option<SlotRecord> {
        self.handle(slot).map(|record| record.lock().clone())
    }

    fn put(&self, record: SlotRecord) -> Result<(), SamplingError> {
        let handle = match self.slots.entry(record.slot) {
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(record)));
                return Ok(());
            }
            Entry::Occupied(occupied) => Arc::clone(occupied.get()),
        };

        let mut current = handle.lock();
        if current.is_locked() {
            return Err(SamplingError::AlreadyLocked { slot: current.slot });
        }
        *current = record;
        Ok(())
    }

    fn update<R, F>(&self, slot: SlotId, f: F) -> Result<R, SamplingError>
    where
        F: FnOnce(&mut SlotRecord) -> Result<R, SamplingError>,
    {
        let handle = self
            .handle(slot)
            .ok_or_else(|| SamplingError::invalid_state(format!("unknown slot {slot}")))?;

        let mut current = handle.lock();
        if current.is_locked() {
            return Err(SamplingError::AlreadyLocked { slot });
        }

        let mut draft = current.clone();
        let output = f(&mut draft)?;
        *current = draft;
        Ok(output)
    }
}
