//! Per-entity service facade: ties a schema and a storage collaborator
//! together behind create/read/update/delete/list operations.
//!
//! Every operation works on a private snapshot of the collection loaded at
//! its start. Mutations serialize the read-modify-write cycle through one
//! mutex, so two handlers in this process cannot interleave a load/save
//! pair; cross-process writers remain the storage owner's problem.

use crate::core::{RegistryError, Result, Violation};
use crate::query::{self, PageLimits, QueryParams};
use crate::schema::{Record, RecordSchema};
use crate::storage::{Collection, Storage, StoredAttrs};
use log::{info, warn};
use serde_json::Value as JsonValue;
use std::sync::Mutex;

pub struct Registry {
    schema: RecordSchema,
    store: Box<dyn Storage>,
    limits: PageLimits,
    write_lock: Mutex<()>,
}

impl Registry {
    pub fn new(schema: RecordSchema, store: impl Storage + 'static) -> Self {
        Self {
            schema,
            store: Box::new(store),
            limits: PageLimits::default(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn limits(&self) -> &PageLimits {
        &self.limits
    }

    /// Lists records matching the query: load a snapshot, materialize every
    /// entry, then filter/sort/paginate.
    pub fn list(&self, params: &QueryParams) -> Result<Vec<Record>> {
        let collection = self.store.load()?;
        let records = self.materialize_all(&collection)?;
        query::run(&records, params, &self.schema, &self.limits)
    }

    pub fn get(&self, id: &str) -> Result<Record> {
        let collection = self.store.load()?;
        match collection.get(id) {
            Some(attrs) => self.materialize(id, attrs),
            None => Err(RegistryError::NotFound(id.to_string())),
        }
    }

    /// Creates a record from a full payload carrying the identifier field.
    ///
    /// The identifier pattern is checked first, then uniqueness against the
    /// snapshot, then the full payload; nothing is persisted unless all
    /// three pass.
    pub fn create(&self, payload: &StoredAttrs) -> Result<Record> {
        let id = self.extract_id(payload)?;
        self.schema.check_id(&id)?;

        let _guard = self.lock_writes();
        let mut collection = self.store.load()?;
        if collection.contains_key(&id) {
            return Err(RegistryError::DuplicateIdentifier(id));
        }

        let record = self.schema.validate_and_construct(&id, payload)?;
        collection.insert(id.clone(), record.stored_json());
        self.store.save(&collection)?;
        info!("created {} '{}'", self.schema.entity, id);
        Ok(record)
    }

    /// Applies a partial update: fields present in the patch (including
    /// explicit nulls) override, absent fields carry over; the merged
    /// record is fully re-validated and re-derived before anything is
    /// written. A validation failure leaves the stored record untouched.
    pub fn update(&self, id: &str, patch: &StoredAttrs) -> Result<Record> {
        let _guard = self.lock_writes();
        let mut collection = self.store.load()?;
        let existing = collection
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let record = self.schema.merge_partial(id, existing, patch)?;
        collection.insert(id.to_string(), record.stored_json());
        self.store.save(&collection)?;
        info!("updated {} '{}'", self.schema.entity, id);
        Ok(record)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.lock_writes();
        let mut collection = self.store.load()?;
        if collection.remove(id).is_none() {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        self.store.save(&collection)?;
        info!("deleted {} '{}'", self.schema.entity, id);
        Ok(())
    }

    fn extract_id(&self, payload: &StoredAttrs) -> Result<String> {
        match payload.get(self.schema.id.field) {
            Some(JsonValue::String(id)) => Ok(id.clone()),
            Some(other) => Err(RegistryError::Validation(vec![Violation::new(
                self.schema.id.field,
                "must be a string",
                other.clone(),
            )])),
            None => Err(RegistryError::Validation(vec![Violation::new(
                self.schema.id.field,
                "is required",
                JsonValue::Null,
            )])),
        }
    }

    fn materialize_all(&self, collection: &Collection) -> Result<Vec<Record>> {
        collection
            .iter()
            .map(|(id, attrs)| self.materialize(id, attrs))
            .collect()
    }

    /// Rebuilds a record from its stored attributes. A stored entry that no
    /// longer passes validation is file corruption, not client error.
    fn materialize(&self, id: &str, attrs: &StoredAttrs) -> Result<Record> {
        self.schema.validate_and_construct(id, attrs).map_err(|e| {
            warn!("corrupt stored {} '{}': {}", self.schema.entity, id, e);
            RegistryError::StorageUnavailable(format!(
                "stored {} '{}' is invalid: {}",
                self.schema.entity, id, e
            ))
        })
    }

    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        // A poisoned lock only means another thread panicked mid-request;
        // the collection itself lives on disk, so recover the guard.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
