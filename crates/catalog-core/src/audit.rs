//! Audit queries and reverts over a versioned entity.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::validation::validate_period;
use crate::versioning::{EntityVersion, VersionStore, VersionedEntity};

/// Source of "now" for new version rows.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Clock backed by the system time, at the microsecond precision rows are
/// stored with.
pub fn system_clock() -> Clock {
    Arc::new(|| Utc::now().trunc_subsecs(6))
}

/// Answers history questions about one entity type and reverts it.
pub struct AuditService<T: VersionedEntity> {
    store: Arc<dyn VersionStore<T>>,
    clock: Clock,
}

impl<T: VersionedEntity> Clone for AuditService<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T: VersionedEntity> AuditService<T> {
    pub fn new(store: Arc<dyn VersionStore<T>>) -> Self {
        Self::with_clock(store, system_clock())
    }

    pub fn with_clock(store: Arc<dyn VersionStore<T>>, clock: Clock) -> Self {
        Self { store, clock }
    }

    fn ensure_exists(&self, entity_id: Uuid) -> CatalogResult<()> {
        if self.store.exists(entity_id)? {
            Ok(())
        } else {
            Err(CatalogError::not_found(T::ENTITY_NAME, entity_id))
        }
    }

    /// The entity's current version.
    pub fn get_actual_version(&self, entity_id: Uuid) -> CatalogResult<EntityVersion<T>> {
        self.store
            .get_current(entity_id)?
            .ok_or_else(|| CatalogError::not_found(T::ENTITY_NAME, entity_id))
    }

    /// Every superseded version, oldest first.
    pub fn get_previous_versions(&self, entity_id: Uuid) -> CatalogResult<Vec<EntityVersion<T>>> {
        self.ensure_exists(entity_id)?;
        self.store.get_previous_versions(entity_id)
    }

    /// Versions that were current at some point during `[from, to]`.
    pub fn get_versions_by_period(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        entity_id: Uuid,
    ) -> CatalogResult<Vec<EntityVersion<T>>> {
        validate_period(from, to)?;
        self.ensure_exists(entity_id)?;
        self.store.get_versions_in_period(entity_id, from, to)
    }

    /// Make a copy of `target` the new current version.
    pub fn revert_version(&self, entity_id: Uuid, target: u32) -> CatalogResult<EntityVersion<T>> {
        let reverted = self.store.revert(entity_id, target, (self.clock)())?;
        info!(
            entity = T::ENTITY_NAME,
            entity_id = %entity_id,
            from = target,
            version = reverted.version,
            "Reverted entity to an earlier version"
        );
        Ok(reverted)
    }
}
