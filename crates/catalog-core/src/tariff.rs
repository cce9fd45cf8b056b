//! Tariffs: versioned pricing terms referenced by products.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::audit::{system_clock, Clock};
use crate::error::{CatalogError, CatalogResult};
use crate::validation::{Validate, Validator, MAX_DESCRIPTION_LEN, MAX_NAME_LEN};
use crate::versioning::{EntityVersion, VersionStore, VersionedEntity};

/// Business fields of a tariff version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffFields {
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rate: f64,
    #[serde(default)]
    pub author: Option<Uuid>,
}

impl VersionedEntity for TariffFields {
    const ENTITY_NAME: &'static str = "Tariff";
    const TABLE: &'static str = "tariff_versions";
}

/// Request body for creating a tariff, and for replacing one on update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffCreateDto {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rate: f64,
    #[serde(default)]
    pub author: Option<Uuid>,
}

/// Tariff as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffDto {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rate: f64,
    pub author: Option<Uuid>,
    pub version: u32,
    pub current: bool,
    pub modified_at: DateTime<Utc>,
}

impl Validate for TariffCreateDto {
    fn validate(&self) -> CatalogResult<()> {
        Validator::new()
            .not_blank("name", &self.name)
            .max_len("name", &self.name, MAX_NAME_LEN)
            .max_len("description", &self.description, MAX_DESCRIPTION_LEN)
            .date_order("startDate", self.start_date, "endDate", self.end_date)
            .positive("rate", self.rate)
            .finish()
    }
}

impl From<TariffCreateDto> for TariffFields {
    fn from(dto: TariffCreateDto) -> Self {
        Self {
            name: dto.name,
            description: dto.description,
            start_date: dto.start_date,
            end_date: dto.end_date,
            rate: dto.rate,
            author: dto.author,
        }
    }
}

impl From<EntityVersion<TariffFields>> for TariffDto {
    fn from(v: EntityVersion<TariffFields>) -> Self {
        Self {
            id: v.entity_id,
            name: v.fields.name,
            description: v.fields.description,
            start_date: v.fields.start_date,
            end_date: v.fields.end_date,
            rate: v.fields.rate,
            author: v.fields.author,
            version: v.version,
            current: v.is_current,
            modified_at: v.created_at,
        }
    }
}

/// Creates, updates and removes tariffs.
#[derive(Clone)]
pub struct TariffService {
    store: Arc<dyn VersionStore<TariffFields>>,
    clock: Clock,
}

impl TariffService {
    pub fn new(store: Arc<dyn VersionStore<TariffFields>>) -> Self {
        Self::with_clock(store, system_clock())
    }

    pub fn with_clock(store: Arc<dyn VersionStore<TariffFields>>, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub fn create(&self, dto: TariffCreateDto) -> CatalogResult<TariffDto> {
        dto.validate()?;
        let version = EntityVersion::initial(TariffFields::from(dto), (self.clock)());
        self.store.insert_initial(&version)?;
        info!(tariff_id = %version.entity_id, "Created tariff");
        Ok(version.into())
    }

    /// Replace the tariff's fields, producing a new version.
    pub fn update(&self, tariff_id: Uuid, dto: TariffCreateDto) -> CatalogResult<TariffDto> {
        dto.validate()?;
        let next = self
            .store
            .append(tariff_id, &TariffFields::from(dto), (self.clock)())?;
        info!(tariff_id = %tariff_id, version = next.version, "Updated tariff");
        Ok(next.into())
    }

    pub fn remove(&self, tariff_id: Uuid) -> CatalogResult<()> {
        let removed = self.store.delete_versions(tariff_id)?;
        if removed == 0 {
            return Err(CatalogError::not_found(TariffFields::ENTITY_NAME, tariff_id));
        }
        info!(tariff_id = %tariff_id, versions = removed, "Removed tariff");
        Ok(())
    }

    pub fn get(&self, tariff_id: Uuid) -> CatalogResult<TariffDto> {
        self.store
            .get_current(tariff_id)?
            .map(Into::into)
            .ok_or_else(|| CatalogError::not_found(TariffFields::ENTITY_NAME, tariff_id))
    }
}
