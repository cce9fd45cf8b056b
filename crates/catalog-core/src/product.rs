//! Products: versioned catalog entries optionally bound to a tariff.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::audit::{system_clock, Clock};
use crate::error::{CatalogError, CatalogResult};
use crate::validation::{Validate, Validator, MAX_DESCRIPTION_LEN, MAX_NAME_LEN};
use crate::versioning::{EntityVersion, VersionStore, VersionedEntity};

/// Business fields of a product version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductFields {
    pub name: String,
    pub description: String,
    pub product_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub tariff_id: Option<Uuid>,
    #[serde(default)]
    pub tariff_version: Option<u32>,
    #[serde(default)]
    pub author: Option<Uuid>,
}

impl VersionedEntity for ProductFields {
    const ENTITY_NAME: &'static str = "Product";
    const TABLE: &'static str = "product_versions";
}

/// Request body for `POST /product/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductDto {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub product_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub tariff_id: Option<Uuid>,
    #[serde(default)]
    pub tariff_version: Option<u32>,
    #[serde(default)]
    pub author: Option<Uuid>,
}

/// Request body for `PUT /product/update/{id}`. Absent fields keep their
/// current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductDto {
    pub name: Option<String>,
    pub description: Option<String>,
    pub product_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tariff_id: Option<Uuid>,
    pub tariff_version: Option<u32>,
    pub author: Option<Uuid>,
}

/// Product as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub product_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub tariff_id: Option<Uuid>,
    pub tariff_version: Option<u32>,
    pub author: Option<Uuid>,
    pub version: u32,
    pub current: bool,
    pub modified_at: DateTime<Utc>,
}

fn check_fields(fields: &ProductFields) -> CatalogResult<()> {
    Validator::new()
        .not_blank("name", &fields.name)
        .max_len("name", &fields.name, MAX_NAME_LEN)
        .max_len("description", &fields.description, MAX_DESCRIPTION_LEN)
        .not_blank("productType", &fields.product_type)
        .max_len("productType", &fields.product_type, MAX_NAME_LEN)
        .date_order("startDate", fields.start_date, "endDate", fields.end_date)
        .finish()
}

impl Validate for CreateProductDto {
    fn validate(&self) -> CatalogResult<()> {
        let mut validator = Validator::new();
        if self.tariff_version.is_some() && self.tariff_id.is_none() {
            validator.reject("tariffVersion", "requires tariffId");
        }
        validator.finish()?;
        check_fields(&ProductFields::from(self.clone()))
    }
}

impl Validate for UpdateProductDto {
    fn validate(&self) -> CatalogResult<()> {
        let mut validator = Validator::new();
        if let Some(name) = &self.name {
            validator
                .not_blank("name", name)
                .max_len("name", name, MAX_NAME_LEN);
        }
        if let Some(description) = &self.description {
            validator.max_len("description", description, MAX_DESCRIPTION_LEN);
        }
        if let Some(product_type) = &self.product_type {
            validator
                .not_blank("productType", product_type)
                .max_len("productType", product_type, MAX_NAME_LEN);
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            validator.date_order("startDate", start, "endDate", end);
        }
        validator.finish()
    }
}

impl From<CreateProductDto> for ProductFields {
    fn from(dto: CreateProductDto) -> Self {
        Self {
            name: dto.name,
            description: dto.description,
            product_type: dto.product_type,
            start_date: dto.start_date,
            end_date: dto.end_date,
            tariff_id: dto.tariff_id,
            tariff_version: dto.tariff_version,
            author: dto.author,
        }
    }
}

impl UpdateProductDto {
    /// Overlay the provided fields on top of `current`.
    pub fn apply(self, current: &ProductFields) -> ProductFields {
        let tariff_changed = self.tariff_id.is_some();
        ProductFields {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            description: self
                .description
                .unwrap_or_else(|| current.description.clone()),
            product_type: self
                .product_type
                .unwrap_or_else(|| current.product_type.clone()),
            start_date: self.start_date.unwrap_or(current.start_date),
            end_date: self.end_date.unwrap_or(current.end_date),
            tariff_id: self.tariff_id.or(current.tariff_id),
            // A new tariff without an explicit version drops the old pin.
            tariff_version: match self.tariff_version {
                Some(v) => Some(v),
                None if tariff_changed => None,
                None => current.tariff_version,
            },
            author: self.author.or(current.author),
        }
    }
}

impl From<EntityVersion<ProductFields>> for ProductDto {
    fn from(v: EntityVersion<ProductFields>) -> Self {
        Self {
            id: v.entity_id,
            name: v.fields.name,
            description: v.fields.description,
            product_type: v.fields.product_type,
            start_date: v.fields.start_date,
            end_date: v.fields.end_date,
            tariff_id: v.fields.tariff_id,
            tariff_version: v.fields.tariff_version,
            author: v.fields.author,
            version: v.version,
            current: v.is_current,
            modified_at: v.created_at,
        }
    }
}

/// Creates, updates and removes products.
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn VersionStore<ProductFields>>,
    clock: Clock,
}

impl ProductService {
    pub fn new(store: Arc<dyn VersionStore<ProductFields>>) -> Self {
        Self::with_clock(store, system_clock())
    }

    pub fn with_clock(store: Arc<dyn VersionStore<ProductFields>>, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub fn create(&self, dto: CreateProductDto) -> CatalogResult<ProductDto> {
        dto.validate()?;
        let version = EntityVersion::initial(ProductFields::from(dto), (self.clock)());
        self.store.insert_initial(&version)?;
        info!(product_id = %version.entity_id, "Created product");
        Ok(version.into())
    }

    /// Merge `dto` onto the current version. The read and the write share
    /// one transaction, so concurrent updates never drop each other's fields.
    pub fn update(&self, product_id: Uuid, dto: UpdateProductDto) -> CatalogResult<ProductDto> {
        dto.validate()?;
        let merge = move |current: &ProductFields| -> CatalogResult<ProductFields> {
            let fields = dto.apply(current);
            check_fields(&fields)?;
            Ok(fields)
        };

        let next = self
            .store
            .update_with(product_id, Box::new(merge), (self.clock)())?;
        info!(product_id = %product_id, version = next.version, "Updated product");
        Ok(next.into())
    }

    pub fn remove(&self, product_id: Uuid) -> CatalogResult<()> {
        let removed = self.store.delete_versions(product_id)?;
        if removed == 0 {
            return Err(CatalogError::not_found(ProductFields::ENTITY_NAME, product_id));
        }
        info!(product_id = %product_id, versions = removed, "Removed product");
        Ok(())
    }

    pub fn get(&self, product_id: Uuid) -> CatalogResult<ProductDto> {
        self.store
            .get_current(product_id)?
            .map(Into::into)
            .ok_or_else(|| CatalogError::not_found(ProductFields::ENTITY_NAME, product_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::versioning::SqliteVersionStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service() -> ProductService {
        ProductService::new(Arc::new(
            SqliteVersionStore::<ProductFields>::in_memory().unwrap(),
        ))
    }

    fn create_dto(name: &str) -> CreateProductDto {
        CreateProductDto {
            name: name.to_string(),
            description: "Everyday card".to_string(),
            product_type: "card".to_string(),
            start_date: date(2024, 1, 1),
            end_date: date(2025, 1, 1),
            tariff_id: None,
            tariff_version: None,
            author: None,
        }
    }

    #[test]
    fn test_create_starts_at_version_zero() {
        let product = service().create(create_dto("Debit")).unwrap();
        assert_eq!(product.version, 0);
        assert!(product.current);
        assert_eq!(product.name, "Debit");
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let mut dto = create_dto(" ");
        dto.start_date = date(2026, 1, 1);
        let err = service().create(dto).unwrap_err();
        let fields: Vec<String> = err
            .field_violations()
            .unwrap()
            .iter()
            .map(|v| v.field.clone())
            .collect();
        assert_eq!(fields, vec!["name", "endDate"]);
    }

    #[test]
    fn test_tariff_version_requires_tariff() {
        let mut dto = create_dto("Debit");
        dto.tariff_version = Some(1);
        let err = service().create(dto).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_update_merges_and_bumps_version() {
        let service = service();
        let created = service.create(create_dto("Debit")).unwrap();

        let updated = service
            .update(
                created.id,
                UpdateProductDto {
                    description: Some("Premium card".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.version, 1);
        assert_eq!(updated.name, "Debit");
        assert_eq!(updated.description, "Premium card");
        assert_eq!(service.get(created.id).unwrap(), updated);
    }

    #[test]
    fn test_update_checks_merged_dates() {
        let service = service();
        let created = service.create(create_dto("Debit")).unwrap();

        let err = service
            .update(
                created.id,
                UpdateProductDto {
                    start_date: Some(date(2030, 1, 1)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(service.get(created.id).unwrap().version, 0);
    }

    #[test]
    fn test_new_tariff_drops_old_pin() {
        let current = ProductFields {
            tariff_id: Some(Uuid::new_v4()),
            tariff_version: Some(3),
            ..ProductFields::from(create_dto("Debit"))
        };
        let next_tariff = Uuid::new_v4();
        let merged = UpdateProductDto {
            tariff_id: Some(next_tariff),
            ..Default::default()
        }
        .apply(&current);
        assert_eq!(merged.tariff_id, Some(next_tariff));
        assert_eq!(merged.tariff_version, None);
    }

    /// Store that lets a rival rename land right before the next update
    /// touches the current row.
    struct RivalStore {
        inner: Arc<SqliteVersionStore<ProductFields>>,
        rival_fired: std::sync::atomic::AtomicBool,
    }

    impl RivalStore {
        fn fire_rival(&self, entity_id: Uuid) {
            if self.rival_fired.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return;
            }
            let current = self.inner.get_current(entity_id).unwrap().unwrap();
            let renamed = ProductFields {
                name: "Renamed".to_string(),
                ..current.fields
            };
            self.inner.append(entity_id, &renamed, Utc::now()).unwrap();
        }
    }

    impl VersionStore<ProductFields> for RivalStore {
        fn insert_initial(&self, version: &EntityVersion<ProductFields>) -> CatalogResult<()> {
            self.inner.insert_initial(version)
        }

        fn get_current(
            &self,
            entity_id: Uuid,
        ) -> CatalogResult<Option<EntityVersion<ProductFields>>> {
            let current = self.inner.get_current(entity_id);
            self.fire_rival(entity_id);
            current
        }

        fn get_version(
            &self,
            entity_id: Uuid,
            version: u32,
        ) -> CatalogResult<Option<EntityVersion<ProductFields>>> {
            self.inner.get_version(entity_id, version)
        }

        fn get_all_versions(
            &self,
            entity_id: Uuid,
        ) -> CatalogResult<Vec<EntityVersion<ProductFields>>> {
            self.inner.get_all_versions(entity_id)
        }

        fn get_previous_versions(
            &self,
            entity_id: Uuid,
        ) -> CatalogResult<Vec<EntityVersion<ProductFields>>> {
            self.inner.get_previous_versions(entity_id)
        }

        fn get_versions_in_period(
            &self,
            entity_id: Uuid,
            from: NaiveDate,
            to: NaiveDate,
        ) -> CatalogResult<Vec<EntityVersion<ProductFields>>> {
            self.inner.get_versions_in_period(entity_id, from, to)
        }

        fn append(
            &self,
            entity_id: Uuid,
            fields: &ProductFields,
            at: DateTime<Utc>,
        ) -> CatalogResult<EntityVersion<ProductFields>> {
            self.inner.append(entity_id, fields, at)
        }

        fn update_with(
            &self,
            entity_id: Uuid,
            merge: Box<dyn FnOnce(&ProductFields) -> CatalogResult<ProductFields> + '_>,
            at: DateTime<Utc>,
        ) -> CatalogResult<EntityVersion<ProductFields>> {
            self.fire_rival(entity_id);
            self.inner.update_with(entity_id, merge, at)
        }

        fn revert(
            &self,
            entity_id: Uuid,
            target: u32,
            at: DateTime<Utc>,
        ) -> CatalogResult<EntityVersion<ProductFields>> {
            self.inner.revert(entity_id, target, at)
        }

        fn exists(&self, entity_id: Uuid) -> CatalogResult<bool> {
            self.inner.exists(entity_id)
        }

        fn delete_versions(&self, entity_id: Uuid) -> CatalogResult<usize> {
            self.inner.delete_versions(entity_id)
        }

        fn count_all(&self) -> CatalogResult<usize> {
            self.inner.count_all()
        }
    }

    #[test]
    fn test_update_keeps_concurrent_rename() {
        let inner = Arc::new(SqliteVersionStore::<ProductFields>::in_memory().unwrap());
        let created = ProductService::new(inner.clone())
            .create(create_dto("Debit"))
            .unwrap();

        let racing = ProductService::new(Arc::new(RivalStore {
            inner: inner.clone(),
            rival_fired: std::sync::atomic::AtomicBool::new(false),
        }));
        let updated = racing
            .update(
                created.id,
                UpdateProductDto {
                    description: Some("d1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.description, "d1");
    }

    #[test]
    fn test_concurrent_updates_keep_every_field() {
        let service = service();
        let created = service.create(create_dto("Debit")).unwrap();

        let updates = [
            UpdateProductDto {
                name: Some("Gold".to_string()),
                ..Default::default()
            },
            UpdateProductDto {
                description: Some("Premium card".to_string()),
                ..Default::default()
            },
            UpdateProductDto {
                product_type: Some("deposit".to_string()),
                ..Default::default()
            },
            UpdateProductDto {
                end_date: Some(date(2030, 1, 1)),
                ..Default::default()
            },
        ];
        let handles: Vec<_> = updates
            .into_iter()
            .map(|dto| {
                let service = service.clone();
                std::thread::spawn(move || service.update(created.id, dto).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let current = service.get(created.id).unwrap();
        assert_eq!(current.version, 4);
        assert_eq!(current.name, "Gold");
        assert_eq!(current.description, "Premium card");
        assert_eq!(current.product_type, "deposit");
        assert_eq!(current.end_date, date(2030, 1, 1));
    }

    #[test]
    fn test_product_type_must_not_be_blank() {
        let mut dto = create_dto("Debit");
        dto.product_type = "  ".to_string();
        let err = service().create(dto).unwrap_err();
        assert_eq!(err.field_violations().unwrap()[0].field, "productType");

        let service = service();
        let created = service.create(create_dto("Debit")).unwrap();
        let err = service
            .update(
                created.id,
                UpdateProductDto {
                    product_type: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_update_unknown_product() {
        let err = service()
            .update(Uuid::new_v4(), UpdateProductDto::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_remove() {
        let service = service();
        let created = service.create(create_dto("Debit")).unwrap();
        service.remove(created.id).unwrap();
        assert_eq!(service.get(created.id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(service.remove(created.id).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_dto_json_shape() {
        let dto: CreateProductDto = serde_json::from_value(serde_json::json!({
            "name": "Debit",
            "productType": "card",
            "startDate": "2024-01-12",
            "endDate": "2029-01-12"
        }))
        .unwrap();
        assert_eq!(dto.description, "");
        assert_eq!(dto.product_type, "card");
        assert_eq!(dto.start_date, date(2024, 1, 12));
    }
}
