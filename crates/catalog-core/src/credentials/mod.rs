//! Client credentials registered per application.

mod store;
mod validator;

pub use store::{ClientStore, SqliteClientStore};
pub use validator::{validator_for, CredentialsValidator, MailAppValidator};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{system_clock, Clock};
use crate::error::{CatalogError, CatalogResult};
use crate::validation::{Validate, Validator, MAX_NAME_LEN};

/// Applications that accept client registrations.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::AsRefStr,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Application {
    Mail,
}

/// Request body for `POST /credentials/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDto {
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: String,
    pub application: String,
}

/// Stored client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub firstname: String,
    pub lastname: Option<String>,
    pub email: String,
    pub application: Application,
    pub created_at: DateTime<Utc>,
}

impl Validate for ClientDto {
    /// Shape checks only; blank name/email is the application's call.
    fn validate(&self) -> CatalogResult<()> {
        let mut validator = Validator::new();
        validator
            .max_len("firstname", &self.firstname, MAX_NAME_LEN)
            .email("email", &self.email);
        if let Some(lastname) = &self.lastname {
            validator.max_len("lastname", lastname, MAX_NAME_LEN);
        }
        validator.finish()
    }
}

/// Registers and looks up clients.
#[derive(Clone)]
pub struct CredentialsService {
    store: Arc<dyn ClientStore>,
    clock: Clock,
}

impl CredentialsService {
    pub fn new(store: Arc<dyn ClientStore>) -> Self {
        Self {
            store,
            clock: system_clock(),
        }
    }

    pub fn create(&self, dto: ClientDto) -> CatalogResult<Client> {
        let application = dto.application.parse::<Application>().map_err(|_| {
            warn!(application = %dto.application, "Rejected unsupported application");
            CatalogError::AccessDenied(format!(
                "Application '{}' is not supported",
                dto.application
            ))
        })?;

        validator_for(application).validate(&dto)?;
        dto.validate()?;

        let client = Client {
            id: Uuid::new_v4(),
            firstname: dto.firstname.trim().to_string(),
            lastname: dto.lastname.map(|l| l.trim().to_string()),
            email: dto.email.trim().to_string(),
            application,
            created_at: (self.clock)(),
        };
        self.store.insert(&client)?;
        info!(client_id = %client.id, application = %application, "Registered client");
        Ok(client)
    }

    pub fn get(&self, client_id: Uuid) -> CatalogResult<Client> {
        self.store
            .get(client_id)?
            .ok_or_else(|| CatalogError::not_found("Client", client_id))
    }
}
