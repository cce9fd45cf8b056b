//! Per-application credential checks.

use tracing::info;

use crate::credentials::{Application, ClientDto};
use crate::error::{CatalogError, CatalogResult};

/// Rule set an application imposes on client credentials.
pub trait CredentialsValidator: Send + Sync {
    fn validate(&self, client: &ClientDto) -> CatalogResult<()>;
}

/// Mail clients need a name to greet and an address to write to.
pub struct MailAppValidator;

impl CredentialsValidator for MailAppValidator {
    fn validate(&self, client: &ClientDto) -> CatalogResult<()> {
        info!(
            firstname = %client.firstname,
            email = %client.email,
            "Validating mail client credentials"
        );
        if client.firstname.trim().is_empty() || client.email.trim().is_empty() {
            return Err(CatalogError::InvalidCredentials(
                "Firstname and email must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validator registered for an application.
pub fn validator_for(application: Application) -> &'static dyn CredentialsValidator {
    match application {
        Application::Mail => &MailAppValidator,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn client(firstname: &str, email: &str) -> ClientDto {
        ClientDto {
            firstname: firstname.to_string(),
            lastname: None,
            email: email.to_string(),
            application: "mail".to_string(),
        }
    }

    #[test]
    fn test_mail_requires_name_and_email() {
        let validator = validator_for(Application::Mail);
        validator.validate(&client("Anna", "anna@example.com")).unwrap();

        for (name, email) in [("", "anna@example.com"), ("Anna", "  "), (" ", "")] {
            let err = validator.validate(&client(name, email)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
            assert_eq!(err.kind().status(), 409);
        }
    }
}
