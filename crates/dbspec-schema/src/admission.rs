//! Boundary with the provisioning controller.
//!
//! A provisioner only ever receives a [`ValidatedDatabase`]; an invalid
//! document stops at [`AdmissionError::Rejected`] before any provisioning
//! call is made.

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::errors::{SchemaError, ValidationReport};
use crate::validate::{SpecValidator, ValidatedDatabase};

/// Backend that acts on accepted specifications.
pub trait Provisioner {
    type Error: std::error::Error + 'static;

    fn provision(&self, database: &ValidatedDatabase) -> Result<(), Self::Error>;
}

/// Why a document did not reach, or did not survive, provisioning.
#[derive(Debug, Error)]
pub enum AdmissionError<E: std::error::Error + 'static> {
    #[error("specification rejected with {} violation(s)", .0.errors.len())]
    Rejected(ValidationReport),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("provisioning failed: {0}")]
    Provision(#[source] E),
}

/// Validate a document and hand it to the provisioner only when it is valid.
pub fn admit_and_provision<P: Provisioner>(
    document: &Value,
    provisioner: &P,
) -> Result<ValidatedDatabase, AdmissionError<P::Error>> {
    let validator = SpecValidator::shared()?;
    let validated = match validator.validate_database(document) {
        Ok(validated) => validated,
        Err(report) => {
            warn!(
                event = "provisioning_rejected",
                errors = report.errors.len()
            );
            return Err(AdmissionError::Rejected(report));
        }
    };

    info!(
        event = "provisioning_admitted",
        name = %validated.database().metadata.name,
        warnings = validated.warnings().len()
    );
    provisioner
        .provision(&validated)
        .map_err(AdmissionError::Provision)?;
    Ok(validated)
}
