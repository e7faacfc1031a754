use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::errors::ValidationReport;

/// Emit the JSON Schema for machine-readable validation reports.
pub fn report_json_schema() -> RootSchema {
    schema_for!(ValidationReport)
}
