//! Registration manifest for the database resource kind.

use dbspec_core::{API_GROUP, API_VERSION, KIND, PLURAL, SHORT_NAME, SINGULAR};
use serde::Serialize;
use serde_json::Value;

use crate::errors::Result;
use crate::render::to_openapi_v3;
use crate::rules::database_schema;

/// `apiextensions.k8s.io/v1` CustomResourceDefinition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomResourceDefinition {
    pub api_version: String,
    pub kind: String,
    pub metadata: CrdMetadata,
    pub spec: CrdSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrdMetadata {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrdSpec {
    pub group: String,
    pub names: CrdNames,
    pub scope: String,
    pub versions: Vec<CrdVersion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdNames {
    pub kind: String,
    pub list_kind: String,
    pub plural: String,
    pub singular: String,
    pub short_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdVersion {
    pub name: String,
    pub served: bool,
    pub storage: bool,
    pub schema: CrdValidation,
    pub additional_printer_columns: Vec<PrinterColumn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrdValidation {
    #[serde(rename = "openAPIV3Schema")]
    pub open_api_v3_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub json_path: String,
}

impl PrinterColumn {
    fn new(name: &str, column_type: &str, json_path: &str) -> Self {
        Self {
            name: name.to_string(),
            column_type: column_type.to_string(),
            json_path: json_path.to_string(),
        }
    }
}

/// Manifest registering the database kind with its structural schema.
pub fn database_crd() -> CustomResourceDefinition {
    CustomResourceDefinition {
        api_version: "apiextensions.k8s.io/v1".to_string(),
        kind: "CustomResourceDefinition".to_string(),
        metadata: CrdMetadata {
            name: format!("{PLURAL}.{API_GROUP}"),
        },
        spec: CrdSpec {
            group: API_GROUP.to_string(),
            names: CrdNames {
                kind: KIND.to_string(),
                list_kind: format!("{KIND}List"),
                plural: PLURAL.to_string(),
                singular: SINGULAR.to_string(),
                short_names: vec![SHORT_NAME.to_string()],
            },
            scope: "Namespaced".to_string(),
            versions: vec![CrdVersion {
                name: API_VERSION.to_string(),
                served: true,
                storage: true,
                schema: CrdValidation {
                    open_api_v3_schema: to_openapi_v3(database_schema()),
                },
                additional_printer_columns: vec![
                    PrinterColumn::new("Engine", "string", ".spec.engine"),
                    PrinterColumn::new("Class", "string", ".spec.class"),
                    PrinterColumn::new("Size", "integer", ".spec.size"),
                    PrinterColumn::new("Storage", "string", ".spec.storageType"),
                ],
            }],
        },
    }
}

/// The registration manifest as YAML.
pub fn database_crd_yaml() -> Result<String> {
    Ok(serde_yaml::to_string(&database_crd())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_names_the_resource_kind() {
        let crd = database_crd();
        assert_eq!(crd.metadata.name, "databases.dbspec.io");
        assert_eq!(crd.spec.names.kind, "Database");
        assert_eq!(crd.spec.versions.len(), 1);
        assert!(crd.spec.versions[0].served && crd.spec.versions[0].storage);
    }

    #[test]
    fn manifest_embeds_the_structural_schema() {
        let value = serde_json::to_value(database_crd()).expect("serialize crd");
        let schema = &value["spec"]["versions"][0]["schema"]["openAPIV3Schema"];
        assert_eq!(schema["properties"]["spec"]["properties"]["size"]["maximum"], 64000);
        assert!(schema.get("$schema").is_none());
        assert_eq!(
            value["spec"]["versions"][0]["additionalPrinterColumns"][0]["jsonPath"],
            ".spec.engine"
        );
    }

    #[test]
    fn manifest_renders_as_yaml() {
        let yaml = database_crd_yaml().expect("render yaml");
        assert!(yaml.contains("kind: CustomResourceDefinition"));
        assert!(yaml.contains("openAPIV3Schema:"));
    }
}
