//! Configuration validation for stack specs.
//!
//! This module provides comprehensive validation of stack configurations,
//! ensuring all node definitions are valid and consistent before any graph
//! resolution or provider interaction.

use crate::error::{ConfigError, Result, SitestackError};
use crate::graph::{ParamValue, ResourceKind, ResourceNode};
use std::collections::HashSet;
use tracing::debug;

use super::spec::StackConfig;

/// Certificates used by a CDN distribution must live in this region.
const CERTIFICATE_REGION: &str = "us-east-1";

/// Validator for stack configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all issues found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationIssue>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationIssue {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a stack configuration.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the first validation issue if any were found.
    pub fn validate(&self, config: &StackConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_project(config, &mut result);
        Self::validate_resources(&config.resources, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first = &result.errors[0];
            Err(SitestackError::Config(ConfigError::ValidationError {
                message: first.message.clone(),
                field: Some(first.field.clone()),
            }))
        }
    }

    /// Validates project configuration.
    fn validate_project(config: &StackConfig, result: &mut ValidationResult) {
        if config.project.name.is_empty() {
            result.errors.push(ValidationIssue {
                field: String::from("project.name"),
                message: String::from("Project name cannot be empty"),
            });
        } else if !is_valid_name(&config.project.name) {
            result.errors.push(ValidationIssue {
                field: String::from("project.name"),
                message: format!(
                    "Project name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                    config.project.name
                ),
            });
        }

        if config.resources.is_empty() {
            result
                .warnings
                .push(String::from("No resources declared; plans will be empty"));
        }
    }

    /// Validates the declared resource nodes.
    fn validate_resources(resources: &[ResourceNode], result: &mut ValidationResult) {
        let mut seen = HashSet::new();
        let declared: HashSet<&str> = resources.iter().map(|r| r.name.as_str()).collect();

        for (i, node) in resources.iter().enumerate() {
            let field = format!("resources[{i}]");

            if node.name.is_empty() {
                result.errors.push(ValidationIssue {
                    field: format!("{field}.name"),
                    message: String::from("Resource name cannot be empty"),
                });
            } else if !is_valid_name(&node.name) {
                result.errors.push(ValidationIssue {
                    field: format!("{field}.name"),
                    message: format!(
                        "Resource name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                        node.name
                    ),
                });
            }

            if !seen.insert(node.name.as_str()) {
                result.errors.push(ValidationIssue {
                    field: format!("{field}.name"),
                    message: format!("Duplicate resource name: {}", node.name),
                });
            }

            Self::validate_schema(node, &field, result);
            Self::validate_references(node, &declared, &field, result);
            Self::validate_kind_specifics(node, &field, result);
        }
    }

    /// Checks required/optional parameters against the per-kind schema.
    fn validate_schema(node: &ResourceNode, field: &str, result: &mut ValidationResult) {
        for spec in node.kind.required_params() {
            match node.params.get(spec.name) {
                None => {
                    result.errors.push(ValidationIssue {
                        field: format!("{field}.params.{}", spec.name),
                        message: format!(
                            "{} '{}' is missing required parameter '{}'",
                            node.kind, node.name, spec.name
                        ),
                    });
                }
                Some(value) => {
                    let is_ref = matches!(value, ParamValue::Reference { .. });
                    if is_ref != spec.is_ref {
                        let expected = if spec.is_ref { "a reference" } else { "a literal" };
                        result.errors.push(ValidationIssue {
                            field: format!("{field}.params.{}", spec.name),
                            message: format!(
                                "Parameter '{}' of '{}' must be {expected}",
                                spec.name, node.name
                            ),
                        });
                    }
                }
            }
        }

        let known: HashSet<&str> = node
            .kind
            .required_params()
            .iter()
            .chain(node.kind.optional_params())
            .map(|s| s.name)
            .collect();

        for name in node.params.keys() {
            if !known.contains(name.as_str()) {
                result.warnings.push(format!(
                    "{} '{}' has unknown parameter '{name}'",
                    node.kind, node.name
                ));
            }
        }
    }

    /// Checks that references point at declared resources.
    ///
    /// The resolver enforces this again on the node set it is given; catching
    /// it here yields a field-level message before any graph work.
    fn validate_references(
        node: &ResourceNode,
        declared: &HashSet<&str>,
        field: &str,
        result: &mut ValidationResult,
    ) {
        for (param, target) in node.references() {
            if !declared.contains(target) {
                result.errors.push(ValidationIssue {
                    field: format!("{field}.params.{param}"),
                    message: format!(
                        "Resource '{}' references undeclared resource '{target}'",
                        node.name
                    ),
                });
            }
            if target == node.name {
                result.errors.push(ValidationIssue {
                    field: format!("{field}.params.{param}"),
                    message: format!("Resource '{}' references itself", node.name),
                });
            }
        }
    }

    /// Kind-specific checks and warnings.
    fn validate_kind_specifics(node: &ResourceNode, field: &str, result: &mut ValidationResult) {
        match node.kind {
            ResourceKind::Certificate => {
                if let Some(region) = node.literal_str("region")
                    && region != CERTIFICATE_REGION
                {
                    result.warnings.push(format!(
                        "Certificate '{}' is in region '{region}'; CDN distributions only accept certificates from {CERTIFICATE_REGION}",
                        node.name
                    ));
                }
            }
            ResourceKind::Bucket => {
                if node.literal_bool("public_read_access") {
                    result.warnings.push(format!(
                        "Bucket '{}' grants public read access; all stored content will be publicly reachable",
                        node.name
                    ));
                }
            }
            ResourceKind::AssetDeployment => {
                if node
                    .literal_str("source_path")
                    .is_some_and(str::is_empty)
                {
                    result.errors.push(ValidationIssue {
                        field: format!("{field}.params.source_path"),
                        message: format!(
                            "Asset deployment '{}' has an empty source_path",
                            node.name
                        ),
                    });
                }
            }
            ResourceKind::Zone | ResourceKind::Distribution | ResourceKind::AliasRecord => {}
        }
    }
}

impl ValidationResult {
    /// Returns true if no errors were found.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks that a name is lowercase alphanumeric with hyphens or dots.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && !name.starts_with('-')
        && !name.ends_with('-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::spec::{ProjectConfig, StateConfig};
    use crate::graph::RemovalPolicy;

    fn config_with(resources: Vec<ResourceNode>) -> StackConfig {
        StackConfig {
            project: ProjectConfig {
                name: String::from("test-site"),
                environment: String::from("dev"),
                region: None,
            },
            state: StateConfig::default(),
            resources,
        }
    }

    fn full_stack() -> Vec<ResourceNode> {
        vec![
            ResourceNode::new(String::from("zone"), ResourceKind::Zone)
                .with_param("domain_name", "example.com")
                .with_param("existing", true),
            ResourceNode::new(String::from("certificate"), ResourceKind::Certificate)
                .with_param("domain_name", "example.com")
                .with_param("region", "us-east-1")
                .with_ref("hosted_zone", "zone"),
            ResourceNode::new(String::from("site-bucket"), ResourceKind::Bucket)
                .with_param("bucket_name", "www.example.com")
                .with_removal_policy(RemovalPolicy::Destroy),
            ResourceNode::new(String::from("distribution"), ResourceKind::Distribution)
                .with_ref("origin", "site-bucket")
                .with_ref("certificate", "certificate"),
            ResourceNode::new(String::from("www-alias"), ResourceKind::AliasRecord)
                .with_param("record_name", "www.example.com")
                .with_ref("zone", "zone")
                .with_ref("target", "distribution"),
        ]
    }

    #[test]
    fn test_full_stack_is_valid() {
        let validator = ConfigValidator::new();
        let result = validator
            .validate(&config_with(full_stack()))
            .expect("stack should validate");
        assert!(result.is_valid());
    }

    #[test]
    fn test_missing_required_param() {
        let validator = ConfigValidator::new();
        let nodes = vec![ResourceNode::new(
            String::from("certificate"),
            ResourceKind::Certificate,
        )];

        let err = validator
            .validate(&config_with(nodes))
            .expect_err("validation should fail");
        assert!(matches!(
            err,
            SitestackError::Config(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_ref_param_given_as_literal() {
        let validator = ConfigValidator::new();
        let nodes = vec![
            ResourceNode::new(String::from("zone"), ResourceKind::Zone)
                .with_param("domain_name", "example.com"),
            ResourceNode::new(String::from("certificate"), ResourceKind::Certificate)
                .with_param("domain_name", "example.com")
                .with_param("region", "us-east-1")
                // hosted_zone must be a reference, not a literal string
                .with_param("hosted_zone", "zone"),
        ];

        assert!(validator.validate(&config_with(nodes)).is_err());
    }

    #[test]
    fn test_undeclared_reference_rejected() {
        let validator = ConfigValidator::new();
        let nodes = vec![
            ResourceNode::new(String::from("www-alias"), ResourceKind::AliasRecord)
                .with_param("record_name", "www.example.com")
                .with_ref("zone", "zone")
                .with_ref("target", "distribution"),
        ];

        assert!(validator.validate(&config_with(nodes)).is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let validator = ConfigValidator::new();
        let nodes = vec![
            ResourceNode::new(String::from("dup"), ResourceKind::Bucket)
                .with_param("bucket_name", "one"),
            ResourceNode::new(String::from("dup"), ResourceKind::Bucket)
                .with_param("bucket_name", "two"),
        ];

        assert!(validator.validate(&config_with(nodes)).is_err());
    }

    #[test]
    fn test_public_bucket_warns() {
        let validator = ConfigValidator::new();
        let nodes = vec![ResourceNode::new(
            String::from("site-bucket"),
            ResourceKind::Bucket,
        )
        .with_param("bucket_name", "www.example.com")
        .with_param("public_read_access", true)];

        let result = validator
            .validate(&config_with(nodes))
            .expect("stack should validate");
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("public read")));
    }

    #[test]
    fn test_certificate_region_warns() {
        let validator = ConfigValidator::new();
        let mut nodes = full_stack();
        nodes[1] = ResourceNode::new(String::from("certificate"), ResourceKind::Certificate)
            .with_param("domain_name", "example.com")
            .with_param("region", "eu-west-1")
            .with_ref("hosted_zone", "zone");

        let result = validator
            .validate(&config_with(nodes))
            .expect("stack should validate");
        assert!(result.warnings.iter().any(|w| w.contains("us-east-1")));
    }
}
