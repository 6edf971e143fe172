use crate::common::OAuthApplicationType;
use crate::error::AuthError;

const CLASSIC_SCOPES: &[&str] = &["read", "write"];

/// Resources a scoped OAuth application can request `.read` / `.write` on.
const SCOPED_RESOURCES: &[&str] = &[
    "abilities",
    "addons",
    "analytics",
    "audit_records",
    "automation_actions",
    "business_services",
    "change_events",
    "custom_fields",
    "escalation_policies",
    "event_orchestrations",
    "extension_schemas",
    "extensions",
    "incident_types",
    "incident_workflows",
    "incident_workflows:instances",
    "incidents",
    "licenses",
    "maintenance_windows",
    "notifications",
    "oncalls",
    "priorities",
    "response_plays",
    "rulesets",
    "schedules",
    "service_custom_fields",
    "services",
    "standards",
    "status_dashboards",
    "status_pages",
    "subscribers",
    "tags",
    "teams",
    "templates",
    "users",
    "users:contact_methods",
    "users:sessions",
    "vendors",
    "webhook_subscriptions",
    "workflow_integrations",
    "workflow_integrations:connections",
];

fn is_classic_scope(scope: &str) -> bool {
    CLASSIC_SCOPES.contains(&scope)
}

fn is_scoped_scope(scope: &str) -> bool {
    match scope.rsplit_once('.') {
        Some((resource, "read" | "write")) => SCOPED_RESOURCES.contains(&resource),
        _ => false,
    }
}

/// Reject any scope outside the vocabulary of `app_type`.
pub fn validate_scopes(app_type: OAuthApplicationType, scopes: &[String]) -> Result<(), AuthError> {
    let valid: fn(&str) -> bool = match app_type {
        OAuthApplicationType::Classic => is_classic_scope,
        OAuthApplicationType::Scoped => is_scoped_scope,
    };

    match scopes.iter().find(|scope| !valid(scope.as_str())) {
        Some(scope) => Err(AuthError::InvalidScope {
            scope: scope.clone(),
            app_type,
        }),
        None => Ok(()),
    }
}
