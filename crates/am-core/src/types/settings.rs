use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Singleton platform configuration row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SystemSettings {
    pub allowed_email_domain: String,
    pub admin_approval_required: bool,
    pub commission_percentage: f64,
    pub payment_system_enabled: bool,
    pub platform_notice: Option<String>,
}

impl SystemSettings {
    /// Applies a partial update field-by-field; absent slots leave the
    /// current value untouched. Returns the names of the fields changed.
    pub fn apply(&mut self, input: UpdateSettingsInput) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(value) = input.allowed_email_domain {
            self.allowed_email_domain = value;
            changed.push("allowed_email_domain");
        }
        if let Some(value) = input.admin_approval_required {
            self.admin_approval_required = value;
            changed.push("admin_approval_required");
        }
        if let Some(value) = input.commission_percentage {
            self.commission_percentage = value;
            changed.push("commission_percentage");
        }
        if let Some(value) = input.payment_system_enabled {
            self.payment_system_enabled = value;
            changed.push("payment_system_enabled");
        }
        if let Some(value) = input.platform_notice {
            self.platform_notice = Some(value);
            changed.push("platform_notice");
        }
        changed
    }
}

/// One optional slot per mutable settings field.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsInput {
    pub allowed_email_domain: Option<String>,
    pub admin_approval_required: Option<bool>,
    pub commission_percentage: Option<f64>,
    pub payment_system_enabled: Option<bool>,
    pub platform_notice: Option<String>,
}
