use chrono::{DateTime, Utc};

use siren_cel::{Activation, Value};
use siren_core::{Alert, Customer, EquipmentType, Severity, Site, TierConfig};

/// Everything rule evaluation and action handlers can see about one
/// routing pass: the alert plus whatever enrichment the resolvers
/// produced.
#[derive(Debug, Clone)]
pub struct RouteContext {
    pub alert: Alert,
    /// The evaluation instant. Simulation passes a synthetic time here.
    pub now: DateTime<Utc>,
    pub customer: Option<Customer>,
    /// Effective tier knobs; defaults when no customer or tier resolved.
    pub tier: TierConfig,
    pub equipment: Option<EquipmentType>,
    pub site: Option<Site>,
}

impl RouteContext {
    /// A bare context with no enrichment.
    #[must_use]
    pub fn new(alert: Alert, now: DateTime<Utc>) -> Self {
        Self {
            alert,
            now,
            customer: None,
            tier: TierConfig::default(),
            equipment: None,
            site: None,
        }
    }

    /// Attach a resolved customer and its tier configuration.
    #[must_use]
    pub fn with_customer(mut self, customer: Customer, tier: TierConfig) -> Self {
        self.customer = Some(customer);
        self.tier = tier;
        self
    }

    /// Attach a resolved equipment type.
    #[must_use]
    pub fn with_equipment(mut self, equipment: EquipmentType) -> Self {
        self.equipment = Some(equipment);
        self
    }

    /// Attach a resolved site.
    #[must_use]
    pub fn with_site(mut self, site: Site) -> Self {
        self.site = Some(site);
        self
    }

    /// The alert's severity after the tier's severity boost.
    #[must_use]
    pub fn effective_severity(&self) -> Severity {
        self.alert.severity.boosted(self.tier.severity_boost)
    }

    /// Build the CEL activation for this context.
    ///
    /// Always exposes the `alert_*` bindings; `customer_*` and `site_*`
    /// bindings are added only when the enrichment is present, so
    /// expressions referencing them fail as undefined otherwise.
    #[must_use]
    pub fn activation(&self) -> Activation {
        let mut activation = Activation::new()
            .with_string_map("alert_labels", &self.alert.labels)
            .with_string_map("alert_annotations", &self.alert.annotations)
            .with(
                "alert_severity",
                Value::String(self.effective_severity().to_string()),
            )
            .with(
                "alert_source",
                Value::String(self.alert.source.to_string()),
            )
            .with("alert_id", Value::String(self.alert.id.clone()))
            .with(
                "alert_summary",
                Value::String(self.alert.summary.clone()),
            );

        if let Some(ref customer) = self.customer {
            activation = activation
                .with("customer_id", Value::String(customer.id.clone()))
                .with("customer_name", Value::String(customer.name.clone()))
                .with(
                    "customer_account_id",
                    Value::String(customer.account_id.clone()),
                )
                .with("customer_tier_id", Value::String(customer.tier_id.clone()));
        }
        if let Some(ref site) = self.site {
            activation = activation
                .with("site_id", Value::String(site.id.clone()))
                .with("site_code", Value::String(site.code.clone()))
                .with("site_name", Value::String(site.name.clone()));
        }
        activation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_cel::Program;
    use siren_core::AlertSource;

    fn alert() -> Alert {
        Alert::new("fp", "disk full", AlertSource::Prometheus, Severity::High)
            .with_label("site", "us-east-1")
    }

    #[test]
    fn activation_exposes_alert_fields() {
        let ctx = RouteContext::new(alert(), Utc::now());
        let program = Program::compile(
            r#"alert_severity == "high" && alert_labels["site"] == "us-east-1""#,
        )
        .unwrap();
        assert!(program.eval_bool(&ctx.activation()).unwrap());
    }

    #[test]
    fn customer_fields_absent_without_enrichment() {
        let ctx = RouteContext::new(alert(), Utc::now());
        let program = Program::compile(r#"customer_name == "Acme""#).unwrap();
        assert!(program.eval(&ctx.activation()).is_err());
    }

    #[test]
    fn tier_boost_raises_effective_severity() {
        let customer = Customer::new("Acme", "acct-1", "tier-1");
        let tier = TierConfig {
            escalation_multiplier: 0.5,
            severity_boost: 1,
        };
        let ctx = RouteContext::new(alert(), Utc::now()).with_customer(customer, tier);
        assert_eq!(ctx.effective_severity(), Severity::Critical);

        let program = Program::compile(r#"alert_severity == "critical""#).unwrap();
        assert!(program.eval_bool(&ctx.activation()).unwrap());
    }
}
