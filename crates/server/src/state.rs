use std::sync::Arc;
use std::time::Duration;

use siren_maintenance::{MaintenanceEvaluator, StatusSweeper};
use siren_resolver::{CarrierResolver, CustomerResolver, EquipmentResolver};
use siren_routing::{AlertRouter, HandlerDeps, LogNotifier, default_registry};
use siren_store::{
    ActiveEscalationStore, AuditLogStore, CarrierStore, CustomerStore, CustomerTierStore,
    EquipmentTypeStore, EscalationPolicyStore, MaintenanceWindowStore, RoutingRuleStore,
    ScheduleStore, SiteStore, TeamStore,
};
use siren_store_memory::{
    InMemoryAuditLogStore, InMemoryCarrierStore, InMemoryCustomerStore,
    InMemoryCustomerTierStore, InMemoryEquipmentTypeStore, InMemoryEscalationPolicyStore,
    InMemoryMaintenanceWindowStore, InMemoryRoutingRuleStore, InMemoryScheduleStore,
    InMemorySiteStore, InMemoryTeamStore, UnimplementedActiveEscalationStore,
};

use crate::config::SirenConfig;
use crate::error::ApiError;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<dyn RoutingRuleStore>,
    pub audit: Arc<dyn AuditLogStore>,
    pub tiers: Arc<dyn CustomerTierStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub equipment: Arc<dyn EquipmentTypeStore>,
    pub sites: Arc<dyn SiteStore>,
    pub teams: Arc<dyn TeamStore>,
    pub carriers: Arc<dyn CarrierStore>,
    pub schedules: Arc<dyn ScheduleStore>,
    pub windows: Arc<dyn MaintenanceWindowStore>,
    pub policies: Arc<dyn EscalationPolicyStore>,
    pub active_escalations: Arc<dyn ActiveEscalationStore>,

    pub router: Arc<AlertRouter>,
    pub maintenance: Arc<MaintenanceEvaluator>,
    pub customer_resolver: Arc<CustomerResolver>,
    pub equipment_resolver: Arc<EquipmentResolver>,
    pub carrier_resolver: Arc<CarrierResolver>,

    /// Held so the window sweeper lives as long as the server.
    pub window_sweeper: Arc<StatusSweeper>,
}

impl AppState {
    /// Wire the full pipeline against the in-memory reference backends.
    pub fn in_memory(config: &SirenConfig) -> Result<Self, ApiError> {
        let rules: Arc<dyn RoutingRuleStore> = Arc::new(InMemoryRoutingRuleStore::new());
        let audit: Arc<dyn AuditLogStore> = Arc::new(InMemoryAuditLogStore::new());
        let tiers: Arc<dyn CustomerTierStore> = Arc::new(InMemoryCustomerTierStore::new());
        let customers: Arc<dyn CustomerStore> = Arc::new(InMemoryCustomerStore::new());
        let equipment: Arc<dyn EquipmentTypeStore> = Arc::new(InMemoryEquipmentTypeStore::new());
        let sites: Arc<dyn SiteStore> = Arc::new(InMemorySiteStore::new());
        let teams: Arc<dyn TeamStore> = Arc::new(InMemoryTeamStore::new());
        let carriers: Arc<dyn CarrierStore> = Arc::new(InMemoryCarrierStore::new());
        let schedules: Arc<dyn ScheduleStore> = Arc::new(InMemoryScheduleStore::new());
        let windows: Arc<dyn MaintenanceWindowStore> =
            Arc::new(InMemoryMaintenanceWindowStore::new());
        let policies: Arc<dyn EscalationPolicyStore> =
            Arc::new(InMemoryEscalationPolicyStore::new());

        let resolver_config = config.resolver.to_resolver_config();
        let customer_resolver = Arc::new(CustomerResolver::new(
            Arc::clone(&customers),
            Arc::clone(&tiers),
            &resolver_config,
        ));
        let equipment_resolver = Arc::new(EquipmentResolver::new(
            Arc::clone(&equipment),
            &resolver_config,
        ));
        let carrier_resolver = Arc::new(CarrierResolver::new(
            Arc::clone(&carriers),
            &resolver_config,
        ));

        let maintenance = Arc::new(MaintenanceEvaluator::new(Arc::clone(&windows)));
        let window_sweeper = Arc::new(StatusSweeper::spawn(
            Arc::clone(&windows),
            Duration::from_secs(1),
        ));

        let registry = default_registry(HandlerDeps {
            dispatcher: Arc::new(LogNotifier),
            sink: Arc::new(LogNotifier),
            launcher: Arc::new(LogNotifier),
            tickets: Arc::new(LogNotifier),
            schedules: Arc::clone(&schedules),
        });

        let router = Arc::new(
            AlertRouter::builder()
                .rules(Arc::clone(&rules))
                .audit(Arc::clone(&audit))
                .registry(registry)
                .executor_config(config.executor.to_executor_config())
                .maintenance(Arc::clone(&maintenance))
                .customers(Arc::clone(&customer_resolver))
                .equipment(Arc::clone(&equipment_resolver))
                .build()
                .map_err(|e| ApiError::Internal(e.to_string()))?,
        );

        Ok(Self {
            rules,
            audit,
            tiers,
            customers,
            equipment,
            sites,
            teams,
            carriers,
            schedules,
            windows,
            policies,
            active_escalations: Arc::new(UnimplementedActiveEscalationStore),
            router,
            maintenance,
            customer_resolver,
            equipment_resolver,
            carrier_resolver,
            window_sweeper,
        })
    }

    /// Stop every background task this state owns.
    pub fn shutdown(&self) {
        self.window_sweeper.stop();
        self.customer_resolver.stop();
        self.equipment_resolver.stop();
        self.carrier_resolver.stop();
    }
}
