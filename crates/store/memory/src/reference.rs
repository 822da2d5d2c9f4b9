use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use siren_core::{Carrier, EquipmentType, Site, Team, normalize_equipment_name};
use siren_store::page::paginate;
use siren_store::{
    CarrierStore, EquipmentTypeStore, Page, PageRequest, SiteStore, StoreError, TeamStore,
};

use crate::{read_guard, write_guard};

/// In-memory site store.
#[derive(Debug, Default)]
pub struct InMemorySiteStore {
    sites: RwLock<HashMap<String, Site>>,
}

impl InMemorySiteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SiteStore for InMemorySiteStore {
    async fn create(&self, site: Site) -> Result<Site, StoreError> {
        if site.code.is_empty() {
            return Err(StoreError::Invalid("site code".into()));
        }
        let mut sites = write_guard(self.sites.write());
        if sites.values().any(|s| s.code == site.code) {
            return Err(StoreError::duplicate("code", &site.code));
        }
        sites.insert(site.id.clone(), site.clone());
        Ok(site)
    }

    async fn get(&self, id: &str) -> Result<Site, StoreError> {
        read_guard(self.sites.read())
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("site", id))
    }

    async fn get_by_code(&self, code: &str) -> Result<Site, StoreError> {
        read_guard(self.sites.read())
            .values()
            .find(|s| s.code == code)
            .cloned()
            .ok_or_else(|| StoreError::not_found("site", code))
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<Site>, StoreError> {
        let mut sites: Vec<Site> = read_guard(self.sites.read()).values().cloned().collect();
        sites.sort_by(|a, b| a.code.cmp(&b.code));
        paginate(sites, page)
    }

    async fn update(&self, mut site: Site) -> Result<Site, StoreError> {
        let mut sites = write_guard(self.sites.write());
        let existing = sites
            .get(&site.id)
            .ok_or_else(|| StoreError::not_found("site", &site.id))?;
        site.created_at = existing.created_at;
        site.updated_at = Utc::now();
        sites.insert(site.id.clone(), site.clone());
        Ok(site)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        write_guard(self.sites.write())
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("site", id))
    }
}

/// In-memory team store.
#[derive(Debug, Default)]
pub struct InMemoryTeamStore {
    teams: RwLock<HashMap<String, Team>>,
}

impl InMemoryTeamStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TeamStore for InMemoryTeamStore {
    async fn create(&self, team: Team) -> Result<Team, StoreError> {
        if team.name.is_empty() {
            return Err(StoreError::Invalid("team name".into()));
        }
        write_guard(self.teams.write()).insert(team.id.clone(), team.clone());
        Ok(team)
    }

    async fn get(&self, id: &str) -> Result<Team, StoreError> {
        read_guard(self.teams.read())
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("team", id))
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<Team>, StoreError> {
        let mut teams: Vec<Team> = read_guard(self.teams.read()).values().cloned().collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        paginate(teams, page)
    }

    async fn update(&self, mut team: Team) -> Result<Team, StoreError> {
        let mut teams = write_guard(self.teams.write());
        let existing = teams
            .get(&team.id)
            .ok_or_else(|| StoreError::not_found("team", &team.id))?;
        team.created_at = existing.created_at;
        team.updated_at = Utc::now();
        teams.insert(team.id.clone(), team.clone());
        Ok(team)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        write_guard(self.teams.write())
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("team", id))
    }
}

/// In-memory carrier store. `asn` is unique.
#[derive(Debug, Default)]
pub struct InMemoryCarrierStore {
    carriers: RwLock<HashMap<String, Carrier>>,
}

impl InMemoryCarrierStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CarrierStore for InMemoryCarrierStore {
    async fn create(&self, carrier: Carrier) -> Result<Carrier, StoreError> {
        let mut carriers = write_guard(self.carriers.write());
        if carriers.values().any(|c| c.asn == carrier.asn) {
            return Err(StoreError::duplicate("asn", carrier.asn));
        }
        carriers.insert(carrier.id.clone(), carrier.clone());
        Ok(carrier)
    }

    async fn get(&self, id: &str) -> Result<Carrier, StoreError> {
        read_guard(self.carriers.read())
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("carrier", id))
    }

    async fn get_by_asn(&self, asn: u32) -> Result<Carrier, StoreError> {
        read_guard(self.carriers.read())
            .values()
            .find(|c| c.asn == asn)
            .cloned()
            .ok_or_else(|| StoreError::not_found("carrier", format!("AS{asn}")))
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<Carrier>, StoreError> {
        let mut carriers: Vec<Carrier> =
            read_guard(self.carriers.read()).values().cloned().collect();
        carriers.sort_by_key(|c| c.asn);
        paginate(carriers, page)
    }

    async fn update(&self, mut carrier: Carrier) -> Result<Carrier, StoreError> {
        let mut carriers = write_guard(self.carriers.write());
        let existing = carriers
            .get(&carrier.id)
            .ok_or_else(|| StoreError::not_found("carrier", &carrier.id))?;
        if carriers
            .values()
            .any(|c| c.asn == carrier.asn && c.id != carrier.id)
        {
            return Err(StoreError::duplicate("asn", carrier.asn));
        }
        carrier.created_at = existing.created_at;
        carrier.updated_at = Utc::now();
        carriers.insert(carrier.id.clone(), carrier.clone());
        Ok(carrier)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        write_guard(self.carriers.write())
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("carrier", id))
    }
}

/// In-memory equipment type store, keyed by normalised name on lookup.
#[derive(Debug, Default)]
pub struct InMemoryEquipmentTypeStore {
    equipment: RwLock<HashMap<String, EquipmentType>>,
}

impl InMemoryEquipmentTypeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EquipmentTypeStore for InMemoryEquipmentTypeStore {
    async fn create(&self, equipment: EquipmentType) -> Result<EquipmentType, StoreError> {
        if equipment.name.is_empty() {
            return Err(StoreError::Invalid("equipment name".into()));
        }
        let mut map = write_guard(self.equipment.write());
        if map.values().any(|e| e.name == equipment.name) {
            return Err(StoreError::duplicate("name", &equipment.name));
        }
        map.insert(equipment.id.clone(), equipment.clone());
        Ok(equipment)
    }

    async fn get(&self, id: &str) -> Result<EquipmentType, StoreError> {
        read_guard(self.equipment.read())
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("equipment type", id))
    }

    async fn get_by_name(&self, name: &str) -> Result<EquipmentType, StoreError> {
        let normalised = normalize_equipment_name(name);
        read_guard(self.equipment.read())
            .values()
            .find(|e| e.name == normalised)
            .cloned()
            .ok_or_else(|| StoreError::not_found("equipment type", normalised))
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<EquipmentType>, StoreError> {
        let mut equipment: Vec<EquipmentType> =
            read_guard(self.equipment.read()).values().cloned().collect();
        equipment.sort_by(|a, b| a.name.cmp(&b.name));
        paginate(equipment, page)
    }

    async fn update(&self, mut equipment: EquipmentType) -> Result<EquipmentType, StoreError> {
        let mut map = write_guard(self.equipment.write());
        let existing = map
            .get(&equipment.id)
            .ok_or_else(|| StoreError::not_found("equipment type", &equipment.id))?;
        equipment.created_at = existing.created_at;
        equipment.updated_at = Utc::now();
        map.insert(equipment.id.clone(), equipment.clone());
        Ok(equipment)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        write_guard(self.equipment.write())
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("equipment type", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_core::EquipmentCategory;

    #[tokio::test]
    async fn carrier_asn_unique() {
        let store = InMemoryCarrierStore::new();
        store.create(Carrier::new("A", 64512)).await.unwrap();
        let err = store.create(Carrier::new("B", 64512)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "asn", .. }));
        assert_eq!(store.get_by_asn(64512).await.unwrap().name, "A");
    }

    #[tokio::test]
    async fn equipment_lookup_normalises() {
        let store = InMemoryEquipmentTypeStore::new();
        store
            .create(EquipmentType::new("Load Balancer", EquipmentCategory::Network))
            .await
            .unwrap();
        let found = store.get_by_name("load-balancer").await.unwrap();
        assert_eq!(found.name, "load_balancer");
    }

    #[tokio::test]
    async fn site_code_unique() {
        let store = InMemorySiteStore::new();
        store.create(Site::new("Ashburn", "us-east-1")).await.unwrap();
        let err = store
            .create(Site::new("Other", "us-east-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "code", .. }));
    }
}
