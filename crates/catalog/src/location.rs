use serde::{Deserialize, Serialize};

use shelfkeep_core::{
    Criterion, DomainError, DomainResult, Entity, Filter, LocationId, Predicate, UserId,
};

use crate::contains_ci;

/// A physical location holding stock. Names are unique across the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: LocationId,
    pub name: String,
    pub address: String,
    pub manager: UserId,
}

impl Entity for LocationRecord {
    type Id = LocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl LocationRecord {
    pub fn from_new(id: LocationId, location: NewLocation) -> Self {
        Self {
            id,
            name: location.name,
            address: location.address,
            manager: location.manager,
        }
    }

    pub fn apply_update(&mut self, location: NewLocation) {
        self.name = location.name;
        self.address = location.address;
        self.manager = location.manager;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub address: String,
    pub manager: UserId,
}

impl NewLocation {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("location name cannot be empty"));
        }
        if self.address.trim().is_empty() {
            return Err(DomainError::validation("location address cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSortKey {
    Name,
    Address,
}

impl LocationSortKey {
    pub fn compare(&self, a: &LocationRecord, b: &LocationRecord) -> core::cmp::Ordering {
        match self {
            LocationSortKey::Name => a.name.cmp(&b.name),
            LocationSortKey::Address => a.address.cmp(&b.address),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationCriterion {
    NameContains(String),
    AddressContains(String),
    ManagedBy(UserId),
}

impl Criterion for LocationCriterion {
    type Subject = LocationRecord;

    fn matches(&self, location: &LocationRecord) -> bool {
        match self {
            LocationCriterion::NameContains(needle) => contains_ci(&location.name, needle),
            LocationCriterion::AddressContains(needle) => contains_ci(&location.address, needle),
            LocationCriterion::ManagedBy(user) => location.manager == *user,
        }
    }
}

pub fn name_like(name: Option<&str>) -> Filter<LocationCriterion> {
    name.and_then(|n| Predicate::filter(LocationCriterion::NameContains(n.to_lowercase())))
}

pub fn address_like(address: Option<&str>) -> Filter<LocationCriterion> {
    address.and_then(|a| Predicate::filter(LocationCriterion::AddressContains(a.to_lowercase())))
}

pub fn managed_by(manager: Option<UserId>) -> Filter<LocationCriterion> {
    manager.and_then(|m| Predicate::filter(LocationCriterion::ManagedBy(m)))
}
