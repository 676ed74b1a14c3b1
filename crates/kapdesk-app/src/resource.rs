// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    Sectors,
    Companies,
    SectorUsers,
    CompanyUsers,
    Tickets,
    TicketNotes,
}

impl Resource {
    pub const ALL: [Self; 6] = [
        Self::Sectors,
        Self::Companies,
        Self::SectorUsers,
        Self::CompanyUsers,
        Self::Tickets,
        Self::TicketNotes,
    ];

    /// Path segment below `/protected`.
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Sectors => "sector",
            Self::Companies => "company",
            Self::SectorUsers => "sector-user",
            Self::CompanyUsers => "company-user",
            Self::Tickets => "ticket",
            Self::TicketNotes => "ticket-note",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Sectors => "Sectors",
            Self::Companies => "Companies",
            Self::SectorUsers => "Sector Users",
            Self::CompanyUsers => "Company Users",
            Self::Tickets => "Tickets",
            Self::TicketNotes => "Ticket Notes",
        }
    }

    pub const fn singular(self) -> &'static str {
        match self {
            Self::Sectors => "sector",
            Self::Companies => "company",
            Self::SectorUsers | Self::CompanyUsers => "user",
            Self::Tickets => "ticket",
            Self::TicketNotes => "note",
        }
    }
}

/// Identifies one cache slice: a resource plus the list query it was
/// fetched with. Two notes overlays for different tickets never share rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub resource: Resource,
    pub scope: Vec<(String, String)>,
}

impl CacheKey {
    pub fn scoped(resource: Resource, scope: Vec<(String, String)>) -> Self {
        Self { resource, scope }
    }
}

impl From<Resource> for CacheKey {
    fn from(resource: Resource) -> Self {
        Self::scoped(resource, Vec::new())
    }
}

/// Last successful fetch per resource and scope. Slices are replaced
/// wholesale and never shared between keys.
#[derive(Default)]
pub struct ResourceCache {
    slices: HashMap<CacheKey, Box<dyn Any + Send + Sync>>,
    generations: HashMap<CacheKey, u64>,
}

impl fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("generations", &self.generations)
            .finish()
    }
}

impl ResourceCache {
    pub fn replace<E: Send + Sync + 'static>(&mut self, key: impl Into<CacheKey>, items: Vec<E>) {
        let key = key.into();
        let generation = self.generations.entry(key.clone()).or_insert(0);
        *generation = generation.saturating_add(1);
        self.slices.insert(key, Box::new(items));
    }

    /// Empty when nothing was fetched yet or the slice holds another type.
    pub fn slice<E: 'static>(&self, key: impl Into<CacheKey>) -> &[E] {
        self.slices
            .get(&key.into())
            .and_then(|slice| slice.downcast_ref::<Vec<E>>())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn generation(&self, key: impl Into<CacheKey>) -> u64 {
        self.generations.get(&key.into()).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.slices.clear();
        self.generations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheKey, Resource, ResourceCache};

    #[test]
    fn slices_are_isolated_per_resource() {
        let mut cache = ResourceCache::default();
        cache.replace(Resource::SectorUsers, vec!["sector-a".to_owned()]);
        cache.replace(Resource::CompanyUsers, vec!["company-a".to_owned()]);

        assert_eq!(
            cache.slice::<String>(Resource::SectorUsers),
            ["sector-a".to_owned()]
        );
        assert_eq!(
            cache.slice::<String>(Resource::CompanyUsers),
            ["company-a".to_owned()]
        );
        assert!(cache.slice::<String>(Resource::Tickets).is_empty());
    }

    #[test]
    fn replace_swaps_wholesale_and_bumps_generation() {
        let mut cache = ResourceCache::default();
        cache.replace(Resource::Sectors, vec![1_i64, 2, 3]);
        cache.replace(Resource::Sectors, vec![9_i64]);
        assert_eq!(cache.slice::<i64>(Resource::Sectors), [9]);
        assert_eq!(cache.generation(Resource::Sectors), 2);
        assert_eq!(cache.generation(Resource::Companies), 0);
    }

    #[test]
    fn scoped_slices_do_not_leak_between_scopes() {
        let mut cache = ResourceCache::default();
        let first = CacheKey::scoped(
            Resource::TicketNotes,
            vec![("ticket_id".to_owned(), "1".to_owned())],
        );
        let second = CacheKey::scoped(
            Resource::TicketNotes,
            vec![("ticket_id".to_owned(), "2".to_owned())],
        );
        cache.replace(first.clone(), vec!["note for one".to_owned()]);

        assert_eq!(cache.slice::<String>(first), ["note for one".to_owned()]);
        assert!(cache.slice::<String>(second.clone()).is_empty());
        assert!(cache.slice::<String>(Resource::TicketNotes).is_empty());
        assert_eq!(cache.generation(second), 0);
    }

    #[test]
    fn mismatched_type_reads_empty() {
        let mut cache = ResourceCache::default();
        cache.replace(Resource::Sectors, vec![1_i64]);
        assert!(cache.slice::<String>(Resource::Sectors).is_empty());
    }

    #[test]
    fn endpoints_are_distinct() {
        let mut endpoints: Vec<_> = Resource::ALL.iter().map(|r| r.endpoint()).collect();
        endpoints.sort_unstable();
        endpoints.dedup();
        assert_eq!(endpoints.len(), Resource::ALL.len());
    }
}
