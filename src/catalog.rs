use async_trait::async_trait;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::Court;
use crate::store::StoreError;

/// Court lookup provided by the external catalog.
#[async_trait]
pub trait CourtDirectory: Send + Sync {
    async fn find_court(&self, id: Ulid) -> Result<Option<Court>, StoreError>;
}

/// In-process court catalog.
#[derive(Default)]
pub struct InMemoryCourts {
    courts: DashMap<Ulid, Court>,
}

impl InMemoryCourts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, court: Court) {
        self.courts.insert(court.id, court);
    }

    /// Returns false if the court is unknown.
    pub fn set_active(&self, id: &Ulid, is_active: bool) -> bool {
        match self.courts.get_mut(id) {
            Some(mut court) => {
                court.is_active = is_active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CourtDirectory for InMemoryCourts {
    async fn find_court(&self, id: Ulid) -> Result<Option<Court>, StoreError> {
        Ok(self.courts.get(&id).map(|c| c.value().clone()))
    }
}
