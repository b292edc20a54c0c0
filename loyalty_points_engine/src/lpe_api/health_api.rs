use std::fmt::Debug;

use crate::traits::{HealthCheck, HealthCheckError};

/// The `HealthApi` reports whether the backing store is reachable.
pub struct HealthApi<B> {
    db: B,
}

impl<B> Debug for HealthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HealthApi")
    }
}

impl<B> HealthApi<B>
where B: HealthCheck
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn check(&self) -> Result<(), HealthCheckError> {
        self.db.ping().await
    }
}
