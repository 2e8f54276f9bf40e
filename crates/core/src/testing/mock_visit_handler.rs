//! Mock visit handler for testing.

use std::collections::HashMap;
use std::sync::Mutex;

use super::lock;
use crate::tracker::{DbError, ForcedOverrides, Params};
use crate::visit::{Visit, VisitError, VisitHandler};

/// A recorded visit for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedVisit {
    /// Parameters of the request.
    pub params: Params,
    /// Overrides handed to the handler.
    pub overrides: ForcedOverrides,
    /// Whether the request was authenticated.
    pub authenticated: bool,
    /// Whether the handler succeeded.
    pub success: bool,
}

#[derive(Debug, Clone)]
enum Failure {
    Processing(String),
    Db(DbError),
}

/// Mock implementation of the VisitHandler trait.
///
/// Records every call and fails for configured sites.
#[derive(Debug, Default)]
pub struct MockVisitHandler {
    visits: Mutex<Vec<RecordedVisit>>,
    failures: Mutex<HashMap<u64, Failure>>,
}

impl MockVisitHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hits for `id_site` fail with a processing error.
    pub fn fail_site(&self, id_site: u64, message: &str) {
        lock(&self.failures).insert(id_site, Failure::Processing(message.to_string()));
    }

    /// Hits for `id_site` fail with a database error.
    pub fn fail_site_with_db_error(&self, id_site: u64, error: DbError) {
        lock(&self.failures).insert(id_site, Failure::Db(error));
    }

    pub fn recorded_visits(&self) -> Vec<RecordedVisit> {
        lock(&self.visits).clone()
    }

    pub fn visit_count(&self) -> usize {
        lock(&self.visits).len()
    }

    pub fn clear_recorded_visits(&self) {
        lock(&self.visits).clear();
    }
}

impl VisitHandler for MockVisitHandler {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn handle(&self, visit: &Visit<'_>) -> Result<(), VisitError> {
        let failure = visit
            .request
            .id_site()
            .and_then(|id| lock(&self.failures).get(&id).cloned());

        lock(&self.visits).push(RecordedVisit {
            params: visit.request.params().clone(),
            overrides: visit.overrides.clone(),
            authenticated: visit.request.is_authenticated(),
            success: failure.is_none(),
        });

        match failure {
            None => Ok(()),
            Some(Failure::Processing(message)) => Err(VisitError::Processing(message)),
            Some(Failure::Db(error)) => Err(VisitError::Database(error)),
        }
    }
}
