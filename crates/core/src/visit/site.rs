use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{Visit, VisitError, VisitHandler};

/// Default handler: checks the hit belongs to a registered site and logs it.
///
/// Visitor matching and persistence are left to substituted handlers.
#[derive(Debug, Default)]
pub struct SiteVisitHandler;

impl SiteVisitHandler {
    pub fn new() -> Self {
        Self
    }
}

impl VisitHandler for SiteVisitHandler {
    fn name(&self) -> &'static str {
        "site"
    }

    fn handle(&self, visit: &Visit<'_>) -> Result<(), VisitError> {
        let request = visit.request;
        let Some((id_site, key)) = request
            .id_site()
            .and_then(|id| i64::try_from(id).ok().map(|key| (id, key)))
        else {
            let raw = request.param("idsite").unwrap_or_default();
            return Err(VisitError::Processing(format!("Invalid idSite: '{raw}'")));
        };

        let name: Option<String> = visit
            .db
            .query_row(
                "SELECT name FROM site WHERE idsite = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        let Some(name) = name else {
            return Err(VisitError::Processing(format!("Invalid idSite: '{id_site}'")));
        };

        info!(
            id_site,
            site = %name,
            url = request.param("url").unwrap_or_default(),
            forced_ip = ?visit.overrides.ip,
            forced_time = ?visit.overrides.datetime,
            forced_visitor = ?visit.overrides.visitor_id,
            "Visit recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::initialize_schema;
    use crate::tracker::{ForcedOverrides, Params, TrackerRequest};
    use rusqlite::Connection;

    fn db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        conn.execute("INSERT INTO site (idsite, name) VALUES (1, 'Blog')", [])
            .unwrap();
        conn
    }

    fn request(idsite: &str) -> TrackerRequest {
        let params = Params::from([
            ("idsite".to_string(), idsite.to_string()),
            ("rec".to_string(), "1".to_string()),
        ]);
        TrackerRequest::new(params, None, false)
    }

    #[test]
    fn test_known_site_is_accepted() {
        let conn = db();
        let req = request("1");
        let visit = Visit { request: &req, overrides: ForcedOverrides::default(), db: &conn };
        SiteVisitHandler::new().handle(&visit).unwrap();
    }

    #[test]
    fn test_unknown_or_invalid_site_is_processing_error() {
        let conn = db();
        for idsite in ["2", "abc", "9223372036854775808"] {
            let req = request(idsite);
            let visit = Visit { request: &req, overrides: ForcedOverrides::default(), db: &conn };
            let err = SiteVisitHandler::new().handle(&visit).unwrap_err();
            assert!(matches!(err, VisitError::Processing(ref m) if m.contains(idsite)));
        }
    }

    #[test]
    fn test_missing_schema_is_database_error() {
        let conn = Connection::open_in_memory().unwrap();
        let req = request("1");
        let visit = Visit { request: &req, overrides: ForcedOverrides::default(), db: &conn };
        let err = SiteVisitHandler::new().handle(&visit).unwrap_err();
        assert!(matches!(err, VisitError::Database(_)));
    }
}
