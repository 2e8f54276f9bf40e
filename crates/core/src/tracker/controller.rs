//! Batch orchestration: intake, authentication, per-item state machine,
//! visit delegation and the scheduled-task gate.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::bulk::{authenticate_bulk, BulkBatch};
use super::context::TrackerContext;
use super::intake::{read_input, Intake, Params, RawInput};
use super::outcome::{BatchMode, BatchOutcome};
use super::request::{
    parse_forced_datetime, parse_forced_ip, parse_forced_visitor_id, parse_site_id,
    ForcedOverrides, TrackerRequest,
};
use super::response::{emit, TrackerResponse};
use super::{PipelineState, TrackerError};
use crate::auth::SiteAuthenticator;
use crate::config::{Config, DatabaseConfig, TrackerConfig};
use crate::metrics::{BATCHES_TOTAL, FAILURES_TOTAL, HITS_TOTAL, TRACKED_TOTAL};
use crate::plugins::{PluginRegistry, TrackerPlugin};
use crate::scheduler::{ScheduledTaskGate, TaskRunner};
use crate::store::OptionStore;
use crate::visit::{SiteVisitHandler, Visit, VisitHandler};

/// The tracker pipeline. Shared between requests; every batch gets its own
/// [`TrackerContext`].
pub struct Tracker {
    config: TrackerConfig,
    database: DatabaseConfig,
    authenticator: Arc<dyn SiteAuthenticator>,
    visits: Arc<dyn VisitHandler>,
    plugins: PluginRegistry,
    gate: ScheduledTaskGate,
}

impl Tracker {
    pub fn new(
        config: &Config,
        authenticator: Arc<dyn SiteAuthenticator>,
        options: Arc<dyn OptionStore>,
        runner: Arc<dyn TaskRunner>,
    ) -> Self {
        Self {
            config: config.tracker.clone(),
            database: config.database.clone(),
            authenticator,
            visits: Arc::new(SiteVisitHandler::new()),
            plugins: PluginRegistry::new(),
            gate: ScheduledTaskGate::from_config(config, options, runner),
        }
    }

    /// Replace the default visit handler.
    pub fn with_visit_handler(mut self, handler: Arc<dyn VisitHandler>) -> Self {
        self.visits = handler;
        self
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn TrackerPlugin>) -> Self {
        self.plugins.register(plugin);
        self
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Run one batch and build its response.
    pub fn main(&self, input: &RawInput) -> TrackerResponse {
        let outcome = self.process(input);
        emit(&outcome, input)
    }

    /// Run one batch to completion.
    pub fn process(&self, input: &RawInput) -> BatchOutcome {
        let mut ctx = TrackerContext::new(self.is_debug(input));

        let intake = match read_input(input) {
            Ok(intake) => intake,
            Err(e) => return self.reject(ctx, e),
        };

        let (mode, requests, bulk) = match intake {
            Intake::Single(requests) => (BatchMode::Single, requests, None),
            Intake::Bulk(request) => match authenticate_bulk(request, self.authenticator.as_ref()) {
                Ok(mut batch) => {
                    ctx.print_debug(format!(
                        "Bulk import authenticated for {} site(s)",
                        batch.sites.len()
                    ));
                    let requests = std::mem::take(&mut batch.requests);
                    (BatchMode::Bulk, requests, Some(batch))
                }
                Err(e) => return self.reject(ctx, e.into()),
            },
        };

        BATCHES_TOTAL.with_label_values(&[mode.as_str()]).inc();
        let mut outcome = BatchOutcome::new(mode, ctx.is_debug());
        outcome.items = requests.len();
        outcome.authenticated = bulk.is_some();

        if requests.is_empty() && mode == BatchMode::Single {
            ctx.print_debug("No tracking parameters received");
            outcome.state = PipelineState::EmptyRequest;
            HITS_TOTAL.with_label_values(&[outcome.state.as_str()]).inc();
            outcome.output = ctx.into_output();
            return outcome;
        }

        for (index, params) in requests.into_iter().enumerate() {
            let (request, verified) = match &bulk {
                Some(batch) => self.bulk_request(params, batch),
                None => self.single_request(params),
            };
            if mode == BatchMode::Single && verified {
                outcome.authenticated = true;
            }

            let state = PipelineState::classify(self.config.record_statistics, request.params_count());
            HITS_TOTAL.with_label_values(&[state.as_str()]).inc();
            outcome.state = state;

            if let Err(e) = self.track_request(&mut ctx, &request, state) {
                warn!(index, error = %e, "Tracking request failed");
                FAILURES_TOTAL.with_label_values(&[e.kind()]).inc();
                ctx.print_debug(format!("Request {index} failed: {}", e.public_message()));
                outcome.record_failure(Some(index), e);
            }
            if state.is_valid() {
                outcome.tracked += 1;
                TRACKED_TOTAL.inc();
            }
        }

        ctx.db.close();

        if !outcome.authenticated && outcome.state != PipelineState::LoggingDisabled {
            match self.gate.evaluate(Utc::now(), &ctx.access) {
                Ok(decision) => {
                    ctx.print_debug(format!("Scheduled tasks: {}", decision.as_str()));
                    outcome.gate = Some(decision);
                }
                Err(e) => {
                    warn!(error = %e, "Scheduled tasks failed");
                    let error = TrackerError::from(e);
                    ctx.print_debug(format!("Scheduled tasks failed: {}", error.public_message()));
                    FAILURES_TOTAL.with_label_values(&[error.kind()]).inc();
                    outcome.record_failure(None, error);
                }
            }
        } else {
            ctx.print_debug("Scheduled tasks skipped for this batch");
        }

        debug!(
            mode = mode.as_str(),
            items = outcome.items,
            tracked = outcome.tracked,
            failures = outcome.failures.len(),
            state = %outcome.state,
            "Tracking batch processed"
        );
        outcome.output = ctx.into_output();
        outcome
    }

    /// Outcome for a batch refused before any item was processed.
    fn reject(&self, mut ctx: TrackerContext, error: TrackerError) -> BatchOutcome {
        warn!(error = %error, "Bulk tracking request rejected");
        BATCHES_TOTAL.with_label_values(&[BatchMode::Bulk.as_str()]).inc();
        FAILURES_TOTAL.with_label_values(&[error.kind()]).inc();
        ctx.print_debug(error.public_message());

        let mut outcome = BatchOutcome::new(BatchMode::Bulk, ctx.is_debug());
        outcome.record_failure(None, error);
        outcome.output = ctx.into_output();
        outcome
    }

    fn is_debug(&self, input: &RawInput) -> bool {
        self.config.debug
            || (self.config.debug_on_demand && input.query_param("debug") == Some("1"))
    }

    /// Items of a bulk batch inherit the batch token and are authenticated
    /// when their site was validated.
    fn bulk_request(&self, params: Params, batch: &BulkBatch) -> (TrackerRequest, bool) {
        let validated = params
            .get("idsite")
            .and_then(|raw| parse_site_id(raw))
            .is_some_and(|id| batch.is_site_validated(id));
        let request = TrackerRequest::new(params, Some(batch.token.clone()), validated);
        (request, validated)
    }

    /// Returns the request and whether its token was verified.
    fn single_request(&self, params: Params) -> (TrackerRequest, bool) {
        let token = params.get("token_auth").cloned().filter(|t| !t.is_empty());
        let verified = match (&token, params.get("idsite").and_then(|raw| parse_site_id(raw))) {
            (Some(token), Some(id_site)) => self.authenticator.authenticate(token, id_site),
            _ => false,
        };
        let authenticated = verified || !self.config.tracking_requests_require_authentication;
        (TrackerRequest::new(params, token, authenticated), verified)
    }

    fn track_request(
        &self,
        ctx: &mut TrackerContext,
        request: &TrackerRequest,
        state: PipelineState,
    ) -> Result<(), TrackerError> {
        let overrides = self.forced_overrides(ctx, request);
        ctx.set_overrides(overrides);

        let excluded: &[String] = if request.is_authenticated() && request.flag("dp") {
            &self.config.import_excluded_plugins
        } else {
            &[]
        };
        let plugins = self.plugins.load(excluded);

        if !state.is_valid() {
            ctx.print_debug(format!("Request skipped: {state}"));
            ctx.take_overrides();
            return Ok(());
        }

        plugins
            .prepare(request)
            .map_err(|e| TrackerError::Processing(e.to_string()))?;

        let overrides = ctx.take_overrides();
        let conn = ctx
            .db
            .connection(|| plugins.database_config(&self.database))?;
        let handler = plugins.visit_handler(&self.visits);
        let visit = Visit {
            request,
            overrides,
            db: conn,
        };
        handler.handle(&visit)?;
        Ok(())
    }

    fn forced_overrides(&self, ctx: &mut TrackerContext, request: &TrackerRequest) -> ForcedOverrides {
        let mut overrides = ForcedOverrides::default();
        let requested = ["cip", "cdt", "cid"]
            .iter()
            .any(|name| request.param(name).is_some());
        if !requested {
            return overrides;
        }
        if !request.is_authenticated() {
            ctx.print_debug("Tracking overrides ignored: request is not authenticated");
            return overrides;
        }

        if let Some(raw) = request.param("cip") {
            overrides.ip = parse_forced_ip(raw);
            if overrides.ip.is_none() {
                ctx.print_debug(format!("Ignoring invalid cip '{raw}'"));
            }
        }
        if let Some(raw) = request.param("cdt") {
            overrides.datetime = parse_forced_datetime(raw);
            if overrides.datetime.is_none() {
                ctx.print_debug(format!("Ignoring invalid cdt '{raw}'"));
            }
        }
        if let Some(raw) = request.param("cid") {
            overrides.visitor_id = parse_forced_visitor_id(raw);
            if overrides.visitor_id.is_none() {
                ctx.print_debug(format!("Ignoring invalid cid '{raw}'"));
            }
        }
        overrides
    }
}
