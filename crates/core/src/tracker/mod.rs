//! The tracker pipeline.
//!
//! A [`RawInput`] is split into logical requests by the intake, bulk imports
//! are authenticated once per referenced site, each request runs through the
//! validity state machine and the visit handler, the scheduled-task gate is
//! evaluated for anonymous traffic, and the [`BatchOutcome`] becomes exactly
//! one [`TrackerResponse`].

mod bulk;
mod context;
mod controller;
mod db;
mod error;
mod intake;
mod outcome;
mod request;
mod response;
mod state;

pub use bulk::{authenticate_bulk, BulkBatch};
pub use context::TrackerContext;
pub use controller::Tracker;
pub use db::LazyDb;
pub use error::{DbError, DbErrorKind, TrackerError, DB_CREDENTIALS_MESSAGE};
pub use intake::{
    decode_bulk, parse_pairs, parse_pairs_lossy, parse_query_string, read_input, url_params,
    BulkRequest, Intake, Params, RawInput,
};
pub use outcome::{BatchMode, BatchOutcome, ItemFailure};
pub use request::{
    parse_forced_datetime, parse_forced_ip, parse_forced_visitor_id, parse_site_id,
    ForcedOverrides, TrackerRequest,
};
pub use response::{
    emit, escape_html, TrackerResponse, CONTENT_TYPE_GIF, CONTENT_TYPE_HTML, CONTENT_TYPE_JSON,
    EMPTY_REQUEST_FRAGMENT, TRANSPARENT_GIF,
};
pub use state::PipelineState;
