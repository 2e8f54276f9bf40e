pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod track;

pub use routes::create_router;
