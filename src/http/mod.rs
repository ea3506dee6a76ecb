//! HTTP API server for driving interviews from a front end
//!
//! - POST /interviews - Start an interview over selected questions
//! - POST /interviews/:id/stop - End the current answer now
//! - POST /interviews/:id/retry-microphone - Retry after a denied microphone
//! - POST /interviews/:id/answer - Submit a typed answer
//! - DELETE /interviews/:id - Leave the interview and release its resources
//! - GET /interviews/:id/status - Live session snapshot
//! - GET /interviews/:id/report - Consultation record once analysis is done
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
