//! GitHub webhook intake: signature verification, payload parsing, and
//! application of parsed events to the store.

pub mod events;
pub mod handlers;
pub mod parser;
pub mod signature;

pub use events::{GitHubEvent, PrAction, ReviewState};
pub use handlers::{handle_event, IngestOutcome, Ingestion};
pub use parser::{parse_webhook, ParseError};
pub use signature::{sign_payload, verify_signature};
