//! Client side of the quillpress blog API.
//!
//! [`FetchClient`] caches reads keyed by endpoint and session token and shares one
//! request between concurrent readers. Reads that need a token wait behind the
//! [`SessionHandle`] gate. [`AdminClient`] sends writes and refreshes the reads they
//! affect.

pub mod admin;
pub mod auth;
pub mod error;
pub mod fetch;
pub mod forms;
pub mod gate;

pub use admin::AdminClient;
pub use auth::{AuthClient, SignUpOutcome};
pub use error::{ClientError, FetchError};
pub use fetch::{AuthMode, FetchClient, FetchState};
pub use forms::{CategoryForm, PostForm, SubmitGuard, SubmitPermit};
pub use gate::{Credentials, SessionHandle};
