//! HTTP request handling subsystem.
//!
//! # Data Flow
//! ```text
//! Request<Body> from the serving layer
//!     → facade.rs (RequestFacade: Host restore, snapshot, size accounting)
//!         → header.rs (HeaderView: ordered, case-insensitive headers)
//!         → body.rs (InstrumentedBody: post-read hooks tally bytes)
//!         → client_ip.rs (resolve originating address once)
//!         → cookie.rs (Cookie header lookup / append)
//!     → middleware reads and overrides the current view
//!     → consumer reads the body; size() grows with every chunk
//!     → finish() (or into_forward_request() for forwarding)
//! ```

pub mod body;
pub mod client_ip;
pub mod cookie;
pub mod error;
pub mod facade;
pub mod header;
pub mod server;

pub use body::{AfterRead, InstrumentedBody, ReadEvent, ReadOutcome};
pub use client_ip::ClientIpResolver;
pub use cookie::Cookie;
pub use error::{BodyError, ConstructionError, CookieError, HeaderError};
pub use facade::{ArrivalSnapshot, RequestFacade, SizeMeter};
pub use header::HeaderView;
pub use server::HttpServer;
