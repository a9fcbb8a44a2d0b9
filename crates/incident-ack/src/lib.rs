//! Bulk acknowledge or resolve Coralogix incidents.
//!
//! A run lists open incidents through `grpcurl`, groups them by alert name,
//! asks the operator once, then mutates them in fixed-size batches and
//! reports how many succeeded.
//!
//! # Usage
//!
//! ```no_run
//! use incident_ack::{confirm, pipeline, GrpcurlTransport, Overrides, Settings};
//!
//! # async fn demo() -> Result<(), incident_ack::Error> {
//! let settings = Settings::resolve(&Overrides::default())?;
//! let transport = GrpcurlTransport::new(&settings);
//! transport.ensure_available()?;
//!
//! let mut confirmer = confirm::for_stdin(settings.assume_yes);
//! let outcome = pipeline::run(&settings, &transport, confirmer.as_mut(), chrono::Utc::now()).await?;
//! println!("exit code {}", outcome.exit_code());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`Transport`] is the seam to the remote service; [`GrpcurlTransport`]
//!   shells out to `grpcurl`
//! - [`selector`] pages through `ListIncidents`, filters and groups
//! - [`confirm::Confirmer`] is the operator gate
//! - [`mutator::BatchMutator`] sends the mutating calls
//! - [`pipeline::run`] ties one run together

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod config;
pub mod confirm;
pub mod error;
pub mod models;
pub mod mutator;
pub mod pipeline;
pub mod selector;
pub mod transport;
pub mod ui;

pub use config::{Action, ApiKey, Mode, Overrides, Region, Settings, StatusFilter};
pub use error::Error;
pub use models::{AlertGroup, AlertSummary, BatchResult, Incident, IncidentState, IncidentStatus, Severity};
pub use pipeline::{run, RunOutcome};
pub use transport::{GrpcurlTransport, RpcMethod, Transport};
