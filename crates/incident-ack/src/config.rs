//! Run configuration.
//!
//! Every field is resolved once at startup with the precedence
//! CLI argument > environment variable > built-in default, and the
//! resulting [`Settings`] is passed by reference to every component.
//! Empty strings from either source count as unset.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Error;
use crate::models::{IncidentState, IncidentStatus};

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "CORALOGIX_API_KEY";
/// Environment variable selecting the region.
pub const ENV_REGION: &str = "CORALOGIX_REGION";
/// Environment variable selecting the action.
pub const ENV_ACTION: &str = "CORALOGIX_ACTION";
/// Environment variable selecting the operating mode.
pub const ENV_MODE: &str = "CORALOGIX_MODE";
/// Environment variable overriding the time window in hours.
pub const ENV_WINDOW_HOURS: &str = "CORALOGIX_WINDOW_HOURS";
/// Environment variable overriding the batch size.
pub const ENV_BATCH_SIZE: &str = "CORALOGIX_BATCH_SIZE";
/// Environment variable naming the assignee.
pub const ENV_ASSIGN_TO: &str = "CORALOGIX_ASSIGN_TO";
/// Environment variable overriding the gRPC endpoint (`host:port`).
pub const ENV_ENDPOINT: &str = "CORALOGIX_ENDPOINT";
/// Environment variable pointing at the grpcurl binary.
pub const ENV_GRPCURL: &str = "GRPCURL_PATH";

const DEFAULT_REGION: Region = Region::Eu1;
const DEFAULT_ACTION: Action = Action::Acknowledge;
const DEFAULT_MODE: Mode = Mode::Recent;
const DEFAULT_GRPCURL: &str = "grpcurl";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Coralogix region; each maps to a fixed gRPC endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Us1,
    Us2,
    Eu1,
    Eu2,
    Ap1,
    Ap2,
    Ap3,
}

impl Region {
    pub const ALL: [Self; 7] = [
        Self::Us1,
        Self::Us2,
        Self::Eu1,
        Self::Eu2,
        Self::Ap1,
        Self::Ap2,
        Self::Ap3,
    ];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Us1 => "us1",
            Self::Us2 => "us2",
            Self::Eu1 => "eu1",
            Self::Eu2 => "eu2",
            Self::Ap1 => "ap1",
            Self::Ap2 => "ap2",
            Self::Ap3 => "ap3",
        }
    }

    /// gRPC endpoint for this region (`host:443`).
    #[must_use]
    pub fn endpoint(self) -> String {
        format!("ng-api-grpc.{}.coralogix.com:443", self.code())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.code() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|r| r.code()).collect();
                Error::InvalidConfig(format!(
                    "invalid region '{s}'. Must be one of: {}",
                    known.join(", ")
                ))
            })
    }
}

/// Transition requested for the selected incidents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Acknowledge,
    Resolve,
}

impl Action {
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::Acknowledge => "acknowledge",
            Self::Resolve => "resolve",
        }
    }

    #[must_use]
    pub fn progressive(self) -> &'static str {
        match self {
            Self::Acknowledge => "Acknowledging",
            Self::Resolve => "Resolving",
        }
    }

    #[must_use]
    pub fn past(self) -> &'static str {
        match self {
            Self::Acknowledge => "acknowledged",
            Self::Resolve => "resolved",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Acknowledge => "Acknowledgment",
            Self::Resolve => "Resolution",
        }
    }

    /// Status filter applied when none is configured explicitly.
    ///
    /// Acknowledging only targets unacknowledged incidents; resolving
    /// targets every open incident.
    #[must_use]
    pub fn default_status_filter(self) -> Option<IncidentStatus> {
        match self {
            Self::Acknowledge => Some(IncidentStatus::Triggered),
            Self::Resolve => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "acknowledge" | "ack" => Ok(Self::Acknowledge),
            "resolve" => Ok(Self::Resolve),
            _ => Err(Error::InvalidConfig(format!(
                "invalid action '{s}'. Must be 'acknowledge' or 'resolve'"
            ))),
        }
    }
}

/// Operating preset: a recent time window with large batches, or the
/// whole backlog with small batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Last 24 hours, batches of 50
    #[value(alias = "filtered")]
    Recent,
    /// Every open incident, batches of 10
    #[value(alias = "all")]
    Backlog,
}

impl Mode {
    #[must_use]
    pub fn default_window_hours(self) -> Option<u64> {
        match self {
            Self::Recent => Some(24),
            Self::Backlog => None,
        }
    }

    #[must_use]
    pub fn default_batch_size(self) -> usize {
        match self {
            Self::Recent => 50,
            Self::Backlog => 10,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recent => write!(f, "recent"),
            Self::Backlog => write!(f, "backlog"),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true).map_err(|_| {
            Error::InvalidConfig(format!("invalid mode '{s}'. Must be 'recent' or 'backlog'"))
        })
    }
}

/// `--status` choices; `Any` lifts the status filter entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    Any,
    #[value(alias = "unacknowledged")]
    Triggered,
    Acknowledged,
    Resolved,
}

impl StatusFilter {
    /// Server status to filter on, if any.
    #[must_use]
    pub fn status(self) -> Option<IncidentStatus> {
        match self {
            Self::Any => None,
            Self::Triggered => Some(IncidentStatus::Triggered),
            Self::Acknowledged => Some(IncidentStatus::Acknowledged),
            Self::Resolved => Some(IncidentStatus::Resolved),
        }
    }
}

/// Bearer credential; never printed and zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw key for the transport call.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Values supplied on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub region: Option<String>,
    pub action: Option<String>,
    pub mode: Option<Mode>,
    pub window_hours: Option<u64>,
    pub batch_size: Option<usize>,
    pub assign_to: Option<String>,
    pub status: Option<StatusFilter>,
    pub endpoint: Option<String>,
    pub grpcurl: Option<String>,
    pub timeout_secs: Option<u64>,
    pub assume_yes: bool,
    pub dry_run: bool,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: ApiKey,
    pub region: Region,
    /// `host:port` the transport connects to
    pub endpoint: String,
    pub action: Action,
    pub mode: Mode,
    /// Only incidents created within this many hours are selected
    pub window_hours: Option<u64>,
    pub batch_size: usize,
    pub assign_to: Option<String>,
    pub state_filter: IncidentState,
    pub status_filter: Option<IncidentStatus>,
    pub grpcurl: String,
    /// Upper bound handed to the transport tool; `None` leaves it unbounded
    pub timeout_secs: Option<u64>,
    pub assume_yes: bool,
    pub dry_run: bool,
}

impl Settings {
    /// Resolve against the process environment.
    pub fn resolve(overrides: &Overrides) -> Result<Self, Error> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    pub fn resolve_with<F>(overrides: &Overrides, env: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |cli: Option<&String>, key: &str| -> Option<String> {
            non_empty(cli.map(String::as_str)).or_else(|| non_empty(env(key).as_deref()))
        };

        let region = pick(overrides.region.as_ref(), ENV_REGION)
            .map(|s| s.parse::<Region>())
            .transpose()?
            .unwrap_or(DEFAULT_REGION);

        let action = pick(overrides.action.as_ref(), ENV_ACTION)
            .map(|s| s.parse::<Action>())
            .transpose()?
            .unwrap_or(DEFAULT_ACTION);

        let mode = match overrides.mode {
            Some(mode) => mode,
            None => non_empty(env(ENV_MODE).as_deref())
                .map(|s| s.parse::<Mode>())
                .transpose()?
                .unwrap_or(DEFAULT_MODE),
        };

        let window_hours = match overrides.window_hours {
            Some(hours) => Some(hours),
            None => parse_number::<u64>(env(ENV_WINDOW_HOURS).as_deref(), ENV_WINDOW_HOURS)?
                .or_else(|| mode.default_window_hours()),
        };
        if window_hours == Some(0) {
            return Err(Error::InvalidConfig(
                "time window must be at least 1 hour".to_string(),
            ));
        }

        let batch_size = match overrides.batch_size {
            Some(size) => size,
            None => parse_number::<usize>(env(ENV_BATCH_SIZE).as_deref(), ENV_BATCH_SIZE)?
                .unwrap_or_else(|| mode.default_batch_size()),
        };
        if batch_size == 0 {
            return Err(Error::InvalidConfig(
                "batch size must be greater than zero".to_string(),
            ));
        }

        let status_filter = overrides
            .status
            .map_or_else(|| action.default_status_filter(), StatusFilter::status);

        let endpoint =
            pick(overrides.endpoint.as_ref(), ENV_ENDPOINT).unwrap_or_else(|| region.endpoint());
        let grpcurl =
            pick(overrides.grpcurl.as_ref(), ENV_GRPCURL).unwrap_or_else(|| DEFAULT_GRPCURL.to_string());
        let timeout_secs = match overrides.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS) {
            0 => None,
            secs => Some(secs),
        };

        let api_key = pick(overrides.api_key.as_ref(), ENV_API_KEY)
            .map(ApiKey::new)
            .ok_or(Error::NoCredential)?;

        Ok(Self {
            api_key,
            region,
            endpoint,
            action,
            mode,
            window_hours,
            batch_size,
            assign_to: pick(overrides.assign_to.as_ref(), ENV_ASSIGN_TO),
            state_filter: IncidentState::Triggered,
            status_filter,
            grpcurl,
            timeout_secs,
            assume_yes: overrides.assume_yes,
            dry_run: overrides.dry_run,
        })
    }

    /// Lower bound on creation time, if a window is configured.
    #[must_use]
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window_hours.map(|hours| {
            i64::try_from(hours)
                .ok()
                .and_then(Duration::try_hours)
                .and_then(|window| now.checked_sub_signed(window))
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_number<T: FromStr>(raw: Option<&str>, key: &str) -> Result<Option<T>, Error> {
    match non_empty(raw) {
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::InvalidConfig(format!("{key} must be a positive integer, got '{v}'"))),
        None => Ok(None),
    }
}
