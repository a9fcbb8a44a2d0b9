//! Command-line surface.

use clap::Parser;

use crate::config::{Mode, Overrides, StatusFilter};

const AFTER_HELP: &str = "\
Examples:
  incident-ack                                   acknowledge last 24h, eu1
  incident-ack \"$KEY\" us2 resolve --mode backlog
  incident-ack --assign-to oncall@example.com --yes
  incident-ack --dry-run --status any --hours 6

Environment:
  CORALOGIX_API_KEY        API key (positional argument wins)
  CORALOGIX_REGION         us1, us2, eu1, eu2, ap1, ap2, ap3 [default: eu1]
  CORALOGIX_ACTION         acknowledge | resolve [default: acknowledge]
  CORALOGIX_MODE           recent | backlog [default: recent]
  CORALOGIX_WINDOW_HOURS   creation-time window in hours
  CORALOGIX_BATCH_SIZE     incidents per mutating call
  CORALOGIX_ASSIGN_TO      assignee email for mutated incidents
  CORALOGIX_ENDPOINT       override the regional gRPC endpoint
  GRPCURL_PATH             grpcurl binary to run [default: grpcurl]
  RUST_LOG                 log filter for stderr diagnostics";

#[derive(Parser, Debug)]
#[command(name = "incident-ack")]
#[command(about = "Bulk acknowledge or resolve Coralogix incidents")]
#[command(version)]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// Coralogix API key
    #[arg(value_name = "API_KEY")]
    pub api_key: Option<String>,

    /// Region code
    #[arg(value_name = "REGION")]
    pub region: Option<String>,

    /// acknowledge or resolve
    #[arg(value_name = "ACTION")]
    pub action: Option<String>,

    /// Operating preset [default: recent]
    #[arg(short, long, value_enum, ignore_case = true)]
    pub mode: Option<Mode>,

    /// Only incidents created in the last N hours
    #[arg(long, value_name = "N")]
    pub hours: Option<u64>,

    /// Incidents per mutating call
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Assign mutated incidents to this user
    #[arg(long, value_name = "EMAIL")]
    pub assign_to: Option<String>,

    /// Status filter [default: triggered for acknowledge, any for resolve]
    #[arg(short, long, value_enum, ignore_case = true)]
    pub status: Option<StatusFilter>,

    /// gRPC endpoint (host:port), overrides the region
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Path to grpcurl
    #[arg(long, value_name = "PATH")]
    pub grpcurl: Option<String>,

    /// Per-call timeout in seconds, 0 for none [default: 60]
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// List matching incidents and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Values given on the command line, for layering over the environment.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            api_key: self.api_key.clone(),
            region: self.region.clone(),
            action: self.action.clone(),
            mode: self.mode,
            window_hours: self.hours,
            batch_size: self.batch_size,
            assign_to: self.assign_to.clone(),
            status: self.status,
            endpoint: self.endpoint.clone(),
            grpcurl: self.grpcurl.clone(),
            timeout_secs: self.timeout_secs,
            assume_yes: self.yes,
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positionals_in_order() {
        let cli = Cli::parse_from(["incident-ack", "key", "us2", "resolve"]);
        let o = cli.overrides();
        assert_eq!(o.api_key.as_deref(), Some("key"));
        assert_eq!(o.region.as_deref(), Some("us2"));
        assert_eq!(o.action.as_deref(), Some("resolve"));
        assert!(!o.assume_yes);
    }

    #[test]
    fn test_value_enums_reject_unknown_choices() {
        assert!(Cli::try_parse_from(["incident-ack", "--mode", "weekly"]).is_err());
        assert!(Cli::try_parse_from(["incident-ack", "--status", "open"]).is_err());

        let cli = Cli::parse_from(["incident-ack", "--mode", "ALL", "--status", "unacknowledged"]);
        assert_eq!(cli.mode, Some(Mode::Backlog));
        assert_eq!(cli.status, Some(StatusFilter::Triggered));
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "incident-ack",
            "--mode",
            "backlog",
            "--hours",
            "6",
            "-b",
            "5",
            "--assign-to",
            "a@b.c",
            "--status",
            "any",
            "--timeout-secs",
            "0",
            "--yes",
            "--dry-run",
        ]);
        let o = cli.overrides();
        assert!(o.api_key.is_none());
        assert_eq!(o.mode, Some(Mode::Backlog));
        assert_eq!(o.window_hours, Some(6));
        assert_eq!(o.batch_size, Some(5));
        assert_eq!(o.assign_to.as_deref(), Some("a@b.c"));
        assert_eq!(o.status, Some(StatusFilter::Any));
        assert_eq!(o.timeout_secs, Some(0));
        assert!(o.assume_yes);
        assert!(o.dry_run);
    }
}
