//! CLI argument definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::DirectiveBasis;
use crate::reconcile::PassOptions;

/// Top-level CLI parser for `rollcall`.
#[derive(Debug, Parser)]
#[command(
    name = "rollcall",
    version,
    about = "Reconcile community rosters against guild members and grant roles"
)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Roster field role names are taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Basis {
    /// The `role_names` column.
    Roles,
    /// The `affinity_groups` column.
    Tags,
}

impl From<Basis> for DirectiveBasis {
    fn from(basis: Basis) -> Self {
        match basis {
            Basis::Roles => Self::RoleNames,
            Basis::Tags => Self::GroupTags,
        }
    }
}

/// Options shared by commands that grant roles.
#[derive(Debug, Clone, Args)]
pub struct GrantArgs {
    /// Grant this role (by exact name) to every matched person instead of roster roles.
    #[arg(long, value_name = "ROLE_NAME")]
    pub role: Option<String>,
    /// Which roster column supplies role names.
    #[arg(long, value_enum, default_value_t = Basis::Roles)]
    pub basis: Basis,
    /// Show what would be granted without changing anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl GrantArgs {
    /// Converts to the options replayed on every pass.
    #[must_use]
    pub fn to_options(&self) -> PassOptions {
        PassOptions {
            override_role: self.role.clone(),
            basis: self.basis.into(),
            dry_run: self.dry_run,
        }
    }
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one reconciliation pass and grant roles.
    Assign {
        /// Roster group key (file name under `rosters/` without `.csv`).
        group: String,
        #[command(flatten)]
        grant: GrantArgs,
    },
    /// Reconcile groups on a fixed interval until interrupted.
    Watch {
        /// Roster group keys.
        #[arg(required = true)]
        groups: Vec<String>,
        /// Seconds between passes (defaults to the configured interval).
        #[arg(long)]
        interval_secs: Option<u64>,
        #[command(flatten)]
        grant: GrantArgs,
    },
    /// List the people the last pass could not find.
    Report {
        /// Roster group key.
        group: String,
    },
    /// Show how each roster record matches, without granting anything.
    Match {
        /// Roster group key.
        group: String,
    },
    /// List roster groups in the data directory.
    Groups,
}
