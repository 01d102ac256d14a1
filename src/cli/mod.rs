//! CLI argument definitions for cardflow.

use crate::models::CardType;
use clap::{Args, Parser, Subcommand};

/// Version string with the commit and build time injected by build.rs.
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CF_GIT_COMMIT"),
    ", built ",
    env!("CF_BUILD_TIMESTAMP"),
    ")"
);

/// Cardflow - card lifecycle and validation for project boards.
///
/// Start with `cf system init`, create a project, then create and move cards.
#[derive(Parser, Debug)]
#[command(name = "cf")]
#[command(author, version = VERSION, about = "Card lifecycle and validation engine for project boards", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Log filter for diagnostics on stderr (e.g. "debug", "cardflow=trace")
    #[arg(long, global = true, env = "CF_LOG")]
    pub log_level: Option<String>,

    /// Acting user recorded in createdBy/updatedBy
    #[arg(long, global = true, env = "CF_USER")]
    pub user: Option<String>,

    /// Project id (defaults to the `default-project` config key)
    #[arg(short = 'p', long, global = true)]
    pub project: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// System administration commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Developer directory commands
    Developer {
        #[command(subcommand)]
        command: PersonCommands,
    },

    /// Stakeholder directory commands
    Stakeholder {
        #[command(subcommand)]
        command: PersonCommands,
    },

    /// Card commands (tasks, bugs, epics, sprints, proposals, QA)
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },

    /// Show the workflow rules of a card type
    Rules {
        /// Card type (task, bug, epic, sprint, proposal, qa)
        #[arg(value_parser = parse_card_type)]
        card_type: CardType,
    },

    /// Priority table and calculator
    Priority {
        #[command(subcommand)]
        command: PriorityCommands,
    },

    /// Controlled vocabulary lists
    Lists {
        #[command(subcommand)]
        command: ListsCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// MCP server commands
    Mcp {
        #[command(subcommand)]
        command: McpCommands,
    },
}

/// System subcommands
#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Create the data store and seed default vocabularies
    Init,
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project
    Create {
        /// Project id (used in record paths)
        id: String,

        /// Display name (defaults to the id)
        #[arg(long)]
        name: Option<String>,

        /// Card id prefix (defaults to the first three characters of the id)
        #[arg(long)]
        abbreviation: Option<String>,

        /// Point scale: 1-5 or fibonacci
        #[arg(long)]
        scale: Option<String>,

        /// Stakeholder id that validates tasks by default (stk_*)
        #[arg(long)]
        default_validator: Option<String>,
    },

    /// Show a project
    Show {
        /// Project id
        id: String,
    },
}

/// Developer and stakeholder subcommands
#[derive(Subcommand, Debug)]
pub enum PersonCommands {
    /// Add or replace a directory entry
    Add {
        /// Namespaced id (dev_* for developers, stk_* for stakeholders)
        id: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Email address (used to match developers with stakeholders)
        #[arg(long, default_value = "")]
        email: String,

        /// Mark the entry inactive
        #[arg(long)]
        inactive: bool,

        /// Also add the entry to this project's roster
        #[arg(long = "join")]
        join: Option<String>,
    },
}

/// Field input shared by card create and update.
#[derive(Args, Debug, Default)]
pub struct FieldArgs {
    /// Set a field: key=value (value parsed as JSON when possible). Repeatable.
    #[arg(long = "set", short = 's', value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Fields as a JSON object; --set pairs are applied on top
    #[arg(long = "json", value_name = "OBJECT")]
    pub json: Option<String>,
}

/// Card subcommands
#[derive(Subcommand, Debug)]
pub enum CardCommands {
    /// Create a card
    Create {
        /// Card type (task, bug, epic, sprint, proposal, qa)
        #[arg(value_parser = parse_card_type)]
        card_type: CardType,

        #[command(flatten)]
        fields: FieldArgs,

        /// Report every violation without writing
        #[arg(long)]
        validate_only: bool,
    },

    /// Update a card with a partial patch
    Update {
        /// Card type
        #[arg(value_parser = parse_card_type)]
        card_type: CardType,

        /// Card id (e.g. PLN-TSK-0007) or storage key
        id: String,

        #[command(flatten)]
        fields: FieldArgs,

        /// Report every violation without writing
        #[arg(long)]
        validate_only: bool,
    },

    /// Show a card
    Show {
        /// Card type
        #[arg(value_parser = parse_card_type)]
        card_type: CardType,

        /// Card id or storage key
        id: String,
    },

    /// List cards of one type in the project
    List {
        /// Card type
        #[arg(value_parser = parse_card_type)]
        card_type: CardType,
    },

    /// Show which statuses a card can move to and what is missing
    Transitions {
        /// Card type
        #[arg(value_parser = parse_card_type)]
        card_type: CardType,

        /// Card id or storage key
        id: String,
    },
}

/// Priority subcommands
#[derive(Subcommand, Debug)]
pub enum PriorityCommands {
    /// Print the ranked priority table for a scale
    Table {
        /// Scale: 1-5 or fibonacci (defaults to the project's, then config)
        #[arg(long)]
        scale: Option<String>,
    },

    /// Calculate the priority of a business value / effort pair
    Calc {
        /// Business value points
        #[arg(long = "business", short = 'b')]
        business: Option<u32>,

        /// Effort (dev) points
        #[arg(long = "effort", short = 'e')]
        effort: Option<u32>,

        /// Scale: 1-5 or fibonacci (defaults to the project's, then config)
        #[arg(long)]
        scale: Option<String>,
    },
}

/// Vocabulary list subcommands
#[derive(Subcommand, Debug)]
pub enum ListsCommands {
    /// Show the canonical values of a list
    Show {
        /// List kind: taskStatus, bugStatus or bugPriority
        kind: String,
    },

    /// Drop cached list values
    Invalidate {
        /// List kind (all lists when omitted)
        kind: Option<String>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration with value sources
    Show,

    /// Set a configuration value in the data directory's config.kdl
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
}

/// MCP server subcommands
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Start stdio MCP server
    Serve,

    /// Output tool definitions
    Manifest,
}

fn parse_card_type(s: &str) -> Result<CardType, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_card_update() {
        let cli = Cli::try_parse_from([
            "cf",
            "-p",
            "Planning",
            "card",
            "update",
            "task",
            "PLN-TSK-0001",
            "--set",
            "status=In Progress",
            "-s",
            "devPoints=3",
            "--validate-only",
        ])
        .unwrap();
        assert_eq!(cli.project.as_deref(), Some("Planning"));
        match cli.command {
            Commands::Card {
                command:
                    CardCommands::Update {
                        card_type,
                        id,
                        fields,
                        validate_only,
                    },
            } => {
                assert_eq!(card_type, CardType::Task);
                assert_eq!(id, "PLN-TSK-0001");
                assert_eq!(fields.set, vec!["status=In Progress", "devPoints=3"]);
                assert!(validate_only);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_card_type_is_rejected() {
        assert!(Cli::try_parse_from(["cf", "rules", "story"]).is_err());
    }
}
