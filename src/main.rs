//! Cardflow CLI - card lifecycle and validation for project boards.

use cardflow::action_log::{self, ActionLog};
use cardflow::cli::{
    CardCommands, Cli, Commands, ConfigCommands, FieldArgs, ListsCommands, McpCommands,
    PersonCommands, PriorityCommands, ProjectCommands, SystemCommands,
};
use cardflow::commands::{self, CardTarget, Context, Output, PersonInput, ProjectInput};
use cardflow::config::{self, ConfigOverrides, OutputFormat};
use cardflow::lookup::ListKind;
use cardflow::mcp;
use cardflow::models::PointScale;
use cardflow::references::ReferenceRole;
use cardflow::storage;
use clap::Parser;
use serde_json::json;
use std::process;
use std::time::Instant;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_LOG_FILTER: &str = "warn";

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let ctx = match build_context(&cli) {
        Ok(ctx) => ctx,
        Err(e) => exit_with_error(&e, cli.human_readable),
    };
    let human = ctx.config.output_format() == OutputFormat::Human;

    // Serialize command for logging
    let (cmd_name, args_json) = serialize_command(&cli.command);

    let start = Instant::now();
    let result = run_command(cli.command, &ctx, cli.project.as_deref(), human);
    let duration = start.elapsed().as_millis() as u64;

    if ctx.config.action_log_enabled() {
        let entry = ActionLog::new(cmd_name, &args_json, ctx.config.user())
            .finish(result.as_ref().err().map(|e| e.to_string()), duration);
        action_log::log_action(&ctx.data_dir, &entry);
    }

    if let Err(e) = result {
        exit_with_error(&e, human);
    }
}

/// Diagnostics go to stderr so JSON on stdout stays machine-readable.
fn init_tracing(filter: Option<&str>) {
    let filter = filter
        .and_then(|f| EnvFilter::try_new(f).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn build_context(cli: &Cli) -> Result<Context, cardflow::Error> {
    let data_dir = storage::get_data_dir()?;
    let mut overrides = ConfigOverrides::new();
    if let Some(project) = cli.project.as_deref().filter(|p| !p.trim().is_empty()) {
        overrides = overrides.with_project(project);
    }
    if let Some(user) = cli.user.as_deref().filter(|u| !u.trim().is_empty()) {
        overrides = overrides.with_user(user);
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    let resolved = config::resolve_config(&data_dir, &overrides)?;
    tracing::debug!(data_dir = %data_dir.display(), "configuration resolved");
    Ok(Context::new(data_dir, resolved))
}

fn exit_with_error(e: &cardflow::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", e);
        if let Some(v) = e.violation() {
            if !v.missing.is_empty() {
                eprintln!("  missing: {}", v.missing.join(", "));
            }
            if !v.expected.is_empty() {
                eprintln!("  expected one of: {}", v.expected.join(", "));
            }
        }
    } else if matches!(e, cardflow::Error::NotInitialized) {
        let err = json!({
            "error": e.to_string(),
            "hint": "Run 'cf system init' to create the data store",
        });
        eprintln!("{}", err);
    } else {
        eprintln!("{}", e.to_json());
    }
    process::exit(1);
}

fn parse_scale(raw: Option<&str>) -> Result<Option<PointScale>, cardflow::Error> {
    raw.map(|s| {
        PointScale::parse(s).ok_or_else(|| {
            cardflow::Error::InvalidInput(format!(
                "Invalid scale '{}': expected 1-5 or fibonacci",
                s
            ))
        })
    })
    .transpose()
}

fn card_fields(fields: &FieldArgs) -> Result<cardflow::models::Document, cardflow::Error> {
    commands::parse_fields(fields.json.as_deref(), &fields.set)
}

fn run_command(
    command: Commands,
    ctx: &Context,
    project_flag: Option<&str>,
    human: bool,
) -> Result<(), cardflow::Error> {
    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => output(&commands::system_init(ctx)?, human),
        },

        Commands::Project { command } => match command {
            ProjectCommands::Create {
                id,
                name,
                abbreviation,
                scale,
                default_validator,
            } => {
                let result = commands::project_create(
                    ctx,
                    ProjectInput {
                        id,
                        name,
                        abbreviation,
                        scale,
                        default_validator,
                    },
                )?;
                output(&result, human);
            }
            ProjectCommands::Show { id } => output(&commands::project_show(ctx, &id)?, human),
        },

        Commands::Developer { command } => {
            person_command(ctx, ReferenceRole::Developer, command, human)?
        }
        Commands::Stakeholder { command } => {
            person_command(ctx, ReferenceRole::Stakeholder, command, human)?
        }

        Commands::Card { command } => {
            let project = ctx.project_id(None)?;
            match command {
                CardCommands::Create {
                    card_type,
                    fields,
                    validate_only,
                } => {
                    let target = CardTarget {
                        project: &project,
                        card_type,
                        user: None,
                    };
                    let result =
                        commands::card_create(ctx, target, card_fields(&fields)?, validate_only)?;
                    output(&result, human);
                }
                CardCommands::Update {
                    card_type,
                    id,
                    fields,
                    validate_only,
                } => {
                    let target = CardTarget {
                        project: &project,
                        card_type,
                        user: None,
                    };
                    let result = commands::card_update(
                        ctx,
                        target,
                        &id,
                        card_fields(&fields)?,
                        validate_only,
                    )?;
                    output(&result, human);
                }
                CardCommands::Show { card_type, id } => {
                    output(&commands::card_show(ctx, &project, card_type, &id)?, human)
                }
                CardCommands::List { card_type } => {
                    output(&commands::card_list(ctx, &project, card_type)?, human)
                }
                CardCommands::Transitions { card_type, id } => output(
                    &commands::card_transitions(ctx, &project, card_type, &id)?,
                    human,
                ),
            }
        }

        Commands::Rules { card_type } => output(&commands::rules(card_type), human),

        Commands::Priority { command } => match command {
            PriorityCommands::Table { scale } => {
                let scale =
                    commands::priority_scale(ctx, parse_scale(scale.as_deref())?, project_flag)?;
                output(&commands::priority_table_for(scale), human);
            }
            PriorityCommands::Calc {
                business,
                effort,
                scale,
            } => {
                let scale =
                    commands::priority_scale(ctx, parse_scale(scale.as_deref())?, project_flag)?;
                output(&commands::priority_calc(business, effort, scale)?, human);
            }
        },

        Commands::Lists { command } => match command {
            ListsCommands::Show { kind } => {
                let kind: ListKind = kind.parse()?;
                output(&commands::lists_show(ctx, kind)?, human);
            }
            ListsCommands::Invalidate { kind } => {
                let kind = kind.as_deref().map(str::parse::<ListKind>).transpose()?;
                output(&commands::lists_invalidate(ctx, kind), human);
            }
        },

        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&commands::config_show(ctx), human),
            ConfigCommands::Set { key, value } => {
                output(&commands::config_set(&ctx.data_dir, &key, &value)?, human)
            }
        },

        Commands::Mcp { command } => match command {
            McpCommands::Serve => {
                let serve_ctx = Context::new(ctx.data_dir.clone(), ctx.config.clone());
                mcp::serve(serve_ctx)?;
            }
            McpCommands::Manifest => {
                let manifest = serde_json::to_string_pretty(&mcp::manifest())?;
                println!("{}", manifest);
            }
        },
    }
    Ok(())
}

fn person_command(
    ctx: &Context,
    role: ReferenceRole,
    command: PersonCommands,
    human: bool,
) -> Result<(), cardflow::Error> {
    match command {
        PersonCommands::Add {
            id,
            name,
            email,
            inactive,
            join,
        } => {
            let result = commands::person_add(
                ctx,
                role,
                PersonInput {
                    id,
                    name,
                    email,
                    active: !inactive,
                    project: join,
                },
            )?;
            output(&result, human);
        }
    }
    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

fn field_args_json(fields: &FieldArgs) -> serde_json::Value {
    json!({ "set": fields.set, "json": fields.json })
}

fn person_args(role: &str, command: &PersonCommands) -> (String, serde_json::Value) {
    match command {
        PersonCommands::Add {
            id,
            name,
            email,
            inactive,
            join,
        } => (
            format!("{} add", role),
            json!({
                "id": id,
                "name": name,
                "email": email,
                "inactive": inactive,
                "join": join,
            }),
        ),
    }
}

fn serialize_command(command: &Commands) -> (String, serde_json::Value) {
    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => ("system init".to_string(), json!({})),
        },

        Commands::Project { command } => match command {
            ProjectCommands::Create {
                id,
                name,
                abbreviation,
                scale,
                default_validator,
            } => (
                "project create".to_string(),
                json!({
                    "id": id,
                    "name": name,
                    "abbreviation": abbreviation,
                    "scale": scale,
                    "default_validator": default_validator,
                }),
            ),
            ProjectCommands::Show { id } => ("project show".to_string(), json!({ "id": id })),
        },

        Commands::Developer { command } => person_args("developer", command),
        Commands::Stakeholder { command } => person_args("stakeholder", command),

        Commands::Card { command } => match command {
            CardCommands::Create {
                card_type,
                fields,
                validate_only,
            } => (
                "card create".to_string(),
                json!({
                    "card_type": card_type,
                    "fields": field_args_json(fields),
                    "validate_only": validate_only,
                }),
            ),
            CardCommands::Update {
                card_type,
                id,
                fields,
                validate_only,
            } => (
                "card update".to_string(),
                json!({
                    "card_type": card_type,
                    "id": id,
                    "fields": field_args_json(fields),
                    "validate_only": validate_only,
                }),
            ),
            CardCommands::Show { card_type, id } => (
                "card show".to_string(),
                json!({ "card_type": card_type, "id": id }),
            ),
            CardCommands::List { card_type } => (
                "card list".to_string(),
                json!({ "card_type": card_type }),
            ),
            CardCommands::Transitions { card_type, id } => (
                "card transitions".to_string(),
                json!({ "card_type": card_type, "id": id }),
            ),
        },

        Commands::Rules { card_type } => ("rules".to_string(), json!({ "card_type": card_type })),

        Commands::Priority { command } => match command {
            PriorityCommands::Table { scale } => {
                ("priority table".to_string(), json!({ "scale": scale }))
            }
            PriorityCommands::Calc {
                business,
                effort,
                scale,
            } => (
                "priority calc".to_string(),
                json!({ "business": business, "effort": effort, "scale": scale }),
            ),
        },

        Commands::Lists { command } => match command {
            ListsCommands::Show { kind } => ("lists show".to_string(), json!({ "kind": kind })),
            ListsCommands::Invalidate { kind } => {
                ("lists invalidate".to_string(), json!({ "kind": kind }))
            }
        },

        Commands::Config { command } => match command {
            ConfigCommands::Show => ("config show".to_string(), json!({})),
            ConfigCommands::Set { key, value } => (
                "config set".to_string(),
                json!({ "key": key, "value": value }),
            ),
        },

        Commands::Mcp { command } => match command {
            McpCommands::Serve => ("mcp serve".to_string(), json!({})),
            McpCommands::Manifest => ("mcp manifest".to_string(), json!({})),
        },
    }
}
