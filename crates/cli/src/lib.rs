pub mod commands;

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use greenlight_core::config::{AppConfig, LoadOptions, LogFormat};

use crate::commands::request::{ActorSpec, LifecycleCommand};

#[derive(Debug, Parser)]
#[command(
    name = "greenlight",
    about = "Greenlight request workflow CLI",
    long_about = "Create, submit, review, and audit approval requests; operate migrations, seeds, and readiness checks.",
    after_help = "Examples:\n  greenlight migrate\n  greenlight create --title \"Laptop\" --description \"battery dead\" --request-type equipment --priority high --as u-alice\n  greenlight approve REQ-ID --as u-bob --roles reviewer\n  greenlight show REQ-ID\n  greenlight inbox u-alice --unread"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ActorArgs {
    #[arg(long = "as", value_name = "USER_ID", help = "Acting user id")]
    actor: String,
    #[arg(
        long,
        default_value = "requester",
        help = "Comma-separated roles (requester|reviewer|admin)"
    )]
    roles: String,
}

impl From<ActorArgs> for ActorSpec {
    fn from(args: ActorArgs) -> Self {
        Self { id: args.actor, roles: args.roles }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Load deterministic demo fixtures")]
    Seed,
    #[command(about = "Validate config and database readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Create a new draft request")]
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, help = "leave|equipment|expense|access|other")]
        request_type: String,
        #[arg(long, default_value = "medium", help = "low|medium|high|urgent")]
        priority: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
    #[command(about = "Submit a draft request for review")]
    Submit {
        id: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
    #[command(about = "Pick a submitted request up for review, optionally assigning someone else")]
    Assign {
        id: String,
        #[arg(long, help = "Assignee user id; defaults to the acting user")]
        to: Option<String>,
        #[command(flatten)]
        actor: ActorArgs,
    },
    #[command(about = "Approve a request under review")]
    Approve {
        id: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
    #[command(about = "Reject a request under review with a reason")]
    Reject {
        id: String,
        #[arg(long)]
        reason: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
    #[command(about = "Cancel an open request")]
    Cancel {
        id: String,
        #[arg(long)]
        reason: Option<String>,
        #[command(flatten)]
        actor: ActorArgs,
    },
    #[command(about = "Reopen a rejected or cancelled request as a draft")]
    Reopen {
        id: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
    #[command(about = "Show one request with its reconstructed history")]
    Show { id: String },
    #[command(about = "List a user's notification feed or mark one read")]
    Inbox {
        user: String,
        #[arg(long, help = "Only unread notifications")]
        unread: bool,
        #[arg(long, value_name = "NOTIFICATION_ID", help = "Mark one notification as read")]
        mark_read: Option<String>,
    },
}

/// Best-effort tracing setup from config; a broken config file must not
/// keep the CLI from reporting it, so failures fall back to defaults.
fn init_tracing() {
    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(logging.level.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let result = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    // A second init (tests, embedding) is harmless.
    let _ = result;
}

pub fn run() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Create { title, description, request_type, priority, actor } => {
            commands::request::run(
                LifecycleCommand::Create { title, description, request_type, priority },
                actor.into(),
            )
        }
        Command::Submit { id, actor } => {
            commands::request::run(LifecycleCommand::Submit { id }, actor.into())
        }
        Command::Assign { id, to, actor } => {
            commands::request::run(LifecycleCommand::Assign { id, to }, actor.into())
        }
        Command::Approve { id, actor } => {
            commands::request::run(LifecycleCommand::Approve { id }, actor.into())
        }
        Command::Reject { id, reason, actor } => {
            commands::request::run(LifecycleCommand::Reject { id, reason }, actor.into())
        }
        Command::Cancel { id, reason, actor } => {
            commands::request::run(LifecycleCommand::Cancel { id, reason }, actor.into())
        }
        Command::Reopen { id, actor } => {
            commands::request::run(LifecycleCommand::Reopen { id }, actor.into())
        }
        Command::Show { id } => commands::show::run(id),
        Command::Inbox { user, unread, mark_read } => {
            commands::inbox::run(user, unread, mark_read)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
