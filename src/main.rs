use std::path::PathBuf;
use std::process::ExitCode;

use cadence::error::Result;
use cadence::lifecycle::{
    abort, advance, archive, block, collection, complete, create, init, resume, start,
    status_cmd, OpContext,
};
use cadence::project::{self, ProjectLock};
use clap::{Parser, Subcommand};
use colored::Colorize;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Filesystem-backed work item lifecycle orchestrator", long_about = None)]
#[command(version)]
struct Cli {
    /// Project root (default: walk up from the current directory)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Print the planned steps without executing them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a cadence project (marker, status tree, registry)
    Init {
        /// Directory to initialize (default: current directory)
        path: Option<PathBuf>,
    },

    /// Operate on individual work items
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },

    /// Operate on collections of work items
    Collection {
        #[command(subcommand)]
        command: CollectionCommands,
    },

    /// Generate the companion report for a work item
    Report {
        /// Work item number
        id: u32,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// Create a work item in 1-todo (or inside a collection)
    Create {
        title: String,

        /// Collection number to create the item inside
        #[arg(long)]
        collection: Option<u32>,

        /// Estimated hours
        #[arg(long)]
        estimate: Option<f64>,
    },

    /// Move a work item into 2-in-progress and open its workflow record
    Start { id: u32 },

    /// Finish a work item: rename, registry, report, commit + tag + push
    Complete {
        id: u32,

        /// Skip the git commit/tag/push stage
        #[arg(long)]
        no_tag: bool,
    },

    /// Abandon an in-progress work item (terminal)
    Abort {
        id: u32,

        /// Why the item is being abandoned
        #[arg(long)]
        reason: String,
    },

    /// Pause an in-progress work item
    Block {
        id: u32,

        /// What the item is waiting on
        #[arg(long)]
        reason: Option<String>,
    },

    /// Unblock a work item back to in_progress
    Resume { id: u32 },

    /// Complete the current workflow step and move to the next
    Advance { id: u32 },

    /// Move a done standalone item to 6-archived
    Archive { id: u32 },

    /// Show a work item's decoded status, timeline and workflow record
    Status { id: u32 },
}

#[derive(Subcommand)]
enum CollectionCommands {
    /// Create a collection directory in 1-todo
    Create { title: String },

    /// Move a collection into 2-in-progress
    Start { id: u32 },

    /// Complete a collection (requires every child finished)
    Complete { id: u32 },

    /// Move a done collection to 6-archived
    Archive { id: u32 },

    /// Adopt an existing standalone work item into a collection
    Add {
        item_id: u32,
        collection_id: u32,
    },

    /// Show per-child completion status
    Status { id: u32 },

    /// List all collections with their progress
    List,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    // Init runs before a project exists; everything else resolves the root.
    if let Commands::Init { path } = &cli.command {
        let target = match path {
            Some(path) => path.clone(),
            None => std::env::current_dir()
                .map_err(|e| cadence::error::Error::file_op("reading current directory", e))?,
        };
        return init::run(&target, cli.dry_run);
    }

    let root = project::resolve_root(cli.project.as_deref())?;
    let ctx = OpContext {
        root: root.clone(),
        dry_run: cli.dry_run,
    };

    // Read-only commands skip the single-writer lock.
    match &cli.command {
        Commands::Item {
            command: ItemCommands::Status { id },
        } => return status_cmd::item(&ctx, *id),
        Commands::Collection {
            command: CollectionCommands::Status { id },
        } => return collection::status(&ctx, *id),
        Commands::Collection {
            command: CollectionCommands::List,
        } => return collection::list(&ctx),
        _ => {}
    }

    let _lock = ProjectLock::acquire(&root)?;
    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Item { command } => match command {
            ItemCommands::Create {
                title,
                collection,
                estimate,
            } => create::item(&ctx, &title, collection, estimate).map(|_| ()),
            ItemCommands::Start { id } => start::run(&ctx, id),
            ItemCommands::Complete { id, no_tag } => {
                complete::run(&ctx, id, &complete::CompleteOpts { no_tag })
            }
            ItemCommands::Abort { id, reason } => abort::run(&ctx, id, &reason),
            ItemCommands::Block { id, reason } => block::run(&ctx, id, reason.as_deref()),
            ItemCommands::Resume { id } => resume::run(&ctx, id),
            ItemCommands::Advance { id } => advance::run(&ctx, id),
            ItemCommands::Archive { id } => archive::run(&ctx, id),
            ItemCommands::Status { .. } => unreachable!("handled above"),
        },
        Commands::Collection { command } => match command {
            CollectionCommands::Create { title } => {
                create::collection(&ctx, &title).map(|_| ())
            }
            CollectionCommands::Start { id } => collection::start(&ctx, id),
            CollectionCommands::Complete { id } => collection::complete(&ctx, id),
            CollectionCommands::Archive { id } => collection::archive(&ctx, id),
            CollectionCommands::Add {
                item_id,
                collection_id,
            } => collection::add(&ctx, item_id, collection_id),
            CollectionCommands::Status { .. } | CollectionCommands::List => {
                unreachable!("handled above")
            }
        },
        Commands::Report { id } => status_cmd::report(&ctx, id),
    }
}
