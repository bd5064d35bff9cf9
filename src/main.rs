use clap::{Parser, Subcommand};
use ideaboard::api::{Actor, Container};
use ideaboard::config::BoardConfig;
use ideaboard::doc::{ContainerId, EntityRef, IdeaNode, StickyNote, UserId};
use ideaboard::error::{ApiError, ConfigError, LoadError, MutationError};
use ideaboard::filter::NodeQuery;
use ideaboard::session::BoardSession;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("refusing to delete board {0} without --yes")]
    Unconfirmed(ContainerId),
}

#[derive(Parser, Debug)]
#[command(name = "ideaboard", about = "Idea board store CLI")]
struct Cli {
    /// Store base URL; overrides IDEABOARD_API_URL.
    #[arg(long)]
    api_url: Option<String>,

    #[arg(long, env = "IDEABOARD_USER_ID")]
    user: UserId,

    /// Act with access to every user's boards.
    #[arg(long, default_value_t = false)]
    admin: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List boards.
    Boards,
    /// Print the user's first board, creating one if they have none.
    Home,
    /// Show a board's nodes, notes, and tags.
    Show {
        board_id: ContainerId,
        /// Only nodes carrying any of these tags.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Only nodes whose title or description contains this text.
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    CreateBoard {
        #[arg(long)]
        name: String,
    },
    RenameBoard {
        board_id: ContainerId,
        #[arg(long)]
        name: String,
    },
    DeleteBoard {
        board_id: ContainerId,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(serde::Serialize)]
struct ShowOutput<'a> {
    board: &'a Container,
    nodes: &'a [&'a IdeaNode],
    notes: &'a [StickyNote],
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = BoardConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_owned();
    }
    let actor = Actor { user_id: cli.user, privileged: cli.admin };
    // The CLI never deletes nodes or notes.
    let mut session = BoardSession::connect(&config, actor, |_: EntityRef| false)?;

    match cli.command {
        Command::Boards => {
            for board in session.list_containers().await? {
                println!("{}\t{}\tuser {}", board.id, board.name, board.user_id);
            }
        }
        Command::Home => {
            let board = session.ensure_container().await?;
            println!("{}\t{}", board.id, board.name);
        }
        Command::Show { board_id, tags, query, json } => {
            run_show(&mut session, board_id, &tags, query, json).await?;
        }
        Command::CreateBoard { name } => {
            let board = session.create_container(&name).await?;
            println!("created {}\t{}", board.id, board.name);
        }
        Command::RenameBoard { board_id, name } => {
            let board = session.rename_container(board_id, &name).await?;
            println!("renamed {}\t{}", board.id, board.name);
        }
        Command::DeleteBoard { board_id, yes } => {
            if !yes {
                return Err(CliError::Unconfirmed(board_id));
            }
            session.delete_container(board_id).await?;
            println!("deleted {board_id}");
        }
    }
    Ok(())
}

async fn run_show(
    session: &mut BoardSession,
    board_id: ContainerId,
    tags: &[String],
    query: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let board = session.fetch_container(board_id).await?;
    session.open(board_id).await?;

    let mut filter = NodeQuery { text: query.unwrap_or_default(), ..NodeQuery::default() };
    for tag in tags {
        filter.tags.toggle(tag);
    }
    let doc = &session.engine().doc;
    let nodes = filter.apply(doc.nodes());

    if json {
        let out = ShowOutput { board: &board, nodes: &nodes, notes: doc.notes() };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{}\t{}", board.id, board.name);
    println!("nodes ({} of {})", nodes.len(), doc.nodes().len());
    for node in &nodes {
        println!("  {}\t({:.0}, {:.0})\t{}\t[{}]", node.id, node.x, node.y, node.title, node.tags.join(", "));
    }
    println!("notes ({})", doc.notes().len());
    for note in doc.notes() {
        println!("  {}\t({:.0}, {:.0})\t{}", note.id, note.x, note.y, note.text);
    }
    println!("tags: {}", doc.tag_universe().join(", "));
    Ok(())
}
