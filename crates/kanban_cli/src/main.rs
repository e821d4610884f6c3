//! `kanban` command-line host for the board engine.
//!
//! # Responsibility
//! - Bootstrap config, logging and the store connection.
//! - Map each subcommand onto one [`BoardService`] operation and print JSON.
//!
//! # Invariants
//! - Board error kinds map to stable exit codes (see [`exit_code`]).

use clap::{Parser, Subcommand, ValueEnum};
use kanban_core::{
    init_logging, open_db_with_retry, BoardError, BoardService, CardInput, CardUpdate,
    ConfigError, DbError, ErrorKind, KanbanConfig, LoggingError, ProjectInput, SiblingScope,
};
use log::{error, info, warn};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "kanban", version, about = "Kanban board store")]
struct Args {
    /// TOML config file; `KANBAN_*` variables override its values
    #[arg(short, long, default_value = "kanban.toml")]
    config: PathBuf,

    /// Database file, overriding config and environment
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a project from a name or a JSON payload file
    CreateProject {
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        name: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print the hydrated project tree
    Tree { project_id: String },
    /// Upsert a project tree from a JSON payload file
    UpdateProject {
        project_id: String,
        #[arg(long)]
        file: PathBuf,
    },
    RenameProject { project_id: String, name: String },
    DeleteProject { project_id: String },
    AddColumn {
        project_id: String,
        name: String,
        #[arg(long)]
        position: Option<i64>,
    },
    UpdateColumn {
        column_id: String,
        name: String,
        #[arg(long)]
        order: Option<i64>,
    },
    DeleteColumn { column_id: String },
    AddCard {
        column_id: String,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        position: Option<i64>,
        /// Tag id to link; repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Edit a card; a different column moves it to that column's tail
    UpdateCard {
        card_id: String,
        #[arg(long)]
        column: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        order: Option<i64>,
    },
    DeleteCard { card_id: String },
    AddTag {
        project_id: String,
        name: String,
        #[arg(long, default_value = "")]
        color: String,
    },
    DeleteTag { tag_id: String },
    Link { card_id: String, tag_id: String },
    Unlink { card_id: String, tag_id: String },
    /// Close an order gap under a parent after an out-of-band delete
    ForcePop {
        #[arg(value_enum)]
        scope: ScopeArg,
        parent_id: String,
        order: i64,
    },
    /// Print a card's change records
    History { card_id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScopeArg {
    Columns,
    Cards,
}

impl From<ScopeArg> for SiblingScope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Columns => Self::Columns,
            ScopeArg::Cards => Self::Cards,
        }
    }
}

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Logging(LoggingError),
    Db(DbError),
    Board(BoardError),
    Payload { path: PathBuf, message: String },
    Encode(serde_json::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "config: {err}"),
            Self::Logging(err) => write!(f, "logging: {err}"),
            Self::Db(err) => write!(f, "store: {err}"),
            Self::Board(err) => write!(f, "{err}"),
            Self::Payload { path, message } => {
                write!(f, "payload {}: {message}", path.display())
            }
            Self::Encode(err) => write!(f, "failed to encode output: {err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Board(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Payload { .. } => None,
        }
    }
}

impl From<BoardError> for CliError {
    fn from(value: BoardError) -> Self {
        Self::Board(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// 0 ok, 1 setup failure, 2 invalid input, 3 not found, 4 no effect, 5 store.
fn exit_code(err: &CliError) -> u8 {
    match err {
        CliError::Config(_) | CliError::Logging(_) | CliError::Db(_) | CliError::Encode(_) => 1,
        CliError::Payload { .. } => 2,
        CliError::Board(board) => match board.kind() {
            ErrorKind::Invalid => 2,
            ErrorKind::NotFound => 3,
            ErrorKind::NoEffect => 4,
            ErrorKind::Store => 5,
        },
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("Error: {err}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(args: Args) -> Result<String, CliError> {
    let (mut config, ignored) =
        KanbanConfig::load(Some(args.config.as_path())).map_err(CliError::Config)?;
    if let Some(db) = args.db {
        config.db_path = db;
    }
    init_logging(&config.log_level, config.log_dir.as_deref()).map_err(CliError::Logging)?;
    for skipped in &ignored {
        warn!("event=config_override module=cli status=ignored {skipped}");
    }

    let conn = open_db_with_retry(
        &config.db_path,
        config.connect_attempts,
        config.connect_backoff(),
    )
    .map_err(CliError::Db)?;
    let service = match &config.actor {
        Some(actor) => BoardService::new(&conn).with_actor(actor.as_str()),
        None => BoardService::new(&conn),
    };

    let output = execute(&service, args.command)?;
    info!("event=cli_command module=cli status=ok");
    Ok(serde_json::to_string_pretty(&output)?)
}

fn execute(service: &BoardService<'_>, command: Command) -> Result<Value, CliError> {
    let output = match command {
        Command::CreateProject { name, file } => {
            let input = match file {
                Some(path) => read_payload(&path)?,
                None => ProjectInput::new(name.unwrap_or_default()),
            };
            json!({ "id": service.create_project(&input)? })
        }
        Command::Tree { project_id } => {
            serde_json::to_value(service.get_project_tree(&project_id)?)?
        }
        Command::UpdateProject { project_id, file } => {
            let input: ProjectInput = read_payload(&file)?;
            service.update_project(&project_id, &input)?;
            serde_json::to_value(service.get_project_tree(&project_id)?)?
        }
        Command::RenameProject { project_id, name } => {
            service.rename_project(&project_id, &name)?;
            json!({ "id": project_id })
        }
        Command::DeleteProject { project_id } => {
            service.delete_project(&project_id)?;
            json!({ "deleted": project_id })
        }
        Command::AddColumn {
            project_id,
            name,
            position,
        } => serde_json::to_value(service.create_column(&project_id, &name, position)?)?,
        Command::UpdateColumn {
            column_id,
            name,
            order,
        } => serde_json::to_value(service.update_column_data(&column_id, &name, order)?)?,
        Command::DeleteColumn { column_id } => {
            service.delete_column(&column_id)?;
            json!({ "deleted": column_id })
        }
        Command::AddCard {
            column_id,
            name,
            description,
            position,
            tags,
        } => {
            let mut input = CardInput::new(name, description).with_tag_ids(tags);
            input.order = position;
            serde_json::to_value(service.create_card(&column_id, &input)?)?
        }
        Command::UpdateCard {
            card_id,
            column,
            name,
            description,
            order,
        } => {
            let update = CardUpdate {
                column_id: column,
                name,
                description,
                order,
            };
            serde_json::to_value(service.update_card(&card_id, &update)?)?
        }
        Command::DeleteCard { card_id } => {
            service.delete_card(&card_id)?;
            json!({ "deleted": card_id })
        }
        Command::AddTag {
            project_id,
            name,
            color,
        } => json!({ "id": service.create_tag(&project_id, &name, &color)? }),
        Command::DeleteTag { tag_id } => {
            service.delete_tag(&tag_id)?;
            json!({ "deleted": tag_id })
        }
        Command::Link { card_id, tag_id } => {
            json!({ "linked": service.link_tag(&card_id, &tag_id)? })
        }
        Command::Unlink { card_id, tag_id } => {
            json!({ "unlinked": service.unlink_tag(&card_id, &tag_id)? })
        }
        Command::ForcePop {
            scope,
            parent_id,
            order,
        } => json!({ "shifted": service.force_pop_order(scope.into(), &parent_id, order)? }),
        Command::History { card_id } => serde_json::to_value(service.card_history(&card_id)?)?,
    };
    Ok(output)
}

fn read_payload(path: &Path) -> Result<ProjectInput, CliError> {
    let payload_error = |message: String| CliError::Payload {
        path: path.to_path_buf(),
        message,
    };
    let contents = std::fs::read_to_string(path).map_err(|err| payload_error(err.to_string()))?;
    serde_json::from_str(&contents).map_err(|err| payload_error(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{exit_code, Args, CliError, Command};
    use clap::Parser;
    use kanban_core::{BoardError, EntityKind};

    #[test]
    fn board_error_kinds_map_to_distinct_exit_codes() {
        let not_found = CliError::Board(BoardError::not_found(EntityKind::Card, "c1"));
        let no_effect = CliError::Board(BoardError::NoEffect {
            operation: "create_project",
        });
        let invalid = CliError::Board(BoardError::InvalidName(EntityKind::Column));
        assert_eq!(exit_code(&not_found), 3);
        assert_eq!(exit_code(&no_effect), 4);
        assert_eq!(exit_code(&invalid), 2);
    }

    #[test]
    fn add_card_collects_repeated_tags() {
        let args = Args::try_parse_from([
            "kanban", "add-card", "col-1", "Write docs", "--tag", "t1", "--tag", "t2",
        ])
        .unwrap();
        match args.command {
            Command::AddCard { tags, position, .. } => {
                assert_eq!(tags, vec!["t1".to_string(), "t2".to_string()]);
                assert_eq!(position, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn create_project_requires_name_or_file() {
        assert!(Args::try_parse_from(["kanban", "create-project"]).is_err());
    }

    #[test]
    fn create_project_takes_name_or_file_but_not_both() {
        assert!(Args::try_parse_from([
            "kanban",
            "create-project",
            "--name",
            "Roadmap",
            "--file",
            "board.json",
        ])
        .is_err());

        let args = Args::try_parse_from(["kanban", "create-project", "--name", "Roadmap"]).unwrap();
        match args.command {
            Command::CreateProject { name, file } => {
                assert_eq!(name.as_deref(), Some("Roadmap"));
                assert!(file.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
