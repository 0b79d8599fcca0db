use std::fmt;

use cardak_core::model::TestId;
use services::{AppServices, Clock, DEFAULT_POST_LIMIT};
use storage::sqlite::DEFAULT_ASSET_BASE;
use tracing_subscriber::EnvFilter;
use url::Url;

mod terminal;

#[derive(Debug)]
enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingOperand { command: &'static str, name: &'static str },
    UnknownArg(String),
    InvalidTestId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidAssetBase { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "missing subcommand"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingOperand { command, name } => {
                write!(f, "{command} requires <{name}>")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidTestId { raw } => write!(f, "invalid test id: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidAssetBase { raw } => write!(f, "invalid --assets value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List,
    Take(TestId),
    Forum,
    Post { username: String, content: String },
    Photos,
}

struct Args {
    command: Command,
    db_url: String,
    asset_base: Url,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cardak list                        List tests, newest first");
    eprintln!("  cardak take <test-id>              Take a test interactively");
    eprintln!("  cardak forum                       Show recent forum posts");
    eprintln!("  cardak post <username> <content>   Publish a forum post");
    eprintln!("  cardak photos                      List shared photos");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>     SQLite URL (default: sqlite://cardak.sqlite3)");
    eprintln!("  --assets <url>        Public base url for uploaded assets");
    eprintln!("                        (default: {DEFAULT_ASSET_BASE})");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CARDAK_DB_URL, CARDAK_ASSET_BASE_URL, CARDAK_LOG (default: info)");
}

fn parse_asset_base(raw: String) -> Result<Url, ArgsError> {
    Url::parse(raw.trim()).map_err(|_| ArgsError::InvalidAssetBase { raw })
}

impl Args {
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("CARDAK_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://cardak.sqlite3".into(), normalize_sqlite_url);
        let mut asset_base = parse_asset_base(
            std::env::var("CARDAK_ASSET_BASE_URL").unwrap_or_else(|_| DEFAULT_ASSET_BASE.into()),
        )?;

        let mut positional = Vec::new();
        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--assets" => {
                    asset_base = parse_asset_base(require_value(&mut args, "--assets")?)?;
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        Ok(Self {
            command: parse_command(positional)?,
            db_url,
            asset_base,
        })
    }
}

fn parse_command(positional: Vec<String>) -> Result<Command, ArgsError> {
    let mut words = positional.into_iter();
    let name = words.next().ok_or(ArgsError::MissingCommand)?;
    let command = match name.as_str() {
        "list" => Command::List,
        "forum" => Command::Forum,
        "photos" => Command::Photos,
        "take" => {
            let raw = words.next().ok_or(ArgsError::MissingOperand {
                command: "take",
                name: "test-id",
            })?;
            let id = raw
                .parse::<TestId>()
                .map_err(|_| ArgsError::InvalidTestId { raw: raw.clone() })?;
            Command::Take(id)
        }
        "post" => {
            let username = words.next().ok_or(ArgsError::MissingOperand {
                command: "post",
                name: "username",
            })?;
            // remaining words form the post body, so quoting is optional
            let content = words.by_ref().collect::<Vec<_>>().join(" ");
            if content.is_empty() {
                return Err(ArgsError::MissingOperand {
                    command: "post",
                    name: "content",
                });
            }
            Command::Post { username, content }
        }
        _ => return Err(ArgsError::UnknownCommand(name)),
    };

    match words.next() {
        Some(extra) => Err(ArgsError::UnknownArg(extra)),
        None => Ok(command),
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CARDAK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let args = Args::parse(argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();
    prepare_sqlite_file(&args.db_url)?;
    let services = AppServices::new_sqlite(&args.db_url, args.asset_base, Clock::default()).await?;
    tracing::debug!(db_url = %args.db_url, "storage ready");

    let mut out = std::io::stdout().lock();
    match args.command {
        Command::List => {
            let tests = services.tests().list_tests().await?;
            terminal::print_tests(&mut out, &tests)?;
        }
        Command::Take(test_id) => {
            let mut input = std::io::stdin().lock();
            terminal::take_test(&services.quiz_loop(), test_id, &mut input, &mut out).await?;
        }
        Command::Forum => {
            let posts = services.forum().recent_posts(DEFAULT_POST_LIMIT).await?;
            terminal::print_posts(&mut out, &posts)?;
        }
        Command::Post { username, content } => {
            let post = services.forum().create_post(username, content).await?;
            terminal::print_posts(&mut out, std::slice::from_ref(&post))?;
        }
        Command::Photos => {
            let photos = services.photos().list_photos().await?;
            terminal::print_photos(&mut out, &photos)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn take_requires_numeric_id() {
        assert_eq!(
            parse_command(words(&["take", "7"])).unwrap(),
            Command::Take(TestId::new(7))
        );
        assert!(matches!(
            parse_command(words(&["take", "seven"])),
            Err(ArgsError::InvalidTestId { .. })
        ));
        assert!(matches!(
            parse_command(words(&["take"])),
            Err(ArgsError::MissingOperand { .. })
        ));
    }

    #[test]
    fn post_joins_remaining_words() {
        assert_eq!(
            parse_command(words(&["post", "hiker", "lovely", "weather"])).unwrap(),
            Command::Post {
                username: "hiker".into(),
                content: "lovely weather".into(),
            }
        );
        assert!(matches!(
            parse_command(words(&["post", "hiker"])),
            Err(ArgsError::MissingOperand { name: "content", .. })
        ));
    }

    #[test]
    fn unknown_and_extra_words_are_rejected() {
        assert!(matches!(
            parse_command(words(&["quiz"])),
            Err(ArgsError::UnknownCommand(_))
        ));
        assert!(matches!(
            parse_command(words(&["list", "now"])),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(parse_command(Vec::new()), Err(ArgsError::MissingCommand)));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/cardak.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/cardak.sqlite3"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }
}
