use std::fmt;

use cardak_core::model::{OptionDraft, PhotoDraft, PostDraft, QuestionDraft, TestDraft};
use chrono::{DateTime, Duration, Utc};
use storage::repository::Storage;
use storage::sqlite::DEFAULT_ASSET_BASE;
use url::Url;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    asset_base: Url,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidAssetBase { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidAssetBase { raw } => write!(f, "invalid --assets value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

fn parse_asset_base(raw: String) -> Result<Url, ArgsError> {
    Url::parse(raw.trim()).map_err(|_| ArgsError::InvalidAssetBase { raw })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("CARDAK_DB_URL").unwrap_or_else(|_| "sqlite://cardak.sqlite3?mode=rwc".into());
        let mut asset_base = parse_asset_base(
            std::env::var("CARDAK_ASSET_BASE_URL").unwrap_or_else(|_| DEFAULT_ASSET_BASE.into()),
        )?;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--assets" => {
                    asset_base = parse_asset_base(require_value(&mut args, "--assets")?)?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            asset_base,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://cardak.sqlite3?mode=rwc)");
    eprintln!("  --assets <url>            Public base url for uploaded assets");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  CARDAK_DB_URL, CARDAK_ASSET_BASE_URL");
}

fn sample_tests() -> Vec<TestDraft> {
    vec![
        TestDraft::new(
            "General Culture",
            "A short quiz on general knowledge.",
            "admin",
        )
        .with_question(QuestionDraft::multiple_choice(
            1,
            "What is the capital of Türkiye?",
            vec![
                OptionDraft::new(1, "Istanbul", false),
                OptionDraft::new(2, "Ankara", true),
                OptionDraft::new(3, "Izmir", false),
                OptionDraft::new(4, "Bursa", false),
            ],
        ))
        .with_question(QuestionDraft::multiple_choice(
            2,
            "Which of these is not a planet?",
            vec![
                OptionDraft::new(1, "Mars", false),
                OptionDraft::new(2, "Venus", false),
                OptionDraft::new(3, "Pluto", true),
                OptionDraft::new(4, "Saturn", false),
            ],
        ))
        .with_question(QuestionDraft::image_based(
            3,
            "Which animal is shown in this picture?",
            "https://images.unsplash.com/photo-1474511320723-9a56873867b5",
            vec![
                OptionDraft::new(1, "Lion", false),
                OptionDraft::new(2, "Tiger", false),
                OptionDraft::new(3, "Fox", true),
                OptionDraft::new(4, "Wolf", false),
            ],
        ))
        .with_question(QuestionDraft::open_ended(
            4,
            "What is Albert Einstein's best known theory?",
        )),
    ]
}

const SAMPLE_PHOTOS: &[(&str, &str, &str)] = &[
    (
        "Sea View",
        "https://images.unsplash.com/photo-1507525428034-b723cf961d3e",
        "sailor",
    ),
    (
        "Mountain View",
        "https://images.unsplash.com/photo-1464822759023-fed622ff2c3b",
        "climber",
    ),
    (
        "Flowers",
        "https://images.unsplash.com/photo-1490750967868-88aa4486c946",
        "gardener",
    ),
];

const SAMPLE_POSTS: &[(&str, &str)] = &[
    (
        "philosopher",
        "The weather is lovely today, perfect for a walk in the park!",
    ),
    (
        "traveller",
        "Started a new book, can recommend it to everyone: One Hundred Years of Solitude.",
    ),
    (
        "musician",
        "There is a free concert downtown tonight, anyone joining?",
    ),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url, args.asset_base.clone()).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let mut tests = 0_u32;
    for draft in sample_tests() {
        let validated = draft.validate(now).map_err(cardak_core::Error::from)?;
        storage.tests.insert_test(&validated).await?;
        tests += 1;
    }

    for (i, (title, url, uploaded_by)) in SAMPLE_PHOTOS.iter().enumerate() {
        let uploaded_at = now - Duration::days(i64::try_from(i)?);
        let photo = PhotoDraft::new(*title, *uploaded_by)
            .validate(Url::parse(url)?, uploaded_at)
            .map_err(cardak_core::Error::from)?;
        storage.photos.insert_photo(&photo).await?;
    }

    for (i, (username, content)) in SAMPLE_POSTS.iter().enumerate() {
        let created_at = now - Duration::minutes(i64::try_from(i)? * 45);
        let post = PostDraft::new(*username, *content)
            .validate(created_at)
            .map_err(cardak_core::Error::from)?;
        storage.forum.insert_post(&post).await?;
    }

    println!(
        "Seeded {} tests, {} photos and {} forum posts into {}",
        tests,
        SAMPLE_PHOTOS.len(),
        SAMPLE_POSTS.len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
