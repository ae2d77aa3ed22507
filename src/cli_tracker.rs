use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_style;

use cli_style::{
    get_styles, print_empty_list, print_error, print_key_value, print_section_footer,
    print_section_header, print_success, print_warning, TableBuilder,
};
use media_tracker::collection::{Collection, SessionMode};
use media_tracker::config::{ClientCliConfig, ClientConfig, ClientFileConfig};
use media_tracker::media::{
    CollectionFilter, FilterName, FilterQuery, MediaDraft, MediaEntry, MediaKind, MediaStatus,
    MediaUpdate, Season, SeasonDraft, SeasonUpdate, SeriesProgress,
};
use media_tracker::metadata::{LookupCandidate, MetadataCatalog, DEFAULT_LOOKUP_LIMIT};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Parses a `NUMBER:EPISODES` season outline, e.g. `2:10`.
fn parse_season(s: &str) -> Result<SeasonDraft> {
    let (number, episodes) = s
        .split_once(':')
        .with_context(|| format!("Expected NUMBER:EPISODES, got {:?}", s))?;
    let number: u32 = number
        .trim()
        .parse()
        .with_context(|| format!("Invalid season number in {:?}", s))?;
    let episodes: u32 = episodes
        .trim()
        .parse()
        .with_context(|| format!("Invalid episode count in {:?}", s))?;
    Ok(SeasonDraft::new(number, episodes))
}

#[derive(Parser, Debug)]
#[command(version, styles = get_styles(), about = "Track the movies, series, books, videogames and comics you follow")]
struct CliArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    config: Option<PathBuf>,

    /// Directory holding the local storage file. Defaults to ~/.media-tracker.
    #[clap(long, value_parser = parse_path)]
    data_dir: Option<PathBuf>,

    /// Base URL of the media tracker backend.
    #[clap(long, env = "MEDIA_TRACKER_BACKEND_URL")]
    backend_url: Option<String>,

    #[clap(long, env = "TMDB_API_KEY", hide_env_values = true)]
    tmdb_api_key: Option<String>,

    /// Language of TMDB lookups, e.g. es-ES.
    #[clap(long, env = "TMDB_LANGUAGE")]
    tmdb_language: Option<String>,

    #[clap(long, env = "IGDB_CLIENT_ID", hide_env_values = true)]
    igdb_client_id: Option<String>,

    #[clap(long, env = "IGDB_CLIENT_SECRET", hide_env_values = true)]
    igdb_client_secret: Option<String>,

    #[clap(long, env = "COMICVINE_API_KEY", hide_env_values = true)]
    comicvine_api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates an account on the backend.
    Register {
        #[clap(long)]
        email: String,
        #[clap(long, env = "MEDIA_TRACKER_PASSWORD", hide_env_values = true)]
        password: String,
        #[clap(long)]
        username: Option<String>,
    },

    /// Signs in. A guest collection on this machine is discarded.
    Login {
        #[clap(long)]
        email: String,
        #[clap(long, env = "MEDIA_TRACKER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Signs out of the current account.
    Logout,

    /// Starts using a collection stored only on this machine.
    Guest,

    /// Leaves guest mode, deleting the guest collection.
    LeaveGuest,

    /// Shows the current session mode.
    Status,

    /// Lists the collection, newest first.
    List {
        #[clap(long, value_enum, default_value = "all")]
        filter: FilterName,
        /// Media kind, required by the `kind` and `pending` filters.
        #[clap(long, value_enum)]
        kind: Option<MediaKind>,
    },

    /// Shows one entry with its seasons.
    Show { id: String },

    /// Adds an entry, optionally pre-filled from a metadata lookup.
    Add(AddArgs),

    /// Changes fields of an entry.
    Update(UpdateArgs),

    /// Deletes an entry and its seasons.
    Delete {
        id: String,
        /// Confirms the deletion.
        #[clap(long)]
        yes: bool,
    },

    /// Marks one more episode of a season as watched.
    Watch { season_id: String },

    /// Marks one less episode of a season as watched.
    Unwatch { season_id: String },

    /// Edits a season's episode counts or rating.
    Season(SeasonArgs),

    /// Searches the metadata provider of a media kind.
    Lookup {
        #[clap(value_enum)]
        kind: MediaKind,
        query: String,
        #[clap(long, default_value_t = DEFAULT_LOOKUP_LIMIT)]
        limit: usize,
    },

    /// Shows which metadata providers are configured.
    Providers,

    /// Lists the suggested genres of a media kind.
    Genres {
        #[clap(value_enum)]
        kind: MediaKind,
    },
}

#[derive(Args, Debug)]
struct AddArgs {
    #[clap(long, value_enum)]
    kind: MediaKind,

    /// Required unless --lookup finds a match.
    #[clap(long)]
    title: Option<String>,

    #[clap(long, value_enum)]
    status: Option<MediaStatus>,

    #[clap(long)]
    rating: Option<u8>,

    #[clap(long)]
    poster_url: Option<String>,

    #[clap(long)]
    review: Option<String>,

    #[clap(long)]
    notes: Option<String>,

    #[clap(long = "genre")]
    genres: Vec<String>,

    /// Season outline as NUMBER:EPISODES, repeatable. Series only.
    #[clap(long = "season", value_parser = parse_season)]
    seasons: Vec<SeasonDraft>,

    /// Pre-fills the entry with the best metadata match of this query.
    #[clap(long)]
    lookup: Option<String>,

    /// Index of the lookup candidate to use, 0 by default.
    #[clap(long, requires = "lookup")]
    pick: Option<usize>,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    id: String,

    #[clap(long)]
    title: Option<String>,

    #[clap(long, value_enum)]
    status: Option<MediaStatus>,

    #[clap(long, conflicts_with = "clear_rating")]
    rating: Option<u8>,

    #[clap(long)]
    clear_rating: bool,

    #[clap(long, conflicts_with = "clear_poster_url")]
    poster_url: Option<String>,

    #[clap(long)]
    clear_poster_url: bool,

    #[clap(long, conflicts_with = "clear_review")]
    review: Option<String>,

    #[clap(long)]
    clear_review: bool,

    #[clap(long, conflicts_with = "clear_notes")]
    notes: Option<String>,

    #[clap(long)]
    clear_notes: bool,
}

#[derive(Args, Debug)]
struct SeasonArgs {
    season_id: String,

    #[clap(long)]
    total: Option<u32>,

    #[clap(long)]
    watched: Option<u32>,

    #[clap(long, conflicts_with = "clear_rating")]
    rating: Option<u8>,

    #[clap(long)]
    clear_rating: bool,
}

/// `Some(None)` clears the field, `None` leaves it alone.
fn optional_change<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

fn init_logging() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")
}

fn resolve_config(cli_args: &CliArgs) -> Result<ClientConfig> {
    let file_config = match &cli_args.config {
        Some(path) => Some(ClientFileConfig::load(path)?),
        None => None,
    };
    let cli_config = ClientCliConfig {
        data_dir: cli_args.data_dir.clone(),
        backend_url: cli_args.backend_url.clone(),
        tmdb_api_key: cli_args.tmdb_api_key.clone(),
        tmdb_language: cli_args.tmdb_language.clone(),
        igdb_client_id: cli_args.igdb_client_id.clone(),
        igdb_client_secret: cli_args.igdb_client_secret.clone(),
        comicvine_api_key: cli_args.comicvine_api_key.clone(),
    };
    ClientConfig::resolve(&cli_config, file_config)
}

fn format_rating(rating: Option<u8>) -> String {
    rating
        .map(|r| format!("{}/10", r))
        .unwrap_or_else(|| "-".to_string())
}

fn format_progress(entry: &MediaEntry) -> String {
    if entry.kind != MediaKind::Series {
        return String::new();
    }
    let progress = SeriesProgress::of(&entry.seasons);
    format!(
        "{}/{} eps ({}%)",
        progress.episodes_watched, progress.total_episodes, progress.percentage
    )
}

fn print_entries(entries: &[MediaEntry], filter: &CollectionFilter) {
    print_section_header(&format!("Collection ({})", filter));
    if entries.is_empty() {
        print_empty_list("Nothing here yet");
    } else {
        let mut table = TableBuilder::new(&["id", "kind", "status", "rating", "title", "progress"]);
        for entry in entries {
            table.add_row(vec![
                entry.id.clone(),
                entry.kind.to_string(),
                entry.status.to_string(),
                format_rating(entry.rating),
                entry.title.clone(),
                format_progress(entry),
            ]);
        }
        table.print();
    }
    print_section_footer();
}

fn print_season(season: &Season) {
    let state = if season.is_completed {
        "completed"
    } else {
        "in progress"
    };
    print_success(&format!(
        "Season {}: {}/{} episodes, {}",
        season.season_number, season.episodes_watched, season.total_episodes, state
    ));
}

fn print_entry(entry: &MediaEntry) {
    print_section_header(&entry.title);
    print_key_value("id", &entry.id);
    print_key_value("kind", entry.kind.as_str());
    print_key_value("status", entry.status.as_str());
    print_key_value("rating", &format_rating(entry.rating));
    let optional_fields = [
        ("release date", &entry.release_date),
        ("language", &entry.original_language),
        ("poster", &entry.poster_url),
        ("backdrop", &entry.backdrop_url),
        ("overview", &entry.overview),
        ("review", &entry.review),
        ("notes", &entry.notes),
    ];
    for (key, value) in optional_fields {
        if let Some(value) = value {
            print_key_value(key, value);
        }
    }
    if !entry.genres.is_empty() {
        let genres: Vec<&str> = entry.genres.iter().map(String::as_str).collect();
        print_key_value("genres", &genres.join(", "));
    }
    if let Some(vote) = entry.vote_average {
        print_key_value("public score", &format!("{:.1}", vote));
    }
    if let Some(external) = &entry.external_ref {
        print_key_value("source", &format!("{} #{}", external.source, external.id));
    }
    print_key_value("added", &entry.created_at.to_rfc3339());
    print_key_value("updated", &entry.updated_at.to_rfc3339());

    if entry.kind == MediaKind::Series {
        let progress = SeriesProgress::of(&entry.seasons);
        print_key_value(
            "progress",
            &format!(
                "{}/{} seasons completed, {}/{} episodes ({}%)",
                progress.completed_seasons,
                progress.total_seasons,
                progress.episodes_watched,
                progress.total_episodes,
                progress.percentage
            ),
        );
        let mut table = TableBuilder::new(&["season id", "#", "watched", "done", "rating"]);
        for season in &entry.seasons {
            table.add_row(vec![
                season.id.clone(),
                season.season_number.to_string(),
                format!("{}/{}", season.episodes_watched, season.total_episodes),
                if season.is_completed { "yes" } else { "no" }.to_string(),
                format_rating(season.rating),
            ]);
        }
        table.print();
    }
    print_section_footer();
}

fn print_candidates(candidates: &[LookupCandidate]) {
    let mut table = TableBuilder::new(&["#", "title", "year", "score", "source id"]);
    for (i, candidate) in candidates.iter().enumerate() {
        table.add_row(vec![
            i.to_string(),
            candidate.name.clone(),
            candidate
                .release_year
                .map(|y| y.to_string())
                .unwrap_or_default(),
            candidate
                .rating
                .map(|r| format!("{:.1}", r))
                .unwrap_or_default(),
            format!("{} #{}", candidate.source, candidate.provider_id),
        ]);
    }
    table.print();
}

/// Enough candidates to reach the picked one, never fewer than the default.
fn lookup_limit(pick: usize) -> usize {
    DEFAULT_LOOKUP_LIMIT.max(pick.saturating_add(1))
}

/// Builds the draft of `add`. Explicit flags win over looked up metadata.
async fn build_draft(args: AddArgs, config: &ClientConfig) -> Result<MediaDraft> {
    let mut draft = MediaDraft::new(args.kind, String::new());
    let mut outline = Vec::new();

    if let Some(query) = &args.lookup {
        let catalog = MetadataCatalog::from_config(&config.metadata)?;
        if !catalog.is_available(args.kind) {
            print_warning(&format!(
                "No metadata provider configured for {}, adding without lookup",
                args.kind
            ));
        } else {
            let pick = args.pick.unwrap_or(0);
            let candidates = catalog
                .lookup(args.kind, query, lookup_limit(pick))
                .await;
            match candidates.get(pick) {
                Some(candidate) => {
                    debug!("Pre-filling from {} #{}", candidate.source, candidate.provider_id);
                    draft = candidate.to_draft(args.kind);
                    if args.kind == MediaKind::Series {
                        outline = catalog.season_outline(candidate).await;
                    }
                }
                None => print_warning(&format!("No lookup match for {:?}", query)),
            }
        }
    }

    if let Some(title) = args.title {
        draft.title = title;
    }
    if draft.title.trim().is_empty() {
        bail!("A --title is required when no lookup match is used");
    }
    if let Some(status) = args.status {
        draft.status = status;
    }
    if args.rating.is_some() {
        draft.rating = args.rating;
    }
    if args.poster_url.is_some() {
        draft.poster_url = args.poster_url;
    }
    if args.review.is_some() {
        draft.review = args.review;
    }
    if args.notes.is_some() {
        draft.notes = args.notes;
    }
    draft.genres.extend(args.genres);
    draft.seasons = if args.seasons.is_empty() {
        outline
    } else {
        args.seasons
    };
    Ok(draft)
}

async fn run(cli_args: CliArgs) -> Result<()> {
    init_logging()?;
    let config = resolve_config(&cli_args)?;
    debug!("Using data dir {:?}", config.data_dir);

    match &cli_args.command {
        Command::Genres { kind } => {
            print_section_header(&format!("Suggested {} genres", kind));
            for genre in kind.suggested_genres() {
                print_key_value("genre", genre);
            }
            print_section_footer();
            return Ok(());
        }
        Command::Providers => {
            let catalog = MetadataCatalog::from_config(&config.metadata)?;
            print_section_header("Metadata providers");
            let mut table = TableBuilder::new(&["provider", "kinds", "configured"]);
            for status in catalog.statuses() {
                let kinds: Vec<&str> = status.kinds.iter().map(|k| k.as_str()).collect();
                table.add_row(vec![
                    status.source.to_string(),
                    kinds.join(", "),
                    if status.configured { "yes" } else { "no" }.to_string(),
                ]);
            }
            table.print();
            print_section_footer();
            return Ok(());
        }
        Command::Lookup { kind, query, limit } => {
            let catalog = MetadataCatalog::from_config(&config.metadata)?;
            if !catalog.is_available(*kind) {
                print_empty_list(&format!("No metadata provider configured for {}", kind));
                return Ok(());
            }
            let candidates = catalog.lookup(*kind, query, *limit).await;
            print_section_header(&format!("{} matches for {:?}", kind, query));
            if candidates.is_empty() {
                print_empty_list("No matches");
            } else {
                print_candidates(&candidates);
            }
            print_section_footer();
            return Ok(());
        }
        _ => {}
    }

    let collection = Collection::open(&config)?;
    let session = collection.session();

    match cli_args.command {
        Command::Register {
            email,
            password,
            username,
        } => {
            let account_id = session
                .register(&email, &password, username.as_deref())
                .await?;
            print_success(&format!("Registered account {}, you can now log in", account_id));
        }
        Command::Login { email, password } => {
            let auth = session.sign_in(&email, &password).await?;
            print_success(&format!("Signed in as {}", auth.email));
        }
        Command::Logout => {
            session.sign_out().await?;
            print_success("Signed out");
        }
        Command::Guest => {
            session.enter_guest_mode()?;
            print_success("Guest mode on, the collection lives on this machine only");
        }
        Command::LeaveGuest => {
            session.leave_guest_mode()?;
            print_success("Left guest mode, the guest collection was deleted");
        }
        Command::Status => {
            print_section_header("Session");
            let mode = session.mode()?;
            print_key_value("mode", mode.name());
            if let SessionMode::Authenticated(auth) = &mode {
                print_key_value("account", &auth.account_id.to_string());
                print_key_value("email", &auth.email);
                if let Some(username) = &auth.username {
                    print_key_value("username", username);
                }
                print_key_value("backend", &config.backend_url);
            }
            if let Ok(capabilities) = collection.capabilities() {
                print_key_value("store", &capabilities.backend.to_string());
            }
            print_section_footer();
            if let SessionMode::Authenticated(_) = mode {
                if let Err(err) = session.verify().await {
                    print_warning(&format!("The backend did not confirm the session: {}", err));
                }
            }
        }
        Command::List { filter, kind } => {
            let filter = CollectionFilter::try_from(FilterQuery {
                filter: Some(filter),
                kind,
            })?;
            let entries = collection.list(&filter).await?;
            print_entries(&entries, &filter);
        }
        Command::Show { id } => {
            let entry = collection.get(&id).await?;
            print_entry(&entry);
        }
        Command::Add(args) => {
            // Fail on the session before spending time on lookups.
            collection.capabilities()?;
            let draft = build_draft(args, &config).await?;
            let entry = collection.create(&draft).await?;
            print_success(&format!("Added {} {} ({})", entry.kind, entry.title, entry.id));
            for season in &entry.seasons {
                print_key_value(&format!("season {}", season.season_number), &season.id);
            }
        }
        Command::Update(args) => {
            let update = MediaUpdate {
                title: args.title,
                status: args.status,
                rating: optional_change(args.rating, args.clear_rating),
                poster_url: optional_change(args.poster_url, args.clear_poster_url),
                review: optional_change(args.review, args.clear_review),
                notes: optional_change(args.notes, args.clear_notes),
            };
            let entry = collection.update(&args.id, &update).await?;
            print_success(&format!("Updated {}", entry.title));
        }
        Command::Delete { id, yes } => {
            if !yes {
                bail!("Refusing to delete {} without --yes", id);
            }
            collection.delete(&id).await?;
            print_success(&format!("Deleted {}", id));
        }
        Command::Watch { season_id } => {
            let season = collection.increment_episodes(&season_id).await?;
            print_season(&season);
        }
        Command::Unwatch { season_id } => {
            let season = collection.decrement_episodes(&season_id).await?;
            print_season(&season);
        }
        Command::Season(args) => {
            let update = SeasonUpdate {
                total_episodes: args.total,
                episodes_watched: args.watched,
                rating: optional_change(args.rating, args.clear_rating),
            };
            if update == SeasonUpdate::default() {
                bail!("Nothing to update, pass --total, --watched, --rating or --clear-rating");
            }
            let season = collection.update_season(&args.season_id, &update).await?;
            print_season(&season);
        }
        Command::Genres { .. } | Command::Providers | Command::Lookup { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli_args = CliArgs::parse();
    match run(cli_args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn parses_season_outlines() {
        let season = parse_season("2:10").unwrap();
        assert_eq!(season.season_number, 2);
        assert_eq!(season.total_episodes, 10);
        assert!(parse_season("2").is_err());
        assert!(parse_season("two:10").is_err());
    }

    #[test]
    fn lookup_limit_reaches_the_pick() {
        assert_eq!(lookup_limit(0), DEFAULT_LOOKUP_LIMIT);
        assert_eq!(lookup_limit(DEFAULT_LOOKUP_LIMIT + 4), DEFAULT_LOOKUP_LIMIT + 5);
        assert_eq!(lookup_limit(usize::MAX), usize::MAX);
    }

    #[test]
    fn clearing_wins_over_missing_value() {
        assert_eq!(optional_change::<u8>(None, true), Some(None));
        assert_eq!(optional_change(Some(7u8), false), Some(Some(7)));
        assert_eq!(optional_change::<u8>(None, false), None);
    }

    #[test]
    fn parses_add_with_seasons_and_statuses() {
        let args = CliArgs::try_parse_from([
            "media-tracker",
            "add",
            "--kind",
            "series",
            "--title",
            "Dark",
            "--status",
            "in_progress",
            "--season",
            "1:10",
            "--season",
            "2:8",
        ])
        .unwrap();
        match args.command {
            Command::Add(add) => {
                assert_eq!(add.kind, MediaKind::Series);
                assert_eq!(add.status, Some(MediaStatus::InProgress));
                assert_eq!(add.seasons.len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rating_and_clear_rating_conflict() {
        let result = CliArgs::try_parse_from([
            "media-tracker",
            "season",
            "s1",
            "--rating",
            "8",
            "--clear-rating",
        ]);
        assert!(result.is_err());
    }
}
