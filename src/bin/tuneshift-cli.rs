use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tuneshift::{
    build_adapter, CandidatePolicy, Credential, JsonFileStore, MigrateError, MigrationConfig,
    MigrationEvent, Migrator, SearchQuery, ServiceKind,
};

#[derive(Parser)]
#[command(name = "tuneshift-cli")]
#[command(about = "CLI for TuneShift - move playlists between music services", long_about = None)]
struct Cli {
    #[command(flatten)]
    tokens: Tokens,

    /// Config file overriding rate limits, batch sizes and thresholds
    #[arg(short, long, env = "TUNESHIFT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Access tokens, one per service (flags or environment)
#[derive(Args)]
struct Tokens {
    /// Spotify access token
    #[arg(long, env = "SPOTIFY_TOKEN", hide_env_values = true)]
    spotify_token: Option<String>,

    /// YouTube (Google OAuth) access token
    #[arg(long, env = "YOUTUBE_TOKEN", hide_env_values = true)]
    youtube_token: Option<String>,

    /// SoundCloud access token
    #[arg(long, env = "SOUNDCLOUD_TOKEN", hide_env_values = true)]
    soundcloud_token: Option<String>,

    /// Tidal access token
    #[arg(long, env = "TIDAL_TOKEN", hide_env_values = true)]
    tidal_token: Option<String>,
}

impl Tokens {
    fn credential(&self, service: ServiceKind) -> Result<Credential, MigrateError> {
        let (token, env) = match service {
            ServiceKind::Spotify => (&self.spotify_token, "SPOTIFY_TOKEN"),
            ServiceKind::Youtube => (&self.youtube_token, "YOUTUBE_TOKEN"),
            ServiceKind::Soundcloud => (&self.soundcloud_token, "SOUNDCLOUD_TOKEN"),
            ServiceKind::Tidal => (&self.tidal_token, "TIDAL_TOKEN"),
        };
        token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(Credential::new)
            .ok_or_else(|| {
                MigrateError::Config(format!(
                    "No {} token: pass --{}-token or set {}",
                    service,
                    service.id(),
                    env
                ))
            })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Service {
    Spotify,
    Youtube,
    Soundcloud,
    Tidal,
}

impl From<Service> for ServiceKind {
    fn from(s: Service) -> Self {
        match s {
            Service::Spotify => ServiceKind::Spotify,
            Service::Youtube => ServiceKind::Youtube,
            Service::Soundcloud => ServiceKind::Soundcloud,
            Service::Tidal => ServiceKind::Tidal,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Policy {
    FirstAcceptable,
    BestScore,
}

impl From<Policy> for CandidatePolicy {
    fn from(p: Policy) -> Self {
        match p {
            Policy::FirstAcceptable => CandidatePolicy::FirstAcceptable,
            Policy::BestScore => CandidatePolicy::BestScore,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List your playlists on a service
    Playlists {
        #[arg(value_enum)]
        service: Service,
    },
    /// Search a service's catalog
    Search {
        #[arg(value_enum)]
        service: Service,

        /// Track title
        query: String,

        /// Artist name
        #[arg(short, long, default_value = "")]
        artist: String,

        /// Limit results
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Copy playlists from one service to another
    Migrate {
        /// Source service
        #[arg(long, value_enum)]
        from: Service,

        /// Destination service
        #[arg(long, value_enum)]
        to: Service,

        /// Source playlist ID (repeatable)
        #[arg(short, long = "playlist", required = true)]
        playlists: Vec<String>,

        /// Append the finished report to this JSON-lines history file
        #[arg(long)]
        history: Option<PathBuf>,

        /// Keep going when a playlist fails
        #[arg(long)]
        continue_on_error: bool,

        /// How to choose among acceptable candidates
        #[arg(long, value_enum)]
        policy: Option<Policy>,
    },
}

fn print_event(event: &MigrationEvent) {
    match event {
        MigrationEvent::PlaylistStarted { name, index, count } => {
            println!("[{}/{}] {}", index + 1, count, name);
        }
        MigrationEvent::TrackProcessed {
            track,
            matched,
            position,
            total,
            ..
        } => {
            let mark = if *matched { "✓" } else { "✗" };
            println!("   {} ({}/{}) {}", mark, position + 1, total, track);
        }
        MigrationEvent::PlaylistCompleted {
            name,
            matched,
            total,
        } => {
            println!("✅ {}: {}/{} tracks migrated", name, matched, total);
        }
        MigrationEvent::PlaylistFailed { name, error } => {
            println!("⚠️  {} skipped: {}", name, error);
        }
        _ => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tuneshift=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MigrationConfig::from_file(path)?,
        None => MigrationConfig::default(),
    };

    match cli.command {
        Commands::Playlists { service } => {
            let kind = ServiceKind::from(service);
            let credential = cli.tokens.credential(kind)?;
            let adapter = build_adapter(kind, &config)?;

            let playlists = adapter.list_playlists(&credential).await?;
            println!("{} playlists on {}:", playlists.len(), kind);
            for playlist in playlists {
                println!(
                    "- {} ({} tracks) [ID: {}]",
                    playlist.name, playlist.track_count, playlist.id
                );
            }
        }
        Commands::Search {
            service,
            query,
            artist,
            limit,
        } => {
            let kind = ServiceKind::from(service);
            let credential = cli.tokens.credential(kind)?;
            let adapter = build_adapter(kind, &config)?;

            println!("Searching {} for '{}'...", kind, query);
            let query = SearchQuery {
                title: query,
                artist,
            };
            let results = adapter.search_candidates(&credential, &query, limit).await?;
            for (i, candidate) in results.iter().enumerate() {
                let artists: Vec<&str> = candidate.artists.iter().map(|a| a.name.as_str()).collect();
                println!(
                    "{}. {} - {} (ref: {})",
                    i + 1,
                    artists.join(", "),
                    candidate.name,
                    candidate.reference
                );
            }
        }
        Commands::Migrate {
            from,
            to,
            playlists,
            history,
            continue_on_error,
            policy,
        } => {
            if continue_on_error {
                config.abort_on_playlist_failure = false;
            }
            if let Some(policy) = policy {
                config.candidate_policy = policy.into();
            }

            let (source_kind, destination_kind) = (ServiceKind::from(from), ServiceKind::from(to));
            let source_credential = cli.tokens.credential(source_kind)?;
            let destination_credential = cli.tokens.credential(destination_kind)?;
            let source = build_adapter(source_kind, &config)?;
            let destination = build_adapter(destination_kind, &config)?;
            let store = history.map(JsonFileStore::new);

            println!(
                "Migrating {} playlist(s) from {} to {}...",
                playlists.len(),
                source_kind,
                destination_kind
            );

            let (tx, mut rx) = mpsc::unbounded_channel();
            let printer = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    print_event(&event);
                }
            });

            let mut migrator = Migrator::new(
                source.as_ref(),
                &source_credential,
                destination.as_ref(),
                &destination_credential,
                config,
            )
            .with_events(tx);
            if let Some(store) = &store {
                migrator = migrator.with_store(store);
            }

            let outcome = migrator.run(&playlists).await;
            drop(migrator);
            printer.await?;

            let report = match outcome {
                Ok(report) => report,
                Err(failure) => {
                    println!(
                        "❌ Stopped after {} playlist(s): {}",
                        failure.partial_report.playlists.len(),
                        failure.error
                    );
                    return Err(failure.into());
                }
            };

            println!(
                "\nMigrated {}/{} tracks ({}%)",
                report.matched_tracks,
                report.total_tracks,
                report.success_rate()
            );
            if !report.skipped_tracks.is_empty() {
                println!("   Skipped tracks:");
                for skipped in &report.skipped_tracks {
                    println!("   - {} by {}: {}", skipped.name, skipped.artist, skipped.reason);
                }
            }
            if !report.failed_playlists.is_empty() {
                println!("   Failed playlists:");
                for failed in &report.failed_playlists {
                    println!("   - {}: {}", failed.name, failed.error);
                }
            }
        }
    }

    Ok(())
}
