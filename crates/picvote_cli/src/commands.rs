//! Command handlers wired against the core services.

use crate::Command;
use picvote_core::gallery::profile_summary;
use picvote_core::service::submission_service::image_data_url;
use picvote_core::service::vote_service::load_membership;
use picvote_core::{
    init_logging, open_shared, AppConfig, Credentials, Entry, EntryDraft, GalleryQuery,
    GalleryState, LocalGalleryService, LocalIdentityProvider, RemoteGallery, SessionService,
    SharedConnection, SnapshotLoader, SqliteKeyValueStore, SubmissionService, VoteError,
    VoteReconciler, VoteStatus, VoteSyncQueue,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

struct Context {
    config: AppConfig,
    conn: SharedConnection,
    remote: Arc<LocalGalleryService>,
}

impl Context {
    fn open(config_path: Option<&Path>) -> CliResult<Self> {
        let config = AppConfig::load(config_path)?;
        std::fs::create_dir_all(&config.data_dir)?;

        let log_dir = absolute(config.log_dir())?;
        if let Err(err) = init_logging(&config.log_level, &log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }

        let conn = open_shared(config.db_path())?;
        let remote = Arc::new(LocalGalleryService::new(conn.clone(), config.latency()));
        Ok(Self {
            config,
            conn,
            remote,
        })
    }

    fn store(&self) -> SqliteKeyValueStore {
        SqliteKeyValueStore::new(self.conn.clone())
    }

    /// Entries and session fetched together, combined with stored votes.
    async fn load_state(&self) -> CliResult<GalleryState> {
        let snapshot = SnapshotLoader::new(self.remote.clone()).load().await;
        if let Some(err) = &snapshot.entries_error {
            return Err(format!("could not load the gallery: {err}").into());
        }
        let membership = load_membership(&self.store())?;
        Ok(snapshot.into_state(membership))
    }
}

pub async fn run(config_path: Option<&Path>, command: Command) -> CliResult {
    let ctx = Context::open(config_path)?;
    match command {
        Command::List {
            sort,
            category,
            search,
        } => {
            let state = ctx.load_state().await?;
            let query = GalleryQuery {
                sort,
                category,
                search,
            };
            let listing = query.apply(&state.entries);
            if listing.is_empty() {
                println!("No entries match.");
            }
            for entry in listing {
                print_entry(entry, state.membership.state_of(&entry.id));
            }
            Ok(())
        }
        Command::Vote { entry_id } => vote(&ctx, &entry_id).await,
        Command::Login { email, password } => {
            let session = SessionService::new(LocalIdentityProvider::new(), ctx.store());
            let identity = session
                .sign_in(&Credentials::new(email, password))
                .await?;
            println!("Signed in as {} (@{})", identity.name, identity.handle);
            Ok(())
        }
        Command::Logout => {
            SessionService::new(LocalIdentityProvider::new(), ctx.store()).sign_out()?;
            println!("Signed out.");
            Ok(())
        }
        Command::Submit {
            image,
            name,
            tags,
            category,
            no_analysis,
        } => {
            let request = SubmitRequest {
                image,
                name,
                tags,
                category,
                analyze: !no_analysis,
            };
            submit(&ctx, request).await
        }
        Command::Profile => profile(&ctx).await,
    }
}

async fn vote(ctx: &Context, entry_id: &str) -> CliResult {
    let state = ctx.load_state().await?;
    let remote: Arc<dyn RemoteGallery> = ctx.remote.clone();
    let reconciler = VoteReconciler::new(
        ctx.store(),
        VoteSyncQueue::spawn(remote, ctx.config.retry_policy()),
    );
    let mut outcomes = reconciler.queue().subscribe();

    let next = match reconciler.toggle_vote(&state, entry_id) {
        Ok(next) => next,
        Err(VoteError::AuthenticationRequired) => {
            reconciler.shutdown().await;
            return Err("sign in first with `picvote login`".into());
        }
        Err(err) => {
            reconciler.shutdown().await;
            return Err(err.into());
        }
    };

    if let Some(entry) = next.entry(entry_id) {
        let verb = match next.membership.state_of(entry_id) {
            VoteStatus::Voted => "Voted for",
            VoteStatus::NotVoted => "Removed vote from",
        };
        println!("{verb} \"{}\" ({} votes)", entry.name, entry.votes);
    }

    // Let the queued delta reach the gallery before the process exits.
    reconciler.shutdown().await;
    while let Ok(outcome) = outcomes.try_recv() {
        if let Some(error) = &outcome.error {
            eprintln!(
                "warning: vote not synced after {} attempt(s): {error}",
                outcome.attempts
            );
        }
    }
    Ok(())
}

struct SubmitRequest {
    image: PathBuf,
    name: Option<String>,
    tags: Vec<String>,
    category: Option<picvote_core::Category>,
    analyze: bool,
}

async fn submit(ctx: &Context, request: SubmitRequest) -> CliResult {
    let state = ctx.load_state().await?;
    if !state.is_authenticated() {
        return Err("sign in first with `picvote login`".into());
    }

    let bytes = std::fs::read(&request.image)
        .map_err(|err| format!("cannot read `{}`: {err}", request.image.display()))?;
    let mime_type = mime_for(&request.image);
    let service = SubmissionService::new(ctx.remote.clone(), ctx.config.analyzer());

    let mut draft = EntryDraft {
        image_url: image_data_url(&bytes, mime_type),
        ..EntryDraft::default()
    };
    if request.analyze {
        match service.suggest(&bytes, mime_type).await {
            Some(suggestion) => {
                suggestion.apply_to(&mut draft);
                println!("Suggested: \"{}\" [{}]", suggestion.title, suggestion.category);
            }
            None => println!("No suggestion available; using your input."),
        }
    }
    if let Some(name) = request.name {
        draft.name = name;
    }
    for tag in &request.tags {
        draft.add_tag(tag);
    }
    if request.category.is_some() {
        draft.category = request.category;
    }

    let (_, entry) = service.submit(&state, draft).await?;
    println!("Submitted \"{}\" as {}", entry.name, entry.id);
    Ok(())
}

async fn profile(ctx: &Context) -> CliResult {
    let state = ctx.load_state().await?;
    let identity = state
        .identity
        .as_ref()
        .ok_or("sign in first with `picvote login`")?;
    let summary = profile_summary(&state.entries, &state.membership, &identity.id);

    println!("{} (@{})", identity.name, identity.handle);
    println!(
        "{} submission(s), {} vote(s) received, {} vote(s) cast",
        summary.submissions.len(),
        summary.votes_received,
        summary.voted.len()
    );
    println!("\nSubmissions:");
    for entry in &summary.submissions {
        print_entry(entry, state.membership.state_of(&entry.id));
    }
    println!("\nVoted:");
    for entry in &summary.voted {
        print_entry(entry, VoteStatus::Voted);
    }
    Ok(())
}

fn print_entry(entry: &Entry, status: VoteStatus) {
    let marker = match status {
        VoteStatus::Voted => '*',
        VoteStatus::NotVoted => ' ',
    };
    let tags = entry
        .tags
        .iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<_>>()
        .join(" ");
    println!(
        "{marker} {:<32} {:>6}  {} [{}] by {}  {tags}",
        entry.id, entry.votes, entry.name, entry.category, entry.author
    );
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

fn absolute(path: PathBuf) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    Ok(std::env::current_dir()?.join(path))
}
