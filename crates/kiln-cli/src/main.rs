//! The `kiln` command-line client: a thin dispatcher over `kiln-api`'s
//! orchestrator, with a JSON sidecar (see [`state`]) standing in for the
//! persistent repository metadata store a real TerminusDB deployment would
//! provide.

mod args;
mod state;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use kiln_api::{error, Envelope, Orchestrator};
use kiln_layer_store::fs::FsStore;
use kiln_sync::{AllowAll, HttpTransport};
use structopt::StructOpt;
use tracing_subscriber::FmtSubscriber;

use args::{Args, Command};

fn main() -> ExitCode {
    let args = Args::from_args();

    let subscriber = FmtSubscriber::builder().with_max_level(args.log).finish();
    tracing::subscriber::set_global_default(subscriber).expect("only subscriber installed for this process");

    match run(&args) {
        Ok(envelope) => {
            print_envelope(&args, &envelope);
            ExitCode::from(0)
        },
        Err(Outcome::Sync(envelope, code)) => {
            print_envelope(&args, &envelope);
            ExitCode::from(code)
        },
        Err(Outcome::Other(err)) => {
            eprintln!("kiln: {err:#}");
            ExitCode::from(3)
        },
    }
}

fn print_envelope(args: &Args, envelope: &Envelope) {
    if args.json {
        println!("{}", serde_json::to_string_pretty(envelope).expect("Envelope always serializes"));
    } else {
        println!("{}", envelope.message);
    }
}

/// Distinguishes a `kiln-sync` failure (which carries its own exit code and
/// envelope per §7) from every other kind of failure (file I/O, a malformed
/// bundle, an argument error caught before any engine call runs).
enum Outcome {
    Sync(Envelope, u8),
    Other(anyhow::Error),
}

impl From<anyhow::Error> for Outcome {
    fn from(err: anyhow::Error) -> Self {
        Outcome::Other(err)
    }
}

fn sync_outcome<E: std::error::Error + Send + Sync + 'static>(err: kiln_sync::Error<E>) -> Outcome {
    let code = error::cli_exit_code(&err);
    let (_status, envelope) = error::envelope(&err);
    Outcome::Sync(envelope, code as u8)
}

fn run(args: &Args) -> Result<Envelope, Outcome> {
    match &args.command {
        Command::Bundle { path, branch, output } => bundle(path, branch, output),
        Command::Unbundle { path, file, branch } => unbundle(path, file, branch),
        Command::Clone {
            remote_url,
            path,
            token,
        } => clone(remote_url, path, token),
        Command::Fetch { path, remote, token } => fetch(path, remote, token),
        Command::Push {
            path,
            branch,
            remote,
            token,
        } => push(path, branch, remote, token),
        Command::Pull {
            path,
            branch,
            remote,
            token,
        } => pull(path, branch, remote, token),
        Command::Log { path, branch } => log(path, branch),
    }
}

fn open(path: &Path) -> anyhow::Result<state::Repo> {
    state::Repo::open(path).with_context(|| format!("opening repository at {}", path.display()))
}

fn orchestrator(repo: state::Repo) -> Orchestrator<FsStore, AllowAll> {
    Orchestrator {
        db: repo.db,
        store: repo.store,
        auth: AllowAll,
    }
}

fn bundle(path: &Path, branch: &str, output: &Path) -> Result<Envelope, Outcome> {
    let repo = open(path)?;
    let orch = orchestrator(repo);
    match orch.bundle(branch) {
        Ok(Some(bytes)) => {
            std::fs::write(output, &bytes)
                .with_context(|| format!("writing bundle to {}", output.display()))
                .map_err(Outcome::from)?;
            Ok(Envelope::success(format!("wrote bundle of '{branch}' to {}", output.display())))
        },
        Ok(None) => Ok(Envelope::success(format!("branch '{branch}' has no commits; nothing to bundle"))),
        Err(err) => Err(sync_outcome(err)),
    }
}

fn unbundle(path: &Path, file: &Path, branch: &str) -> Result<Envelope, Outcome> {
    let repo = open(path)?;
    let bytes = bytes::Bytes::from(
        std::fs::read(file)
            .with_context(|| format!("reading bundle from {}", file.display()))
            .map_err(Outcome::from)?,
    );
    let orch = orchestrator(repo);
    let result = orch.unbundle(bytes, branch);
    let envelope = match result {
        Ok(envelope) => envelope,
        Err(err) => return Err(sync_outcome(err)),
    };
    save_orchestrator(path, orch)?;
    Ok(envelope)
}

fn clone(remote_url: &str, path: &Path, token: &str) -> Result<Envelope, Outcome> {
    if path.join(".kiln").exists() {
        return Err(Outcome::from(anyhow::anyhow!(
            "{} already has a .kiln directory",
            path.display()
        )));
    }
    std::fs::create_dir_all(path).with_context(|| format!("creating {}", path.display()))?;
    let store = FsStore::open(path.join(".kiln").join("objects")).context("opening layer store")?;
    let transport = HttpTransport::new(token);
    let (orch, envelope) = match Orchestrator::clone_into(AllowAll, store, remote_url, &transport) {
        Ok(ok) => ok,
        Err(err) => {
            // Per the §4.9 compensation rule: a pack we can't trust the
            // contents of leaves nothing worth keeping on disk.
            if err.triggers_clone_compensation() {
                let _ = std::fs::remove_dir_all(path.join(".kiln"));
            }
            return Err(sync_outcome(err));
        },
    };
    save_orchestrator(path, orch)?;
    Ok(envelope)
}

fn fetch(path: &Path, remote: &str, token: &str) -> Result<Envelope, Outcome> {
    let repo = open(path)?;
    let orch = orchestrator(repo);
    let transport = HttpTransport::new(token);
    let result = orch.fetch(remote, &transport);
    let envelope = match result {
        Ok(envelope) => envelope,
        Err(err) => return Err(sync_outcome(err)),
    };
    save_orchestrator(path, orch)?;
    Ok(envelope)
}

fn push(path: &Path, branch: &str, remote: &str, token: &str) -> Result<Envelope, Outcome> {
    let repo = open(path)?;
    let orch = orchestrator(repo);
    let transport = HttpTransport::new(token);
    let result = orch.push(branch, remote, &transport);
    let envelope = match result {
        Ok(envelope) => envelope,
        Err(err) => return Err(sync_outcome(err)),
    };
    save_orchestrator(path, orch)?;
    Ok(envelope)
}

fn pull(path: &Path, branch: &str, remote: &str, token: &str) -> Result<Envelope, Outcome> {
    let repo = open(path)?;
    let orch = orchestrator(repo);
    let transport = HttpTransport::new(token);
    let result = orch.pull(branch, remote, branch, &transport);
    let envelope = match result {
        Ok(envelope) => envelope,
        Err(err) => return Err(sync_outcome(err)),
    };
    save_orchestrator(path, orch)?;
    Ok(envelope)
}

fn log(path: &Path, branch: &str) -> Result<Envelope, Outcome> {
    let repo = open(path)?;
    let head = match repo.db.local.branch_head_commit(branch) {
        Some(head) => head,
        None => return Ok(Envelope::success(format!("branch '{branch}' has no commits"))),
    };
    let ids =
        kiln_history::ancestors_oldest_first(&*repo.db.local, head).expect("RepoMetadata::parents is infallible");
    let lines: Vec<String> = ids
        .into_iter()
        .rev()
        .filter_map(|id| repo.db.local.get_commit(id))
        .map(|c| format!("{} {} — {}", c.id, c.author, c.message))
        .collect();
    Ok(Envelope::success(lines.join("\n")).with("commits", lines))
}

fn save_orchestrator(path: &Path, orch: Orchestrator<FsStore, AllowAll>) -> Result<(), Outcome> {
    state::Repo::from_parts(orch.db, orch.store, path)
        .save()
        .map_err(Outcome::from)
}
