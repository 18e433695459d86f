use anyhow::Result;
use clap::{Parser, Subcommand};
use grit::areas::repository::Repository;
use grit::commands::porcelain::clone::clone_repository;
use grit::commands::porcelain::pull::PullOptions;
use grit::commands::porcelain::push::PushOptions;
use grit::commands::porcelain::reset::ResetMode;

#[derive(Parser)]
#[command(
    name = "grit",
    version = "0.1.0",
    about = "A Git-compatible version control client",
    long_about = "grit is a version-control client compatible on disk with the Git \
    repository format: objects it creates can be read by git, and indexes it writes \
    can be consumed by git."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Initialize a new repository")]
    Init {
        #[arg(index = 1, help = "Directory to initialize (defaults to the current)")]
        path: Option<String>,
    },
    #[command(name = "cat-file", about = "Print the content of an object")]
    CatFile {
        #[arg(short = 'p', long = "pretty", help = "Pretty-print the object")]
        pretty: bool,
        #[arg(index = 1, help = "Object hash, prefix, or revision")]
        object: String,
    },
    #[command(name = "hash-object", about = "Hash a file as a blob")]
    HashObject {
        #[arg(short, long, help = "Write the object to the object database")]
        write: bool,
        #[arg(index = 1)]
        file: String,
    },
    #[command(about = "Add files or directories to the index")]
    Add {
        #[arg(index = 1, required = true, help = "Files or directories to stage")]
        paths: Vec<String>,
    },
    #[command(about = "Record the staged tree as a new commit")]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: String,
        #[arg(long, help = "Override the author name")]
        author_name: Option<String>,
        #[arg(long, help = "Override the author email")]
        author_email: Option<String>,
    },
    #[command(about = "Show the working tree status")]
    Status,
    #[command(about = "Show commit history")]
    Log {
        #[arg(long, help = "One line per commit")]
        oneline: bool,
        #[arg(short = 'n', help = "Limit the number of commits")]
        count: Option<usize>,
        #[arg(long, help = "Limit the number of commits")]
        max_count: Option<usize>,
    },
    #[command(about = "Show changes between worktree, index and HEAD")]
    Diff {
        #[arg(long, help = "Compare the index against HEAD")]
        cached: bool,
        #[arg(long, help = "Alias of --cached")]
        staged: bool,
        #[arg(index = 1, help = "Restrict the diff to these paths")]
        paths: Vec<String>,
    },
    #[command(about = "Show which commit last changed each line of a file")]
    Blame {
        #[arg(index = 1)]
        file: String,
    },
    #[command(about = "Reset HEAD, and optionally the index and worktree")]
    Reset {
        #[arg(long, help = "Move the branch only")]
        soft: bool,
        #[arg(long, help = "Also rebuild the index (default)")]
        mixed: bool,
        #[arg(long, help = "Also rebuild the worktree")]
        hard: bool,
        #[arg(index = 1, help = "Target revision (defaults to HEAD)")]
        target: Option<String>,
        #[arg(index = 2, last = true, help = "Restore only these paths in the index")]
        paths: Vec<String>,
    },
    #[command(about = "Manage remote repositories")]
    Remote {
        #[command(subcommand)]
        command: Option<RemoteCommands>,
        #[arg(short, long, help = "Show fetch and push URLs")]
        verbose: bool,
    },
    #[command(about = "Clone a remote repository")]
    Clone {
        #[arg(index = 1)]
        url: String,
        #[arg(index = 2, help = "Target directory")]
        directory: Option<String>,
    },
    #[command(about = "Fetch from a remote and integrate")]
    Pull {
        #[arg(index = 1)]
        remote: Option<String>,
        #[arg(index = 2)]
        branch: Option<String>,
        #[arg(long, help = "Refuse to merge when a fast-forward is impossible")]
        ff_only: bool,
        #[arg(long, help = "Rebase instead of merging (not supported)")]
        rebase: bool,
    },
    #[command(about = "Update a remote with local commits")]
    Push {
        #[arg(index = 1)]
        remote: Option<String>,
        #[arg(index = 2)]
        branch: Option<String>,
        #[arg(short, long, help = "Allow non-fast-forward updates")]
        force: bool,
        #[arg(short = 'u', long, help = "Record the upstream for the branch")]
        set_upstream: bool,
        #[arg(long, help = "Push all branches")]
        all: bool,
        #[arg(long, help = "Push tags as well")]
        tags: bool,
        #[arg(long, help = "Report what would be pushed without sending")]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum RemoteCommands {
    #[command(about = "Add a remote")]
    Add { name: String, url: String },
    #[command(about = "Remove a remote")]
    Remove { name: String },
    #[command(about = "List remotes")]
    List,
    #[command(about = "Show details for one remote")]
    Show { name: String },
}

fn open_repository() -> Result<Repository> {
    let cwd = std::env::current_dir()?;
    Repository::discover(&cwd, Box::new(std::io::stdout()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path } => {
            let target = match path {
                Some(path) => std::path::PathBuf::from(path),
                None => std::env::current_dir()?,
            };
            std::fs::create_dir_all(&target)?;
            let mut repository =
                Repository::new(target.canonicalize()?, Box::new(std::io::stdout()))?;
            repository.init()
        }
        Commands::CatFile { object, .. } => open_repository()?.cat_file(&object),
        Commands::HashObject { write, file } => {
            let cwd = std::env::current_dir()?;
            let mut repository = Repository::new(cwd, Box::new(std::io::stdout()))?;
            repository.hash_object(&file, write)
        }
        Commands::Add { paths } => open_repository()?.add(&paths),
        Commands::Commit {
            message,
            author_name,
            author_email,
        } => open_repository()?
            .commit(&message, author_name, author_email)
            .map(|_| ()),
        Commands::Status => open_repository()?.status(),
        Commands::Log {
            oneline,
            count,
            max_count,
        } => open_repository()?.log(oneline, count.or(max_count)),
        Commands::Diff {
            cached,
            staged,
            paths,
        } => open_repository()?.diff(cached || staged, &paths),
        Commands::Blame { file } => open_repository()?.blame(&file),
        Commands::Reset {
            soft,
            mixed: _,
            hard,
            target,
            paths,
        } => {
            let mode = if soft {
                ResetMode::Soft
            } else if hard {
                ResetMode::Hard
            } else {
                ResetMode::Mixed
            };
            open_repository()?.reset(mode, target.as_deref().unwrap_or(""), &paths)
        }
        Commands::Remote { command, verbose } => {
            let mut repository = open_repository()?;
            match command {
                Some(RemoteCommands::Add { name, url }) => repository.remote_add(&name, &url),
                Some(RemoteCommands::Remove { name }) => repository.remote_remove(&name),
                Some(RemoteCommands::Show { name }) => repository.remote_show(&name),
                Some(RemoteCommands::List) | None => repository.remote_list(verbose),
            }
        }
        Commands::Clone { url, directory } => {
            clone_repository(&url, directory.as_deref(), Box::new(std::io::stdout()))
        }
        Commands::Pull {
            remote,
            branch,
            ff_only,
            rebase,
        } => open_repository()?.pull(PullOptions {
            remote,
            branch,
            ff_only,
            rebase,
        }),
        Commands::Push {
            remote,
            branch,
            force,
            set_upstream,
            all,
            tags,
            dry_run,
        } => open_repository()?.push(PushOptions {
            remote,
            branch,
            force,
            set_upstream,
            all,
            tags,
            dry_run,
        }),
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
