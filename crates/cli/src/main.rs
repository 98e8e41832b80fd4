//! Quince CLI — version control for RDF data, piggy-backing on Git.
//!
//! Calls `quince-core` directly; Git provides branching, merging, and
//! history on top of the sorted quad files the store maintains.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use quince_core::diff::{generate_diffs, SparqlDiffList};
use quince_core::git;
use quince_core::input;
use quince_core::parser::{RdfFormat, RdfParser};
use quince_core::serializer::{create_serializer, OutputEncoding};
use quince_core::sink::{UpdateMode, UpdateSink};
use quince_core::{QuinceError, QuinceStore, Term, DEFAULT_GRAPH_IRI};

const SUCCESS: i32 = 0;
const ERRORS_FOUND: i32 = 1;
const INTERNAL_ERROR: i32 = 3;
const NOT_IN_REPO: i32 = 4;

/// Quince: RDF data management and collaboration for humans.
#[derive(Parser)]
#[command(name = "quince", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty Quince repository (or adopt an existing Git one)
    Init,
    /// Import RDF data from files or URLs into the repository
    Import {
        /// Paths or http(s) URLs of the files to import
        #[arg(required = true)]
        files: Vec<String>,

        /// IRI of the default graph to import into
        #[arg(short = 'g', long = "graph")]
        graph: Option<String>,
    },
    /// Export RDF data from the repository
    Export {
        /// Output file; the extension selects the format. Omit for stdout
        file: Option<PathBuf>,

        /// IRI of a graph to export ("default" for the default graph; repeatable)
        #[arg(short = 'g', long = "graph")]
        graphs: Vec<String>,

        /// Output format, overriding the file extension
        #[arg(short = 'f', long = "format")]
        format: Option<String>,
    },
    /// Add a statement to the repository
    Assert {
        /// The subject: an absolute IRI or a safe CURIE
        subject: String,

        /// The predicate: an absolute IRI or a safe CURIE
        predicate: String,

        /// The object: a quoted literal, absolute IRI or safe CURIE
        object: String,

        /// The named graph to add the statement to
        graph: Option<String>,
    },
    /// Remove all statements matching a pattern from the repository
    Retract {
        /// The subject pattern; '*' matches any subject
        subject: String,

        /// The predicate pattern; '*' matches any predicate
        predicate: String,

        /// The object pattern; '*' matches any object
        object: String,

        /// The graph pattern; '*' matches any graph
        graph: Option<String>,
    },
    /// Generate a diff report for a resource, graph or the whole repository
    Diff {
        /// Report only statements with this subject
        #[arg(short = 's', long = "subject")]
        subject: Option<String>,

        /// Report only statements from this named graph
        #[arg(short = 'g', long = "graph")]
        graph: Option<String>,

        /// Render the report as SPARQL Update commands
        #[arg(short = 'u', long = "update")]
        update: bool,

        /// Commit reference(s) to diff; none diffs the working tree against HEAD
        #[arg(num_args = 0..=2)]
        commits: Vec<String>,
    },
    /// Manage namespace prefix mappings
    Namespace {
        #[command(subcommand)]
        command: NamespaceCommands,
    },
    /// Manage the set of tracked SPARQL Update endpoints
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
    /// Ensure the quad files in the repository are properly sorted
    Sort {
        /// Check every quad file, not just locally modified ones
        #[arg(short = 'a', long)]
        all: bool,

        /// Check files modified since the given commit
        #[arg(short = 's', long)]
        since: Option<String>,
    },
}

#[derive(Subcommand)]
enum NamespaceCommands {
    /// Add a namespace prefix mapping
    Add {
        /// The namespace prefix to be added
        prefix: String,
        /// The IRI that the namespace prefix is mapped to
        iri: String,
    },
    /// Remove a namespace prefix mapping
    Remove {
        /// The namespace prefix to be removed
        prefix: String,
    },
    /// List all currently defined namespace prefix mappings
    List,
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// Track a new SPARQL Update endpoint
    Add { name: String, endpoint: String },
    /// Stop tracking an endpoint
    Remove { name: String },
    /// List all tracked endpoints
    List,
}

// ---------------------------------------------------------------------------
// Output helpers — messages go out '#'-prefixed so command output stays
// machine-consumable
// ---------------------------------------------------------------------------

fn msg(text: impl AsRef<str>) {
    println!("# {}", text.as_ref());
}

fn err(text: impl AsRef<str>) {
    eprintln!("# {}", text.as_ref());
}

fn report(e: &QuinceError) {
    for message in e.messages() {
        err(message);
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quince=warn".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let code = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| run(cli)))
        .unwrap_or(INTERNAL_ERROR);
    std::process::exit(code);
}

fn run(cli: Cli) -> i32 {
    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            err(format!("could not determine the current directory: {e}"));
            return INTERNAL_ERROR;
        }
    };

    if matches!(cli.command, Commands::Init) {
        return cmd_init(&cwd);
    }

    let Some(root) = git::find_working_tree(&cwd) else {
        err("You are not in a Quince repository. To make this directory a repository do quince init.");
        return NOT_IN_REPO;
    };
    let store_dir = root.join(git::QUINCE_DIR);

    let result = match cli.command {
        Commands::Init => unreachable!("init is handled above"),
        Commands::Import { files, graph } => cmd_import(&root, &store_dir, &files, graph),
        Commands::Export { file, graphs, format } => {
            cmd_export(&store_dir, file.as_deref(), &graphs, format)
        }
        Commands::Assert { subject, predicate, object, graph } => {
            cmd_assert(&root, &store_dir, &subject, &predicate, &object, graph.as_deref())
        }
        Commands::Retract { subject, predicate, object, graph } => {
            cmd_retract(&root, &store_dir, &subject, &predicate, &object, graph.as_deref())
        }
        Commands::Diff { subject, graph, update, commits } => cmd_diff(
            &root,
            subject.as_deref(),
            graph.as_deref(),
            update,
            &commits,
            cli.json,
        ),
        Commands::Namespace { command } => cmd_namespace(&store_dir, command, cli.json),
        Commands::Remote { command } => cmd_remote(&store_dir, command, cli.json),
        Commands::Sort { all, since } => cmd_sort(&root, &store_dir, all, since.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            report(&e);
            ERRORS_FOUND
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_init(cwd: &Path) -> i32 {
    match git::init(cwd) {
        Ok(outcome) => {
            if outcome.created_repository {
                msg("Initialized an empty Quince repository.");
            } else if outcome.created_store {
                msg("Added a Quince store to the existing Git repository.");
            } else {
                msg("This directory is already a Quince repository.");
            }
            SUCCESS
        }
        Err(e) => {
            report(&e);
            ERRORS_FOUND
        }
    }
}

fn cmd_import(
    root: &Path,
    store_dir: &Path,
    files: &[String],
    graph: Option<String>,
) -> Result<i32, QuinceError> {
    let default_graph = graph.map(|g| Term::iri(strip_angles(&g).to_string()));
    let mut store = QuinceStore::open(store_dir, default_graph)?;
    let mut failures = false;
    for file in files {
        match import_one(&mut store, file) {
            Ok(()) => msg(format!("'{file}' - OK")),
            Err(QuinceError::NoParser(_)) => {
                err(format!("'{file}' - No parser available for files with this file extension"));
                failures = true;
            }
            Err(QuinceError::Parse { message, .. }) => {
                err(format!("'{file}' - Parser Error: {message}"));
                failures = true;
            }
            Err(e) => {
                err(format!("'{file}' - {e}"));
                failures = true;
            }
        }
    }
    store.flush()?;
    git::add_untracked(root)?;
    Ok(if failures { ERRORS_FOUND } else { SUCCESS })
}

fn import_one(store: &mut QuinceStore, source: &str) -> Result<(), QuinceError> {
    let format = RdfFormat::from_path(Path::new(source))
        .ok_or_else(|| QuinceError::NoParser(source.to_string()))?;
    let reader: Box<dyn Read> = if source.starts_with("http://") || source.starts_with("https://")
    {
        let response = reqwest::blocking::get(source).map_err(|e| QuinceError::Parse {
            source_name: source.to_string(),
            message: e.to_string(),
        })?;
        Box::new(response)
    } else {
        Box::new(File::open(source)?)
    };
    let mut sink = UpdateSink::new(store, UpdateMode::Assert);
    RdfParser::new(format).parse(BufReader::new(reader), source, &mut sink)
}

fn cmd_export(
    store_dir: &Path,
    file: Option<&Path>,
    graphs: &[String],
    format: Option<String>,
) -> Result<i32, QuinceError> {
    let store = QuinceStore::open(store_dir, None)?;

    let format = match format {
        Some(f) => f,
        None => match file {
            Some(path) => match RdfFormat::from_path(path) {
                Some(RdfFormat::NTriples) => "nt".to_string(),
                Some(RdfFormat::NQuads) => "nquads".to_string(),
                None => path
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            },
            None => "nquads".to_string(),
        },
    };

    let out: Box<dyn Write> = match file {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout()),
    };
    let mut serializer = create_serializer(&format, out, OutputEncoding::Utf8)?;

    let graph_terms: Option<Vec<Term>> = if graphs.is_empty() {
        None
    } else {
        Some(
            graphs
                .iter()
                .map(|g| {
                    if g == "default" {
                        Term::iri(DEFAULT_GRAPH_IRI)
                    } else {
                        Term::iri(strip_angles(g).to_string())
                    }
                })
                .collect(),
        )
    };

    serializer.on_start()?;
    for line in store.all_quads(graph_terms.as_deref()) {
        serializer.on_line(&line?)?;
    }
    serializer.on_end()?;
    Ok(SUCCESS)
}

fn cmd_assert(
    root: &Path,
    store_dir: &Path,
    subject: &str,
    predicate: &str,
    object: &str,
    graph: Option<&str>,
) -> Result<i32, QuinceError> {
    let mut store = QuinceStore::open(store_dir, None)?;
    let namespaces = store.namespaces()?;
    let (s, p, o, g) = input::make_quad(&namespaces, subject, predicate, object, graph)?;
    store.assert_quad(&s, &p, &o, g.as_ref())?;
    store.flush()?;
    git::add_untracked(root)?;

    let graph_term = g.unwrap_or_else(|| store.default_graph().clone());
    msg(format!("{} {} {} {} .", s.n3(), p.n3(), o.n3(), graph_term.n3()));
    Ok(SUCCESS)
}

fn cmd_retract(
    root: &Path,
    store_dir: &Path,
    subject: &str,
    predicate: &str,
    object: &str,
    graph: Option<&str>,
) -> Result<i32, QuinceError> {
    let mut store = QuinceStore::open(store_dir, None)?;
    let namespaces = store.namespaces()?;
    let (s, p, o, g) =
        input::make_quad_pattern(&namespaces, subject, predicate, object, graph)?;
    let retracted = store.retract_quad(&s, &p, &o, g.as_ref())?;
    store.flush()?;
    git::add_untracked(root)?;

    let plural = if retracted.len() == 1 { "" } else { "s" };
    msg(format!("Retracted {} quad{plural}.", retracted.len()));
    for line in &retracted {
        msg(line.trim_end());
    }
    Ok(SUCCESS)
}

fn cmd_diff(
    root: &Path,
    subject: Option<&str>,
    graph: Option<&str>,
    update: bool,
    commits: &[String],
    json: bool,
) -> Result<i32, QuinceError> {
    let diffs = generate_diffs(root, commits, subject, graph)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&diffs).unwrap_or_default());
        return Ok(SUCCESS);
    }
    if update {
        let sparql = SparqlDiffList::from_changes(&diffs);
        if sparql.any() {
            println!("{}", sparql.render());
        }
    } else {
        for line in diffs.render() {
            println!("{line}");
        }
    }
    Ok(SUCCESS)
}

fn cmd_namespace(
    store_dir: &Path,
    command: NamespaceCommands,
    json: bool,
) -> Result<i32, QuinceError> {
    let mut store = QuinceStore::open(store_dir, None)?;
    match command {
        NamespaceCommands::Add { prefix, iri } => {
            store.add_namespace(&prefix, &iri)?;
            msg(format!("{prefix}: <{}>", strip_angles(&iri)));
        }
        NamespaceCommands::Remove { prefix } => {
            store.remove_namespace(&prefix)?;
        }
        NamespaceCommands::List => {
            let mappings = store.namespaces()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&mappings).unwrap_or_default());
            } else {
                for (prefix, iri) in mappings {
                    println!("{prefix}: <{iri}>");
                }
            }
        }
    }
    Ok(SUCCESS)
}

fn cmd_remote(store_dir: &Path, command: RemoteCommands, json: bool) -> Result<i32, QuinceError> {
    let mut store = QuinceStore::open(store_dir, None)?;
    match command {
        RemoteCommands::Add { name, endpoint } => {
            store.add_remote(&name, &endpoint)?;
        }
        RemoteCommands::Remove { name } => {
            store.remove_remote(&name)?;
        }
        RemoteCommands::List => {
            let remotes = store.remotes()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&remotes).unwrap_or_default());
            } else {
                for (name, endpoint) in remotes {
                    println!("{name} {endpoint}");
                }
            }
        }
    }
    Ok(SUCCESS)
}

fn cmd_sort(
    root: &Path,
    store_dir: &Path,
    all: bool,
    since: Option<&str>,
) -> Result<i32, QuinceError> {
    let mut store = QuinceStore::open(store_dir, None)?;
    if all {
        let count = store.sort_quads(None)?;
        msg(format!("Checked {count} file{}.", if count == 1 { "" } else { "s" }));
        return Ok(SUCCESS);
    }
    let paths = git::modified_quad_paths(root, since)?;
    if paths.is_empty() {
        tracing::warn!("no locally modified files found in the quince repository");
        msg("No locally modified files found in the quince repository.");
        return Ok(SUCCESS);
    }
    let count = store.sort_quads(Some(&paths))?;
    msg(format!("Checked {count} file{}.", if count == 1 { "" } else { "s" }));
    Ok(SUCCESS)
}

/// IRIs may be given with or without the `<>` delimiters.
fn strip_angles(iri: &str) -> &str {
    iri.strip_prefix('<').and_then(|s| s.strip_suffix('>')).unwrap_or(iri)
}
