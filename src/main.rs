use clap::{Parser, Subcommand};
use std::path::PathBuf;
use xprofile::{EditorConfig, LineMap, Session, XProfileError};

const DEFAULT_PROFILE: &str = "xprofile.db";

#[derive(Parser, Debug)]
#[command(version, about = "Learn and explore the structure of XML documents")]
struct Cli {
    /// Profile database (defaults to the configured one, then ./xprofile.db)
    #[arg(short, long, global = true)]
    profile: Option<PathBuf>,

    /// JSON editor configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show full start tags instead of element names
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Learn the structure of one or more documents
    Import { files: Vec<PathBuf> },
    /// List known document types
    Roots,
    /// List elements known for a document type
    Elements { root: String },
    /// List known children of an element
    Children {
        root: String,
        element: String,
        #[arg(long, default_value = "")]
        parent: String,
    },
    /// List known attributes of an element
    Attributes {
        root: String,
        element: String,
        #[arg(long, default_value = "")]
        parent: String,
    },
    /// List known values of an attribute
    Values { element: String, attribute: String },
    /// Forget a document type and everything learned for it
    RemoveRoot { root: String },
    /// Print a skeleton document reconstructed from the profile
    Tree {
        /// A document type or element to start from (all roots if omitted)
        start: Option<String>,
    },
    /// Print the element outline of a document with flattening indices
    Outline { file: PathBuf },
    /// Show which element starts on a line (1-based) of the rendered document
    LineIndex { file: PathBuf, line: usize },
    /// Print repeated copies of the element at an index
    Snippet {
        file: PathBuf,
        index: usize,
        #[arg(short = 'n', long, default_value_t = 1)]
        copies: usize,
        /// Attribute to increment between copies (repeatable)
        #[arg(short, long)]
        increment: Vec<String>,
    },
}

fn open_session(cli: &Cli) -> Result<Session, XProfileError> {
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let profile = cli
        .profile
        .clone()
        .or_else(|| config.profile_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROFILE));
    Session::builder()
        .with_config(config)
        .with_profile_path(profile)
        .with_verbose(cli.verbose)
        .build()
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn run(cli: Cli) -> Result<(), XProfileError> {
    let mut session = open_session(&cli)?;
    match cli.command {
        Command::Import { files } => {
            for file in files {
                let summary = session.import_file(&file, |p| {
                    log::debug!("{}: {}/{} records", file.display(), p.written, p.total);
                })?;
                println!(
                    "{}: {} records for <{}>",
                    file.display(),
                    summary.records,
                    summary.root
                );
            }
        }
        Command::Roots => print_lines(&session.store().known_roots()?),
        Command::Elements { root } => print_lines(&session.store().known_elements(&root)?),
        Command::Children {
            root,
            element,
            parent,
        } => print_lines(&session.store().children(&element, &parent, &root)?),
        Command::Attributes {
            root,
            element,
            parent,
        } => print_lines(&session.store().attributes(&element, &parent, &root)?),
        Command::Values { element, attribute } => {
            print_lines(&session.store().attribute_values(&element, &attribute)?)
        }
        Command::RemoveRoot { root } => {
            let removed = session.remove_root(&root)?;
            println!("Removed <{}> ({} records)", root, removed);
        }
        Command::Tree { start } => {
            session.populate(start.as_deref())?;
            print!("{}", session.document_text()?);
        }
        Command::Outline { file } => {
            let tree = session.open_file(&file)?;
            print_lines(&tree.outline());
        }
        Command::LineIndex { file, line } => {
            let tree = session.open_file(&file)?;
            let text = tree.text();
            let found = line
                .checked_sub(1)
                .and_then(|l| LineMap::new(&text).line_to_index(l))
                .and_then(|index| tree.find_by_index(index).map(|id| (index, id)));
            match found {
                Some((index, id)) => {
                    let element = tree.node(id)?.element();
                    println!("{} {}", index, tree.document().element_path(element));
                }
                None => println!("Line {} does not start an element", line),
            }
        }
        Command::Snippet {
            file,
            index,
            copies,
            increment,
        } => {
            session.open_file(&file)?;
            let tree = session.tree_mut().ok_or(XProfileError::NoDocument)?;
            let base = tree.find_by_index(index).ok_or(xprofile::TreeError::InvalidIndex {
                index,
                len: tree.len(),
            })?;
            for attribute in &increment {
                for id in tree.descendants(base) {
                    tree.set_attribute_incremented(id, attribute, true)?;
                }
            }
            print!("{}", tree.generate_snippet(base, copies)?);
        }
    }
    Ok(())
}

fn main() -> Result<(), XProfileError> {
    env_logger::init();
    run(Cli::parse())
}
