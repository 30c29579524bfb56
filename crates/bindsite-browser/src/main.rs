mod client;
mod session;
#[cfg(test)]
mod test_server;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bindsite_common::alphafold::{AlphaFoldClient, AlphaFoldConfig, DEFAULT_ALPHAFOLD_URL};
use bindsite_common::color::{atom_confidences, confidence_color};
use bindsite_common::identifier::Identifier;
use bindsite_common::model::SearchHit;

use client::{BackendClient, BackendConfig, DEFAULT_BACKEND_URL};
use session::{Session, StructureVariant};

const TOP_RESIDUES: usize = 10;

#[derive(Parser)]
#[command(name = "bindsite-browser")]
#[command(about = "Search predicted binding-site structures and fetch their files", long_about = None)]
struct Cli {
    /// Base URL of the structure service
    #[arg(long, env = "BINDSITE_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend: String,

    /// Base URL of the AlphaFold prediction API
    #[arg(long, env = "ALPHAFOLD_API_URL", default_value = DEFAULT_ALPHAFOLD_URL)]
    alphafold: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "BINDSITE_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fuzzy search over structure descriptions
    Search {
        query: String,

        #[arg(long)]
        page: Option<usize>,

        #[arg(long)]
        limit: Option<usize>,

        /// Open the N-th result (1-based) as `show` would
        #[arg(long, value_name = "N")]
        pick: Option<usize>,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Fetch metadata, residue annotations and structure for one identifier
    Show {
        id: Identifier,

        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(clap::Args)]
struct ViewArgs {
    /// Show the raw structure instead of the processed one
    #[arg(long, default_value_t = false)]
    vanilla: bool,

    /// Save the structure text to this file
    #[arg(long, value_name = "FILE")]
    download: Option<PathBuf>,

    /// Write a per-atom confidence colour table (TSV) to this file
    #[arg(long, value_name = "FILE")]
    colors: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout_secs);
    let backend = BackendClient::new(BackendConfig::new(&cli.backend, timeout))?;
    let alphafold = AlphaFoldClient::new(AlphaFoldConfig::new(&cli.alphafold, timeout))?;
    info!(backend = %cli.backend, alphafold = %alphafold.config().base_url, "clients configured");

    let mut session = Session::new();
    match cli.command {
        Command::Search {
            query,
            page,
            limit,
            pick,
            view,
        } => {
            session.set_query(&query);
            let result = backend.search(session.query(), page, limit).await;
            session.apply_search(result);
            if let Some(err) = session.error() {
                anyhow::bail!("search failed: {err}");
            }
            print_results(&session);

            if let Some(n) = pick {
                let hit = pick_hit(session.results(), n)
                    .with_context(|| format!("no result number {n} on this page"))?;
                let id = Identifier::parse(&hit.pdb_id)?;
                println!();
                show(&mut session, &backend, &alphafold, id, &view).await?;
            }
        }
        Command::Show { id, view } => {
            show(&mut session, &backend, &alphafold, id, &view).await?;
        }
    }
    Ok(())
}

async fn show(
    session: &mut Session,
    backend: &BackendClient,
    alphafold: &AlphaFoldClient,
    id: Identifier,
    view: &ViewArgs,
) -> anyhow::Result<()> {
    let variant = if view.vanilla {
        StructureVariant::Raw
    } else {
        StructureVariant::Processed
    };
    session.set_variant(variant);
    let ticket = session.select(id.clone());

    let (metadata, annotations, structure) = tokio::join!(
        alphafold.prediction(&id),
        backend.annotations(&id),
        backend.structure(&id, session.variant().kind()),
    );
    session.apply_metadata(ticket, metadata);
    session.apply_annotations(ticket, annotations);
    session.apply_structure(ticket, structure);

    print_selection(session);

    if let Some(text) = session.structure() {
        if let Some(path) = &view.download {
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("saved structure to {}", path.display());
        }
        if let Some(path) = &view.colors {
            write_color_table(path, text)?;
            println!("wrote colour table to {}", path.display());
        }
    }

    if let Some(err) = session.error() {
        anyhow::bail!("{err}");
    }
    Ok(())
}

/// The `n`-th hit, counting from 1.
fn pick_hit(results: &[SearchHit], n: usize) -> Option<&SearchHit> {
    n.checked_sub(1).and_then(|i| results.get(i))
}

fn print_results(session: &Session) {
    println!(
        "{} result(s) for {:?} ({} total)",
        session.results().len(),
        session.query(),
        session.total()
    );
    for (i, hit) in session.results().iter().enumerate() {
        println!("{:>3}. {:<12} {}", i + 1, hit.pdb_id, hit.description);
    }
}

fn print_selection(session: &Session) {
    let Some(id) = session.selected() else {
        return;
    };
    println!("PDB ID: {id}");

    if let Some(meta) = session.metadata() {
        println!("Entry: {}", meta.entry_id);
        println!(
            "Title: {}",
            meta.uniprot_description.as_deref().unwrap_or("No title available")
        );
        if let Some(gene) = &meta.gene {
            println!("Gene: {gene}");
        }
        if let Some(organism) = &meta.organism_scientific_name {
            println!("Organism: {organism}");
        }
    }

    let top = session.top_residues(TOP_RESIDUES);
    if !top.is_empty() {
        println!("Top binding residues:");
        for r in top {
            println!("  {:>5} {:<4} {:>6.2}", r.resid, r.restype, r.pbind);
        }
    }

    if let Some(text) = session.structure() {
        let atoms = atom_confidences(text);
        let mean = if atoms.is_empty() {
            0.0
        } else {
            atoms.iter().map(|a| a.value).sum::<f64>() / atoms.len() as f64
        };
        println!(
            "Structure ({:?}): {} atoms, mean confidence {:.2}",
            session.variant(),
            atoms.len(),
            mean
        );
    }

    if session.is_loading() {
        println!("(some requests did not complete)");
    }
}

const COLOR_TABLE_HEADER: &str = "serial\tname\tres_name\tchain\tres_seq\tvalue\tcolor\n";

/// One TSV row per atom with its confidence and the colour the viewer would use.
fn color_table(pdb: &str) -> String {
    let mut out = String::from(COLOR_TABLE_HEADER);
    for atom in atom_confidences(pdb) {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{:.2}\t{}\n",
            atom.serial,
            atom.name,
            atom.res_name,
            atom.chain,
            atom.res_seq,
            atom.value,
            confidence_color(atom.value)
        ));
    }
    out
}

fn write_color_table(path: &Path, pdb: &str) -> anyhow::Result<()> {
    std::fs::write(path, color_table(pdb))
        .with_context(|| format!("failed to write {}", path.display()))
}
