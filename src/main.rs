//! Waygate
//!
//! Reads portal overlays from game screen captures and maintains a travel
//! graph of the discovered connections: push a capture through the OCR
//! pipeline, query shortest routes, and import/export the link set.

mod config;
mod error;
mod extract;
mod graph;
mod notify;
mod pipeline;
mod preprocess;
mod recognize;

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use std::sync::Arc;

use extract::Frame;
use graph::{Corpus, FileStore, LinkStore, PathResult};
use notify::LogNotifier;
use pipeline::Coordinator;
use recognize::TesseractRecognizer;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    config::init_config();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "process" => {
            let [path, mx, my] = &args[1..] else {
                bail!("usage: process <capture.png> <cursor_x> <cursor_y>");
            };
            let cursor = (
                mx.parse().context("cursor_x must be an integer")?,
                my.parse().context("cursor_y must be an integer")?,
            );
            run_process(Path::new(path), cursor)
        }
        "path" => {
            let [from, to] = &args[1..] else {
                bail!("usage: path <from_id> <to_id>");
            };
            run_path(from, to)
        }
        "export" => {
            let store = open_store()?;
            println!("{}", store.export());
            Ok(())
        }
        "import" => {
            let [blob] = &args[1..] else {
                bail!("usage: import <blob>");
            };
            let store = open_store()?;
            let outcome = store.import(blob)?;
            log::info!("Import finished: {:?}", outcome);
            Ok(())
        }
        "flush" => {
            let store = open_store()?;
            store.flush();
            log::info!("All discovered links removed");
            Ok(())
        }
        other => {
            print_usage();
            Err(anyhow!("unknown command: {}", other))
        }
    }
}

fn print_usage() {
    eprintln!("usage: waygate <command>");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  process <capture.png> <cursor_x> <cursor_y>   read a portal overlay");
    eprintln!("  path <from_id> <to_id>                        shortest route");
    eprintln!("  export                                        print the link set as a blob");
    eprintln!("  import <blob>                                 merge a previously exported blob");
    eprintln!("  flush                                         drop all discovered links");
}

fn open_store() -> Result<LinkStore> {
    let config = config::get_config();
    let corpus = Corpus::from_file(Path::new(&config.corpus_path))?;
    let persist = Arc::new(FileStore::new(&config.store_path));
    LinkStore::with_persistence(corpus, Arc::new(LogNotifier), persist)
}

/// Runs one capture file through the full pipeline and records the result.
fn run_process(path: &Path, cursor: (u32, u32)) -> Result<()> {
    let config = config::get_config();
    let image = image::open(path)
        .with_context(|| format!("Failed to open capture: {}", path.display()))?
        .to_rgba8();

    let store = Arc::new(open_store()?);
    let recognizer = Arc::new(TesseractRecognizer::new(
        config.ocr_command.clone(),
        config.tessdata_dir.clone(),
    ));
    let coordinator = Coordinator::spawn(
        store.clone(),
        recognizer,
        Arc::new(LogNotifier),
        config.match_threshold,
    );

    coordinator.on_capture(Frame::new(image, cursor))?;
    coordinator.finish();
    Ok(())
}

fn run_path(from: &str, to: &str) -> Result<()> {
    let store = open_store()?;
    let corpus = store.corpus();
    for id in [from, to] {
        if !corpus.contains(id) {
            bail!("unknown location: {}", id);
        }
    }

    let name = |id: &str| corpus.display_name(id).unwrap_or(id).to_string();
    let result = store.find_shortest_path(from, to);
    match &result {
        PathResult::Unreachable => {
            println!("No route from {} to {}", name(from), name(to));
        }
        PathResult::Route(links) if links.is_empty() => {
            println!("Already there");
        }
        PathResult::Route(links) => {
            for link in links {
                println!("{} > {}", name(&link.source), name(&link.target));
            }
            if let Some(at) = result.expires_at() {
                println!("Route valid until {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
    }
    Ok(())
}
