use anyhow::{Context, Result};
use clap::Parser;
use graphdesk_app::{GraphSession, Settings};
use graphdesk_core::ElementId;
use graphdesk_graph::{GraphModel, NodeData};
use std::io::Read;
use std::path::PathBuf;

mod script;

use script::{Command, parse_script};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Graph file (JSON with `nodes` and `edges`)
    #[arg(short, long)]
    graph: PathBuf,

    /// Script of editing commands, one per line. Reads stdin when omitted.
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Settings file. Defaults to the platform config directory.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load(),
    };
    let model = GraphModel::load(&args.graph)?;

    let text = match &args.script {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let commands = parse_script(&text)?;

    let mut session = GraphSession::new(model, settings);
    for (line, cmd) in commands {
        run(&mut session, cmd).with_context(|| format!("line {}", line))?;
    }
    Ok(())
}

fn run(session: &mut GraphSession, cmd: Command) -> Result<()> {
    match cmd {
        Command::Move { node, to } => session.move_nodes(&[(node, to)])?,
        Command::Hide(ids) => print_ids("hidden", &session.hide(&ids)?),
        Command::Show(ids) => print_ids("shown", &session.show(&ids)?),
        Command::ShowAll => print_ids("shown", &session.show_all()?),
        Command::Remove(ids) => print_ids("removed", &session.remove(&ids)?),
        Command::AddNode {
            id,
            name,
            position,
            parent,
        } => {
            let mut node = NodeData::new(id, name, position);
            if let Some(parent) = parent {
                node = node.with_parent(parent);
            }
            session.add_node(node)?;
        }
        Command::Select(ids) => session.select(&ids)?,
        Command::Undo => {
            if !session.undo()? {
                println!("nothing to undo");
            }
        }
        Command::Redo => {
            if !session.redo()? {
                println!("nothing to redo");
            }
        }
        Command::Describe(id) => match session.describe(id) {
            Some(view) => print!("{}", view),
            None => println!("{} not found", id),
        },
        Command::Drag { nodes, pointer } => {
            session.begin_drag(&nodes)?;
            let update = session.drag_to(pointer)?;
            for guide in update.result.guidelines() {
                tracing::debug!("guideline {:?}", guide);
            }
            let outcome = session.end_drag()?;
            for (id, pos) in &outcome.moves {
                println!("{} -> ({}, {})", id, pos.x, pos.y);
            }
            if outcome.snapped {
                println!(
                    "snapped by ({}, {})",
                    outcome.correction.x, outcome.correction.y
                );
            }
        }
        Command::Dump(path) => {
            let json = serde_json::to_string_pretty(&session.model().to_file())?;
            match path {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{}", json),
            }
        }
    }
    Ok(())
}

fn print_ids(label: &str, ids: &[ElementId]) {
    let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
    println!("{}: {}", label, ids.join(", "));
}
