mod script;

use std::fs::File;
use std::io::{self, BufReader, Write};

use anyhow::{Context, bail};
use serde_json::json;

use crease_infra::{InMemoryBallStore, InMemoryMatchStore, ScoringConfig, ScoringService};

use crate::script::ScriptRunner;

const USAGE: &str = "usage: crease replay [SCRIPT.jsonl]   (reads stdin when no script is given)";

fn main() -> anyhow::Result<()> {
    let config = ScoringConfig::from_env().context("reading configuration")?;
    crease_observability::init(config.log_format);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let path = match args.as_slice() {
        [cmd] if cmd == "replay" => None,
        [cmd, path] if cmd == "replay" => Some(path.clone()),
        _ => bail!(USAGE),
    };

    tracing::info!(
        script = path.as_deref().unwrap_or("<stdin>"),
        verify_ledger = config.verify_ledger,
        "replaying scoring script"
    );

    let service = ScoringService::new(InMemoryMatchStore::new(), InMemoryBallStore::new(), &config);
    let mut runner = ScriptRunner::new(service);
    match &path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {path}"))?;
            runner.run(BufReader::new(file))?;
        }
        None => {
            runner.run(io::stdin().lock())?;
        }
    }

    let matches = runner.details()?;
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &json!({ "matches": matches }))
        .context("writing match details")?;
    writeln!(out)?;
    Ok(())
}
