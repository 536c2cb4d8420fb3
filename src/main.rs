use std::fs::read_to_string;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use ks_translate::{Config, FsStorage, KagParser, Scenario, Translator};

/// Apply translation tables to a TyranoScript scenario and dump the
/// resulting node sequence.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Scenario file to translate, relative to the data root.
    scenario: PathBuf,
    /// Game data root, holding data/scenario and data/system.
    #[clap(long, default_value = ".")]
    data_dir: PathBuf,
    /// Override the language from the configuration file.
    #[clap(long)]
    lang: Option<String>,
    /// Override the wrap width in pixels. 0 disables wrapping.
    #[clap(long)]
    width: Option<u32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Cli::parse();

    let storage = FsStorage::new(&args.data_dir);
    let mut config = Config::load(&storage);
    if let Some(lang) = args.lang {
        config.current_language = lang;
    }
    if let Some(width) = args.width {
        config.width = width;
    }

    let Some(name) = args.scenario.file_name().and_then(|name| name.to_str()) else {
        bail!("scenario path has no file name: {}", args.scenario.display());
    };
    let path = args.data_dir.join(&args.scenario);
    let source = read_to_string(&path)
        .with_context(|| format!("cannot read scenario {}", path.display()))?;

    let mut scenario = Scenario::from_source(name, &source, &KagParser);
    let nodes_in = scenario.nodes.len();

    let mut translator = Translator::new(config, Box::new(storage), Box::new(KagParser));
    let changes = translator.translate_scenario(&mut scenario);

    for (index, node) in scenario.nodes.iter().enumerate() {
        println!("{index}\t{}\t{}", node.tag, node.val.escape_debug());
    }

    eprintln!(
        "{name}: {nodes_in} nodes in, {} out, {} splice(s)",
        scenario.nodes.len(),
        changes.len()
    );
    if let Some(missing) = translator.missing_strings(name) {
        for text in missing {
            eprintln!("untranslated: {text}");
        }
    }

    Ok(())
}
