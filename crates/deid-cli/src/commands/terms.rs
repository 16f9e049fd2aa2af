use anyhow::Result;
use deid_config::Config;
use deid_storage::{TermStore, parse_input_list};

use crate::cli::TermsCommands;

pub fn handle(cmd: TermsCommands, config: &Config) -> Result<()> {
    let store = TermStore::new(&config.terms.path);
    match cmd {
        TermsCommands::List => list(&store),
        TermsCommands::Add { terms } => add(&store, &terms),
        TermsCommands::Remove { term } => remove(&store, &term),
    }
}

fn list(store: &TermStore) -> Result<()> {
    let terms = store.load()?;
    if terms.is_empty() {
        println!("No terms in {}", store.path().display());
        return Ok(());
    }

    println!("Terms ({}):", store.path().display());
    for term in terms {
        println!("  {}", term);
    }
    Ok(())
}

fn add(store: &TermStore, input: &[String]) -> Result<()> {
    for term in input.iter().flat_map(|t| parse_input_list(t)) {
        if store.add(&term)? {
            println!("✓ Added: {}", term);
        } else {
            println!("  Already present: {}", term);
        }
    }
    Ok(())
}

fn remove(store: &TermStore, term: &str) -> Result<()> {
    if store.remove(term)? {
        println!("✓ Removed: {}", term);
    } else {
        println!("Term not found: {}", term);
    }
    Ok(())
}
