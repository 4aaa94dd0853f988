//! Database command handlers

use std::io::{self, IsTerminal, Write};

use anyhow::{bail, Context, Result};

use libcat_core::schema::catalog_entities;
use libcat_core::{compile_schema, Dialect, Library};

use crate::output::Output;

/// Drop and recreate every catalog table
pub fn reset(library: &Library, yes: bool, output: &Output) -> Result<()> {
    if !yes && (!output.should_prompt() || !confirm("Delete every book, card and loan?")?) {
        bail!("Reset cancelled; pass --yes to confirm");
    }

    let result = library.reset_database();
    output.finish(&result, |out, _| out.success("Catalog reset"))
}

/// Print the compiled table definitions
pub fn schema(dialect: Dialect, output: &Output) -> Result<()> {
    let statements =
        compile_schema(&catalog_entities(), dialect).context("Failed to compile schema")?;

    if output.is_json() {
        println!("{}", serde_json::to_string_pretty(&statements)?);
    } else {
        for statement in &statements {
            println!("{};", statement);
        }
    }
    Ok(())
}

/// Prompt for confirmation; non-interactive stdin never confirms
fn confirm(prompt: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
