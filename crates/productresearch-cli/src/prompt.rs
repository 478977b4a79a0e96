use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};

const PROMPT: &str = "\nEnter product to research (e.g., 'iPhone 15 Pro Max'): ";
const EMPTY_QUERY: &str = "Query cannot be empty. Please try again.";

/// Ask for a product name until a non-blank line is entered.
pub fn read_query<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<String> {
    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("failed to read query from stdin")?;
        if read == 0 {
            bail!("input closed before a query was entered");
        }

        let query = line.trim();
        if !query.is_empty() {
            return Ok(query.to_string());
        }
        writeln!(output, "{EMPTY_QUERY}")?;
    }
}
