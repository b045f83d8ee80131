//! log command - Show parsed history

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::model::LogEntry;
use crate::engine::LogParser;
use crate::git::commands::{self, LogArgs};
use crate::git::GitRunner;

/// List history through the log parser.
pub async fn log(
    ctx: &Context,
    limit: Option<usize>,
    graph: bool,
    no_decorate: bool,
    revisions: Vec<String>,
) -> Result<()> {
    let session = super::open(ctx)?;
    let args = commands::log(&LogArgs {
        limit: limit.unwrap_or_else(|| session.config.log_limit()),
        graph,
        decorate: !no_decorate,
        revisions,
    });
    let out = session
        .runner
        .output(&args)
        .await
        .context("Failed to list history")?;

    let entries = LogParser::new(session.info.object_format).parse(&out);
    print!("{}", render(&entries, session.config.abbrev_len()));
    Ok(())
}

/// One line per commit, followed by its graph-only rows.
pub(crate) fn render(entries: &[LogEntry], abbrev: usize) -> String {
    let mut out = String::new();
    for entry in entries {
        // With a graph every commit line has a non-empty prefix.
        let mut rows = entry.graph.iter();
        if let Some(prefix) = rows.next() {
            out.push_str(prefix);
        }
        out.push_str(entry.commit.short(abbrev));
        if !entry.refs.is_empty() {
            out.push_str(&format!(" ({})", entry.refs.join(", ")));
        }
        out.push(' ');
        out.push_str(&entry.subject);
        if !entry.author.is_empty() {
            out.push_str(&format!(" [{}]", entry.author));
        }
        out.push('\n');
        for row in rows {
            out.push_str(row);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ObjectFormat;

    #[test]
    fn graph_rows_follow_their_commit() {
        let a = "a".repeat(40);
        let b = "b".repeat(40);
        let out = format!(
            "* {a} (HEAD -> main) [Ada] [1700000000]Merge topic\n|\\\n| * {b} [Bob] [1700000000]Topic work\n|/\n"
        );
        let entries = LogParser::new(ObjectFormat::Sha1).parse(&out);

        assert_eq!(
            render(&entries, 7),
            "* aaaaaaa (HEAD -> main) Merge topic [Ada]\n|\\\n| * bbbbbbb Topic work [Bob]\n|/\n"
        );
    }

    #[test]
    fn plain_history() {
        let a = "a".repeat(40);
        let entries = LogParser::new(ObjectFormat::Sha1).parse(&format!("{a}Subject\n"));
        assert_eq!(render(&entries, 4), "aaaa Subject\n");
    }
}
