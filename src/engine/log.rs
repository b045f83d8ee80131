//! engine::log
//!
//! Parser for one-line-per-commit log output with an optional ASCII graph.
//!
//! # Grammar
//!
//! Each commit line is:
//!
//! ```text
//! [graph] <full id> [" (" decorations ")"] [" [" author "] [" unix-seconds "]"] subject
//! ```
//!
//! The author ends at the first `] [` followed by a timestamp, so names
//! such as `dependabot[bot]` keep their brackets.
//!
//! produced by [`crate::git::commands::LOG_FORMAT`]. The graph prefix uses
//! only `/ | \ - _ * . o` and spaces. Lines without a full-length id (pure
//! graph rows such as `|\` or `| |`) belong to the commit above them and
//! are appended to its graph segments in order.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::core::model::LogEntry;
use crate::core::types::{ObjectFormat, Oid, UtcTimestamp};

fn record_regex(hex_len: usize) -> Regex {
    let pattern = format!(
        r"^(?P<graph>[/|\\\-_* .o]*?)(?P<id>[0-9a-f]{{{hex_len}}})(?: \((?P<refs>[^)]*)\))?(?: \[(?P<author>.*?)\] \[(?P<time>-?\d+)\])?(?P<subject>.*)$"
    );
    Regex::new(&pattern).unwrap()
}

static SHA1_RECORD: LazyLock<Regex> =
    LazyLock::new(|| record_regex(ObjectFormat::Sha1.hex_len()));
static SHA256_RECORD: LazyLock<Regex> =
    LazyLock::new(|| record_regex(ObjectFormat::Sha256.hex_len()));

/// Log parser for one object format.
#[derive(Debug, Clone, Copy)]
pub struct LogParser {
    format: ObjectFormat,
}

impl LogParser {
    pub fn new(format: ObjectFormat) -> Self {
        Self { format }
    }

    fn record(&self) -> &'static Regex {
        match self.format {
            ObjectFormat::Sha1 => &SHA1_RECORD,
            ObjectFormat::Sha256 => &SHA256_RECORD,
        }
    }

    /// Parse log output. Index 0 is the newest commit.
    pub fn parse(&self, out: &str) -> Vec<LogEntry> {
        let mut entries: Vec<LogEntry> = Vec::new();

        for line in out.lines() {
            match self.parse_record(line) {
                Some(entry) => entries.push(entry),
                None => match entries.last_mut() {
                    Some(previous) => previous.graph.push(line.to_string()),
                    None => trace!(line = %line, "dropping log line before first commit"),
                },
            }
        }
        entries
    }

    fn parse_record(&self, line: &str) -> Option<LogEntry> {
        let caps = self.record().captures(line)?;
        let commit = Oid::parse(&caps["id"], self.format).ok()?;

        // A longer hex run means this is not a full id of our format.
        let end = caps.name("id")?.end();
        if line[end..].starts_with(|c: char| c.is_ascii_hexdigit()) {
            return None;
        }

        let graph = &caps["graph"];
        let refs = caps
            .name("refs")
            .map(|m| {
                m.as_str()
                    .split(", ")
                    .filter(|r| !r.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let time = caps
            .name("time")
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .and_then(UtcTimestamp::from_unix_seconds);

        Some(LogEntry {
            commit,
            refs,
            author: caps
                .name("author")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            time,
            subject: caps["subject"].to_string(),
            graph: if graph.is_empty() {
                Vec::new()
            } else {
                vec![graph.to_string()]
            },
        })
    }
}

/// Parse log output with [`LogParser`].
pub fn parse_log(out: &str, format: ObjectFormat) -> Vec<LogEntry> {
    LogParser::new(format).parse(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(c: char) -> String {
        c.to_string().repeat(40)
    }

    #[test]
    fn plain_lines() {
        let out = format!(
            "{} (HEAD -> main, origin/main, tag: v1.0) [Ada] [1700000000]Second\n{} [Bob] [1690000000]First\n",
            id('a'),
            id('b')
        );
        let entries = parse_log(&out, ObjectFormat::Sha1);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].commit.as_str(), id('a'));
        assert_eq!(entries[0].refs, ["HEAD -> main", "origin/main", "tag: v1.0"]);
        assert_eq!(entries[0].author, "Ada");
        assert_eq!(entries[0].time.map(|t| t.unix_seconds()), Some(1_700_000_000));
        assert_eq!(entries[0].subject, "Second");
        assert!(entries[0].graph.is_empty());
        assert!(entries[1].refs.is_empty());
        assert_eq!(entries[1].subject, "First");
    }

    #[test]
    fn graph_continuations_attach_to_previous() {
        let out = format!(
            "*   {} [A] [1]Merge\n|\\  \n| * {} [B] [2]Side\n|/  \n* {} [C] [3]Base\n",
            id('a'),
            id('b'),
            id('c')
        );
        let entries = parse_log(&out, ObjectFormat::Sha1);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].graph, ["*   ", "|\\  "]);
        assert_eq!(entries[1].graph, ["| * ", "|/  "]);
        assert_eq!(entries[2].graph, ["* "]);
        assert_eq!(entries[1].subject, "Side");
    }

    #[test]
    fn leading_graph_rows_are_dropped() {
        let out = format!("| \n* {} [A] [1]Only\n", id('a'));
        let entries = parse_log(&out, ObjectFormat::Sha1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].graph, ["* "]);
    }

    #[test]
    fn short_ids_are_not_commits() {
        let out = format!("{} [A] [1]Real\nabc1234 not a commit line\n", id('a'));
        let entries = parse_log(&out, ObjectFormat::Sha1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].graph, ["abc1234 not a commit line"]);
    }

    #[test]
    fn sha256_ids_need_full_length() {
        let long = "e".repeat(64);
        let out = format!("{long} [A] [1]Wide\n{} [B] [2]Narrow\n", id('a'));

        let entries = parse_log(&out, ObjectFormat::Sha256);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].commit.as_str(), long);

        // A 64-char id is not a SHA-1 commit line either.
        let entries = parse_log(&out, ObjectFormat::Sha1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].subject, "Narrow");
    }

    #[test]
    fn tolerates_missing_author_and_time() {
        let out = format!("{} plain subject\n", id('a'));
        let entries = parse_log(&out, ObjectFormat::Sha1);
        assert_eq!(entries[0].author, "");
        assert!(entries[0].time.is_none());
        assert_eq!(entries[0].subject, " plain subject");
    }

    #[test]
    fn bracketed_author_names() {
        let out = format!(
            "{} (origin/deps) [dependabot[bot]] [1700000000]Bump serde [skip ci]\n",
            id('a')
        );
        let entries = parse_log(&out, ObjectFormat::Sha1);

        assert_eq!(entries[0].author, "dependabot[bot]");
        assert_eq!(entries[0].time.map(|t| t.unix_seconds()), Some(1_700_000_000));
        assert_eq!(entries[0].subject, "Bump serde [skip ci]");
        assert_eq!(entries[0].refs, ["origin/deps"]);
    }

    #[test]
    fn empty_output() {
        assert!(parse_log("", ObjectFormat::Sha1).is_empty());
    }
}
