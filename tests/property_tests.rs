//! Property-based tests for parsers and core types.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use proptest::prelude::*;

use strata::core::types::{ObjectFormat, Oid};
use strata::engine::parse::parse_left_right;
use strata::engine::LogParser;

/// Strategy for full-length lowercase hex ids of `format`.
fn hex_id(format: ObjectFormat) -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![prop::char::range('0', '9'), prop::char::range('a', 'f')],
        format.hex_len(),
    )
    .prop_map(|chars| chars.into_iter().collect())
}

/// Graph-only rows as drawn by `log --graph`.
fn graph_row() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["|", "|\\", "|/", "| |", "|/|", "| |\\", "|\\ \\"])
        .prop_map(String::from)
}

proptest! {
    #[test]
    fn divergence_partitions_without_overlap(
        sides in prop::collection::vec((any::<bool>(), hex_id(ObjectFormat::Sha1)), 0..40)
    ) {
        // Ids in one listing are distinct.
        let mut seen = std::collections::HashSet::new();
        let sides: Vec<_> = sides.into_iter().filter(|(_, id)| seen.insert(id.clone())).collect();

        let listing: String = sides
            .iter()
            .map(|(left, id)| format!("{}{id}\n", if *left { '<' } else { '>' }))
            .collect();
        let (ahead, behind) = parse_left_right(&listing, ObjectFormat::Sha1).unwrap();

        let expected_ahead: Vec<&str> =
            sides.iter().filter(|(l, _)| *l).map(|(_, id)| id.as_str()).collect();
        let expected_behind: Vec<&str> =
            sides.iter().filter(|(l, _)| !*l).map(|(_, id)| id.as_str()).collect();

        prop_assert_eq!(ahead.iter().map(Oid::as_str).collect::<Vec<_>>(), expected_ahead);
        prop_assert_eq!(behind.iter().map(Oid::as_str).collect::<Vec<_>>(), expected_behind);
        prop_assert!(ahead.iter().all(|a| !behind.contains(a)));
    }

    #[test]
    fn log_continuations_attach_to_preceding_entry(
        commits in prop::collection::vec(
            (hex_id(ObjectFormat::Sha1), "[A-Za-z][A-Za-z ]{0,20}", prop::collection::vec(graph_row(), 0..4)),
            1..20,
        )
    ) {
        let mut out = String::new();
        for (id, subject, rows) in &commits {
            out.push_str(&format!("* {id} [Ada] [1700000000]{subject}\n"));
            for row in rows {
                out.push_str(row);
                out.push('\n');
            }
        }

        let entries = LogParser::new(ObjectFormat::Sha1).parse(&out);
        prop_assert_eq!(entries.len(), commits.len());
        for (entry, (id, subject, rows)) in entries.iter().zip(&commits) {
            prop_assert_eq!(entry.commit.as_str(), id.as_str());
            prop_assert_eq!(&entry.subject, subject);
            prop_assert_eq!(entry.graph.len(), rows.len() + 1);
            prop_assert_eq!(&entry.graph[0], "* ");
            prop_assert_eq!(&entry.graph[1..], rows.as_slice());
        }
    }

    #[test]
    fn oid_accepts_exact_length_only(id in hex_id(ObjectFormat::Sha256), cut in 1usize..64) {
        prop_assert!(Oid::parse(&id, ObjectFormat::Sha256).is_ok());
        prop_assert!(Oid::parse(&id[..40], ObjectFormat::Sha1).is_ok());
        prop_assert!(Oid::parse(&id, ObjectFormat::Sha1).is_err());
        if cut != 40 {
            prop_assert!(Oid::parse(&id[..cut], ObjectFormat::Sha1).is_err());
        }
        prop_assert!(Oid::parse(&id[..cut], ObjectFormat::Sha256).is_err());
    }

    #[test]
    fn oid_rejects_non_hex(id in hex_id(ObjectFormat::Sha1), at in 0usize..40, bad in "[g-zG-Z]") {
        let mut broken = id.clone();
        broken.replace_range(at..at + 1, &bad);
        prop_assert!(Oid::parse(&broken, ObjectFormat::Sha1).is_err());
    }
}
