//! Raw commit-object text parsing for the command backend.
//!
//! `git rev-list --header` prints, for each commit, the hash on its own line
//! followed by the raw commit object (header lines, a blank line, then the
//! message verbatim), with a NUL byte terminating each block. This module
//! turns that loosely-structured text into [`CommitRecord`]s matching the
//! structured output the library backend produces natively.
//!
//! Parsing assumptions live entirely in this module; nothing outside it
//! knows the text format. The parity test suite cross-validates the result
//! against the library backend's revwalk on the same fixture repository.

use crate::backend::{CommitRecord, Oid};

/// Delimiter between commit blocks in `rev-list --header` output.
pub(crate) const BLOCK_DELIMITER: char = '\0';

/// Parse the full `rev-list --header` output into commit records,
/// preserving the newest-first order of the input.
///
/// Blocks that do not look like commit objects are skipped rather than
/// failing the whole listing; the header format is stable but this parser
/// is deliberately forgiving about lines it does not recognize.
pub(crate) fn parse_commit_blocks(raw: &str) -> Vec<CommitRecord> {
    raw.split(BLOCK_DELIMITER)
        .filter_map(parse_commit_block)
        .collect()
}

/// Parse one block: hash line, header section, blank line, message.
fn parse_commit_block(block: &str) -> Option<CommitRecord> {
    let block = block.strip_prefix('\n').unwrap_or(block);
    if block.trim().is_empty() {
        return None;
    }

    let (hash_line, object) = block.split_once('\n')?;
    let id = Oid::from_hex(hash_line).ok()?;

    // Header and message are separated by the first blank line. A commit
    // with an empty message has headers only.
    let (header, message) = match object.split_once("\n\n") {
        Some((header, message)) => (header, message),
        None => (object.trim_end_matches('\n'), ""),
    };

    let author_time_secs = header
        .lines()
        .find_map(|line| line.strip_prefix("author "))
        .and_then(parse_author_timestamp)?;

    Some(CommitRecord {
        id,
        message: message.to_string(),
        author_time_secs,
    })
}

/// Extract the Unix timestamp from an author header value:
/// `Name <email> 1700000000 +0100`. The timezone offset is skipped; the
/// timestamp is already in UTC seconds.
fn parse_author_timestamp(author: &str) -> Option<i64> {
    let mut fields = author.rsplit(' ');
    let _tz_offset = fields.next()?;
    fields.next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "\
2f5a1c9d8e7b6a5f4e3d2c1b0a9f8e7d6c5b4a39\n\
tree 9f8e7d6c5b4a392f5a1c9d8e7b6a5f4e3d2c1b0a\n\
parent 1b0a9f8e7d6c5b4a392f5a1c9d8e7b6a5f4e3d2c\n\
author Alice Doe <alice@example.com> 1700000200 +0100\n\
committer Alice Doe <alice@example.com> 1700000200 +0100\n\
\n\
Delete b.txt\n\
\x00\
1b0a9f8e7d6c5b4a392f5a1c9d8e7b6a5f4e3d2c\n\
tree 4e3d2c1b0a9f8e7d6c5b4a392f5a1c9d8e7b6a5f\n\
author Bob <bob@example.com> 1700000100 -0500\n\
committer Bob <bob@example.com> 1700000100 -0500\n\
\n\
Add b.txt\n\
\n\
With a body line.\n\
\x00";

    #[test]
    fn parses_blocks_newest_first() {
        let records = parse_commit_blocks(FIXTURE);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].id.as_str(),
            "2f5a1c9d8e7b6a5f4e3d2c1b0a9f8e7d6c5b4a39"
        );
        assert_eq!(records[0].message, "Delete b.txt\n");
        assert_eq!(records[0].author_time_secs, 1_700_000_200);
        assert_eq!(records[1].author_time_secs, 1_700_000_100);
    }

    #[test]
    fn message_body_is_verbatim() {
        let records = parse_commit_blocks(FIXTURE);
        assert_eq!(records[1].message, "Add b.txt\n\nWith a body line.\n");
    }

    #[test]
    fn timezone_offset_is_skipped_not_applied() {
        // -0500 offset must not shift the timestamp
        let records = parse_commit_blocks(FIXTURE);
        assert_eq!(records[1].author_time_secs, 1_700_000_100);
    }

    #[test]
    fn empty_output_yields_no_records() {
        assert!(parse_commit_blocks("").is_empty());
        assert!(parse_commit_blocks("\x00").is_empty());
    }

    #[test]
    fn author_names_with_spaces_parse() {
        assert_eq!(
            parse_author_timestamp("Mary Jane van der Berg <mj@example.com> 123456 +0000"),
            Some(123456)
        );
    }

    #[test]
    fn malformed_block_is_skipped() {
        let raw = "not-a-hash\ngarbage\x00";
        assert!(parse_commit_blocks(raw).is_empty());
    }

    #[test]
    fn commit_without_message_parses() {
        let raw = "\
2f5a1c9d8e7b6a5f4e3d2c1b0a9f8e7d6c5b4a39\n\
tree 9f8e7d6c5b4a392f5a1c9d8e7b6a5f4e3d2c1b0a\n\
author A <a@b.c> 42 +0000\n\
committer A <a@b.c> 42 +0000\n\x00";
        let records = parse_commit_blocks(raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "");
        assert_eq!(records[0].author_time_secs, 42);
    }
}
