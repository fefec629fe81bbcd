//! Causal command log and cascading undo.
//!
//! Every successfully applied mutating command is recorded with its
//! operands in home-relative form and a strictly increasing logical
//! timestamp. `ls` is recorded too, but only so later commands can be
//! checked against it for dependency; it never produces a compensation.
//!
//! Deleting an entry cascades: every later entry that could not have
//! happened without it is removed as well, and each removed mutator
//! contributes a compensating command. Compensations are handed back in
//! ascending temporal order so a LIFO drain replays them newest-first,
//! unwinding the filesystem to its state before the deleted entry ran.

use std::fmt;

/// Opcode of a logged command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Mkdir,
    Remove,
    Move,
    Rename,
    List,
}

impl OpKind {
    /// Wire opcode for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mkdir => "mkdir",
            Self::Remove => "rm",
            Self::Move => "mv",
            Self::Rename => "rn",
            Self::List => "ls",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One committed command. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Logical timestamp; strictly increasing per session, ties impossible.
    pub seq: u64,
    /// The operation that was applied.
    pub op: OpKind,
    /// Operands as home-relative resolved paths (empty for a bare `ls`).
    pub operands: Vec<String>,
}

impl LogEntry {
    /// The command line this entry records, e.g. `mkdir a/b`.
    pub fn command_line(&self) -> String {
        if self.operands.is_empty() {
            self.op.to_string()
        } else {
            format!("{} {}", self.op, self.operands.join(" "))
        }
    }

    /// Does this (later) entry causally depend on `earlier`?
    ///
    /// Always false when this entry precedes `earlier` in logical time.
    /// Otherwise the opcode pair selects a rule over the operands, with
    /// path containment meaning literal segment-ancestor-or-equal: no
    /// pattern matching is ever built from operand text.
    pub fn depends_on(&self, earlier: &LogEntry) -> bool {
        if self.seq < earlier.seq {
            return false;
        }
        use OpKind::*;
        let b = &earlier.operands;
        let a = &self.operands;
        match (earlier.op, self.op) {
            (Mkdir, Mkdir) | (Mkdir, Remove) => covers(&b[0], &a[0]),
            (Mkdir, Move) => covers(&b[0], &a[0]) || covers(&b[0], &a[1]),
            (Mkdir, Rename) => b[0] == a[0],
            (Mkdir, List) => !a.is_empty() && covers(&b[0], &a[0]),

            (Remove, Mkdir) => covers(&b[0], &a[0]),
            (Remove, Move) | (Remove, Rename) => b[0] == a[0],
            (Remove, Remove) | (Remove, List) => false,

            (Move, Mkdir) => a[0] == b[0],
            (Move, Remove) => covers(&b[1], &a[0]),
            (Move, Move) => covers(&b[1], &a[0]) || covers(&b[0], &a[1]),
            (Move, Rename) => covers(&b[1], &a[0]) || b[0] == a[1],
            (Move, List) => !a.is_empty() && covers(&b[1], &a[0]),

            (Rename, Mkdir) => a[0] == b[0] || covers(&b[1], &a[0]),
            (Rename, Remove) => covers(&b[1], &a[0]),
            (Rename, Move) => covers(&b[1], &a[0]) || b[0] == a[1],
            (Rename, Rename) => covers(&b[1], &a[0]) || b[0] == a[0],
            (Rename, List) => !a.is_empty() && covers(&b[1], &a[0]),

            // Nothing depends causally on a plain listing.
            (List, _) => false,
        }
    }

    /// The compensating command that undoes this entry, if any.
    pub fn compensation(&self) -> Option<String> {
        match self.op {
            OpKind::Mkdir => Some(format!("rm {}", self.operands[0])),
            OpKind::Remove => Some(format!("mkdir {}", self.operands[0])),
            OpKind::Move => Some(format!("mv {} {}", self.operands[1], self.operands[0])),
            OpKind::Rename => Some(format!("rn {} {}", self.operands[1], self.operands[0])),
            OpKind::List => None,
        }
    }
}

/// Is `ancestor` the same path as `path`, or a segment-wise ancestor of it?
///
/// `a` covers `a` and `a/b`, but not `ab`: comparison is per segment,
/// never per byte prefix.
fn covers(ancestor: &str, path: &str) -> bool {
    if ancestor == path {
        return true;
    }
    path.len() > ancestor.len()
        && path.as_bytes()[ancestor.len()] == b'/'
        && path.starts_with(ancestor)
}

/// Per-session ordered command log.
#[derive(Debug, Default)]
pub struct CommandLog {
    entries: Vec<LogEntry>,
    next_seq: u64,
}

impl CommandLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed command with the next logical timestamp.
    pub fn record(&mut self, op: OpKind, operands: Vec<String>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(LogEntry { seq, op, operands });
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove the entry at `index` and everything causally dependent on it.
    ///
    /// Worklist-driven: each removed entry becomes a trigger whose
    /// dependents are found by one strictly forward scan over what remains;
    /// newly removed entries join the worklist until it drains. Returns the
    /// compensating commands in ascending temporal order (push them onto a
    /// LIFO undo stack and pop to replay newest-first), or `None` when
    /// `index` is out of range.
    pub fn cascade_delete(&mut self, index: usize) -> Option<Vec<String>> {
        if index >= self.entries.len() {
            return None;
        }
        let mut removed = vec![self.entries.remove(index)];
        let mut cursor = 0;
        while cursor < removed.len() {
            let trigger = removed[cursor].clone();
            let mut i = 0;
            while i < self.entries.len() {
                if self.entries[i].seq > trigger.seq && self.entries[i].depends_on(&trigger) {
                    removed.push(self.entries.remove(i));
                } else {
                    i += 1;
                }
            }
            cursor += 1;
        }
        removed.sort_by_key(|entry| entry.seq);
        Some(removed.iter().filter_map(|entry| entry.compensation()).collect())
    }

    /// Render the numbered log listing sent during the `log` sub-protocol.
    pub fn render(&self, name: &str) -> Vec<String> {
        let mut lines = vec!["Logs:-".to_string()];
        for (i, entry) in self.entries.iter().enumerate() {
            lines.push(format!(
                "{:3}. {} [{}]: {}",
                i,
                name,
                entry.seq,
                entry.command_line()
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(seq: u64, op: OpKind, operands: &[&str]) -> LogEntry {
        LogEntry {
            seq,
            op,
            operands: operands.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_seq_strictly_increasing() {
        let mut log = CommandLog::new();
        log.record(OpKind::Mkdir, vec!["a".into()]);
        log.record(OpKind::Mkdir, vec!["b".into()]);
        log.record(OpKind::Remove, vec!["a".into()]);
        let seqs: Vec<u64> = log.entries().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_temporal_order_gates_dependency() {
        let older = entry(0, OpKind::Mkdir, &["a"]);
        let newer = entry(1, OpKind::Mkdir, &["a/b"]);
        assert!(newer.depends_on(&older));
        // An earlier entry can never depend on a later one, rule or no rule.
        assert!(!older.depends_on(&newer));
    }

    #[test]
    fn test_covers_is_segment_wise() {
        assert!(covers("a", "a"));
        assert!(covers("a", "a/b"));
        assert!(covers("a/b", "a/b/c"));
        assert!(!covers("a", "ab"));
        assert!(!covers("a/b", "a/bc"));
        assert!(!covers("a/b", "a"));
    }

    #[test]
    fn test_mkdir_rules() {
        let b = entry(0, OpKind::Mkdir, &["a"]);
        assert!(entry(1, OpKind::Mkdir, &["a/b"]).depends_on(&b));
        assert!(entry(1, OpKind::Remove, &["a"]).depends_on(&b));
        assert!(entry(1, OpKind::Move, &["a/b", "c"]).depends_on(&b));
        assert!(entry(1, OpKind::Move, &["c", "a/b"]).depends_on(&b));
        assert!(entry(1, OpKind::Rename, &["a", "z"]).depends_on(&b));
        assert!(!entry(1, OpKind::Rename, &["a/b", "z"]).depends_on(&b));
        assert!(entry(1, OpKind::List, &["a/b"]).depends_on(&b));
        assert!(!entry(1, OpKind::List, &[]).depends_on(&b));
    }

    #[test]
    fn test_remove_rules() {
        let b = entry(0, OpKind::Remove, &["a"]);
        assert!(entry(1, OpKind::Mkdir, &["a/b"]).depends_on(&b));
        assert!(!entry(1, OpKind::Remove, &["a"]).depends_on(&b));
        assert!(entry(1, OpKind::Move, &["a", "c"]).depends_on(&b));
        assert!(entry(1, OpKind::Rename, &["a", "c"]).depends_on(&b));
        assert!(!entry(1, OpKind::List, &["a"]).depends_on(&b));
    }

    #[test]
    fn test_move_rules() {
        let b = entry(0, OpKind::Move, &["s", "d"]);
        assert!(entry(1, OpKind::Mkdir, &["s"]).depends_on(&b));
        assert!(!entry(1, OpKind::Mkdir, &["s/x"]).depends_on(&b));
        assert!(entry(1, OpKind::Remove, &["d/x"]).depends_on(&b));
        assert!(entry(1, OpKind::Move, &["d/x", "q"]).depends_on(&b));
        assert!(entry(1, OpKind::Move, &["q", "s/x"]).depends_on(&b));
        assert!(entry(1, OpKind::Rename, &["d", "q"]).depends_on(&b));
        assert!(entry(1, OpKind::Rename, &["q", "s"]).depends_on(&b));
        assert!(entry(1, OpKind::List, &["d/x"]).depends_on(&b));
    }

    #[test]
    fn test_rename_rules() {
        let b = entry(0, OpKind::Rename, &["s", "d"]);
        assert!(entry(1, OpKind::Mkdir, &["s"]).depends_on(&b));
        assert!(entry(1, OpKind::Mkdir, &["d/x"]).depends_on(&b));
        assert!(entry(1, OpKind::Remove, &["d"]).depends_on(&b));
        assert!(entry(1, OpKind::Move, &["d/x", "q"]).depends_on(&b));
        assert!(entry(1, OpKind::Move, &["q", "s"]).depends_on(&b));
        assert!(entry(1, OpKind::Rename, &["d/x", "q"]).depends_on(&b));
        assert!(entry(1, OpKind::Rename, &["s", "q"]).depends_on(&b));
        assert!(entry(1, OpKind::List, &["d"]).depends_on(&b));
    }

    #[test]
    fn test_nothing_depends_on_ls() {
        let b = entry(0, OpKind::List, &["a"]);
        assert!(!entry(1, OpKind::Mkdir, &["a/b"]).depends_on(&b));
        assert!(!entry(1, OpKind::Remove, &["a"]).depends_on(&b));
    }

    #[test]
    fn test_compensations() {
        assert_eq!(
            entry(0, OpKind::Mkdir, &["a/b"]).compensation(),
            Some("rm a/b".to_string())
        );
        assert_eq!(
            entry(0, OpKind::Remove, &["a"]).compensation(),
            Some("mkdir a".to_string())
        );
        assert_eq!(
            entry(0, OpKind::Move, &["s", "d"]).compensation(),
            Some("mv d s".to_string())
        );
        assert_eq!(
            entry(0, OpKind::Rename, &["c", "t"]).compensation(),
            Some("rn t c".to_string())
        );
        assert_eq!(entry(0, OpKind::List, &["a"]).compensation(), None);
    }

    #[test]
    fn test_cascade_prefix_dependency() {
        let mut log = CommandLog::new();
        log.record(OpKind::Mkdir, vec!["a".into()]);
        log.record(OpKind::Mkdir, vec!["a/b".into()]);
        let comps = log.cascade_delete(0).unwrap();
        assert!(log.is_empty());
        // Ascending temporal order; a LIFO drain undoes a/b first.
        assert_eq!(comps, vec!["rm a", "rm a/b"]);
    }

    #[test]
    fn test_cascade_spares_independents() {
        let mut log = CommandLog::new();
        log.record(OpKind::Mkdir, vec!["a".into()]);
        log.record(OpKind::Mkdir, vec!["b".into()]);
        log.record(OpKind::Mkdir, vec!["a/c".into()]);
        let comps = log.cascade_delete(0).unwrap();
        assert_eq!(comps, vec!["rm a", "rm a/c"]);
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].operands, vec!["b"]);
    }

    #[test]
    fn test_cascade_transitive_chain() {
        // mv a b depends on mkdir a; rm b/x depends on the mv, not on mkdir.
        let mut log = CommandLog::new();
        log.record(OpKind::Mkdir, vec!["a".into()]);
        log.record(OpKind::Move, vec!["a".into(), "b".into()]);
        log.record(OpKind::Remove, vec!["b/x".into()]);
        let comps = log.cascade_delete(0).unwrap();
        assert!(log.is_empty());
        assert_eq!(comps, vec!["rm a", "mv b a", "mkdir b/x"]);
    }

    #[test]
    fn test_cascade_interleaved_dependents_stay_temporal() {
        // Both direct and second-level dependents interleave in time;
        // compensations still come back in ascending seq order.
        let mut log = CommandLog::new();
        log.record(OpKind::Mkdir, vec!["a".into()]); // 0
        log.record(OpKind::Mkdir, vec!["a/b".into()]); // 1, dep on 0
        log.record(OpKind::Mkdir, vec!["a/z".into()]); // 2, dep on 0
        log.record(OpKind::Mkdir, vec!["a/b/c".into()]); // 3, dep on 0 and 1
        let comps = log.cascade_delete(0).unwrap();
        assert_eq!(comps, vec!["rm a", "rm a/b", "rm a/z", "rm a/b/c"]);
    }

    #[test]
    fn test_cascade_ls_removed_without_compensation() {
        let mut log = CommandLog::new();
        log.record(OpKind::Mkdir, vec!["a".into()]);
        log.record(OpKind::List, vec!["a".into()]);
        let comps = log.cascade_delete(0).unwrap();
        assert!(log.is_empty());
        assert_eq!(comps, vec!["rm a"]);
    }

    #[test]
    fn test_cascade_out_of_range() {
        let mut log = CommandLog::new();
        log.record(OpKind::Mkdir, vec!["a".into()]);
        assert!(log.cascade_delete(5).is_none());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_render() {
        let mut log = CommandLog::new();
        log.record(OpKind::Mkdir, vec!["a".into()]);
        log.record(OpKind::List, vec![]);
        let lines = log.render("amy");
        assert_eq!(lines[0], "Logs:-");
        assert!(lines[1].contains("amy"));
        assert!(lines[1].ends_with("mkdir a"));
        assert!(lines[2].ends_with("ls"));
    }
}
