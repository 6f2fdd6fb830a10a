//! The two state machines of spec §4.10, made explicit as enums rather than
//! left implicit in control flow.

/// Transport-layer progress of a single pack transfer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PackTransferState {
    Idle,
    Requesting,
    Receiving,
    Unpacking,
    Recorded,
}

impl PackTransferState {
    /// A network error while `Requesting`/`Receiving` drops back to `Idle`
    /// with no metadata change; outside those states it's a caller bug.
    pub fn on_network_error(self) -> Self {
        debug_assert!(matches!(self, Self::Requesting | Self::Receiving));
        Self::Idle
    }

    /// An unpack failure drops back to `Idle`. Whatever layers the aborted
    /// unpack already admitted into the store stay there, orphaned: they are
    /// addressed by content and referenced by nothing, so nothing reads them
    /// until a later pack happens to reintroduce the same content.
    pub fn on_unpack_failure(self) -> Self {
        debug_assert_eq!(self, Self::Unpacking);
        Self::Idle
    }

    pub fn advance(self) -> Self {
        match self {
            Self::Idle => Self::Requesting,
            Self::Requesting => Self::Receiving,
            Self::Receiving => Self::Unpacking,
            Self::Unpacking => Self::Recorded,
            Self::Recorded => Self::Recorded,
        }
    }
}

/// Per-push/pull branch comparison, determined purely from an MRCA result's
/// `(path_a, path_b, common)` — `a` is the local side, `b` the remote side.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BranchState {
    /// Local has commits the remote lacks; the remote has none local lacks.
    Ahead,
    /// The remote has commits local lacks; local has none the remote lacks.
    Behind,
    /// `Behind`, after a pull has applied the remote's commits.
    FastForward,
    /// Both sides have commits the other lacks.
    Diverged,
    /// No shared ancestor at all.
    NoCommon,
    /// Identical heads.
    Equal,
}

impl BranchState {
    pub fn classify(mrca: &kiln_history::Mrca) -> Self {
        if mrca.common.is_none() {
            return Self::NoCommon;
        }
        match (mrca.path_a.is_empty(), mrca.path_b.is_empty()) {
            (true, true) => Self::Equal,
            (false, true) => Self::Ahead,
            (true, false) => Self::Behind,
            (false, false) => Self::Diverged,
        }
    }

    /// Pull resolves a `Behind` branch by fast-forwarding it.
    pub fn resolved_by_pull(self) -> Self {
        match self {
            Self::Behind => Self::FastForward,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use kiln_history::{CommitId, Mrca};

    use super::*;

    fn id(label: &str) -> CommitId {
        CommitId::of(label.as_bytes())
    }

    #[test]
    fn equal_heads_classify_as_equal() {
        let mrca = Mrca {
            common: Some(id("c")),
            path_a: vec![],
            path_b: vec![],
        };
        assert_eq!(BranchState::classify(&mrca), BranchState::Equal);
    }

    #[test]
    fn remote_only_commits_classify_as_behind_then_fast_forward() {
        let mrca = Mrca {
            common: Some(id("c")),
            path_a: vec![],
            path_b: vec![id("their-child")],
        };
        assert_eq!(BranchState::classify(&mrca), BranchState::Behind);
        assert_eq!(BranchState::classify(&mrca).resolved_by_pull(), BranchState::FastForward);
    }

    #[test]
    fn no_common_ancestor_is_reported_directly() {
        let mrca = Mrca {
            common: None,
            path_a: vec![id("root-a")],
            path_b: vec![id("root-b")],
        };
        assert_eq!(BranchState::classify(&mrca), BranchState::NoCommon);
    }
}
