//! Run outcome classification
//!
//! Exactly one outcome is recorded per source unit per run. The status is a
//! closed enumeration of branch (insert/update) crossed with result
//! (success/empty/error); it is rendered to the legacy status text only at
//! the persistence boundary, never compared as a string anywhere else.

/// Which checkpoint branch the run took for a source unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// No checkpoint record existed before this run
    Insert,
    /// A checkpoint record already existed
    Update,
}

/// Terminal status of one source unit for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// First run: items found and all delivered
    InsertedSuccess,
    /// First run: listing empty (or pattern matched nothing)
    InsertedEmpty,
    /// First run: remote path invalid or delivery failed
    InsertedError,
    /// Incremental run: new items found and delivered
    UpdatedSuccess,
    /// Incremental run: nothing newer than the checkpoint
    UpdatedEmpty,
    /// Incremental run: remote path invalid or delivery failed
    UpdatedError,
}

impl RunStatus {
    /// The error status for a branch
    pub fn error_for(branch: Branch) -> Self {
        match branch {
            Branch::Insert => RunStatus::InsertedError,
            Branch::Update => RunStatus::UpdatedError,
        }
    }

    /// Whether the stored marker advances to the run time for this status
    ///
    /// Inserts always stamp the new record (the record's existence is the
    /// checkpoint); incremental runs advance only on success so that items
    /// arriving out of order are still caught later. An insert that errored
    /// leaves the marker unset, so the next successful run emits everything.
    pub fn advances_marker(self) -> bool {
        matches!(
            self,
            RunStatus::InsertedSuccess | RunStatus::InsertedEmpty | RunStatus::UpdatedSuccess
        )
    }

    /// Render the operator-facing status text, prefixed with the unit's
    /// classification tag. Call this only when persisting the outcome.
    pub fn render(self, classification: &str) -> String {
        let text = match self {
            RunStatus::InsertedSuccess => "Files successfully identified for insert",
            RunStatus::InsertedEmpty => "Empty folder location or file format changed on insert",
            RunStatus::InsertedError => "Error: Invalid remote path on insert",
            RunStatus::UpdatedSuccess => "Files updated successfully",
            RunStatus::UpdatedEmpty => "Empty folder location or file format changed on update",
            RunStatus::UpdatedError => "Error: Invalid remote path on update",
        };
        format!("{} - {}", classification, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_classification() {
        let text = RunStatus::InsertedSuccess.render("direct_mail");
        assert_eq!(text, "direct_mail - Files successfully identified for insert");
    }

    #[test]
    fn test_render_is_deterministic_per_variant() {
        assert!(RunStatus::UpdatedEmpty.render("x").contains("on update"));
        assert!(RunStatus::InsertedEmpty.render("x").contains("on insert"));
        assert!(RunStatus::UpdatedError.render("x").contains("Error"));
    }

    #[test]
    fn test_error_for_branch() {
        assert_eq!(RunStatus::error_for(Branch::Insert), RunStatus::InsertedError);
        assert_eq!(RunStatus::error_for(Branch::Update), RunStatus::UpdatedError);
    }

    #[test]
    fn test_marker_advancement() {
        assert!(RunStatus::InsertedSuccess.advances_marker());
        assert!(RunStatus::InsertedEmpty.advances_marker());
        assert!(RunStatus::UpdatedSuccess.advances_marker());
        assert!(!RunStatus::UpdatedEmpty.advances_marker());
        assert!(!RunStatus::UpdatedError.advances_marker());
        assert!(!RunStatus::InsertedError.advances_marker());
    }
}
