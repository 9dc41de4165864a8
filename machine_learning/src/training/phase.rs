use std::fmt::{self, Display};

/// The lifecycle phase a pass belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Train,
    Validate,
    Test,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Train, Phase::Validate, Phase::Test];

    /// Returns the prefix of the scalars reported for this phase.
    pub fn prefix(self) -> &'static str {
        match self {
            Phase::Train => "train",
            Phase::Validate => "val",
            Phase::Test => "test",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}
