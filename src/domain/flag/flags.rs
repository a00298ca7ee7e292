use std::{collections::BTreeSet, ops};

use crate::Flag;

/// Represents the list of flags.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Flags(pub BTreeSet<Flag>);

impl Flags {
    /// Builds the space-separated IMAP flag list, for example
    /// `\Seen \Deleted`.
    pub fn to_imap_query(&self) -> String {
        self.iter()
            .map(Flag::to_imap_query)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ops::Deref for Flags {
    type Target = BTreeSet<Flag>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ops::DerefMut for Flags {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<Flag> for Flags {
    fn from_iter<T: IntoIterator<Item = Flag>>(iter: T) -> Self {
        let mut flags = Flags::default();
        flags.extend(iter);
        flags
    }
}
