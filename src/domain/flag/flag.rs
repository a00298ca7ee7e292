/// Represents the flag variants the archiver stores on messages.
#[derive(Debug, Clone, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum Flag {
    Seen,
    Deleted,
}

impl Flag {
    /// Returns the IMAP system flag representation.
    pub fn to_imap_query(&self) -> &'static str {
        match self {
            Flag::Seen => "\\Seen",
            Flag::Deleted => "\\Deleted",
        }
    }
}
