pub mod attachment;
pub use attachment::{Extractor, PartOutcome};

pub mod disposition;
pub use disposition::{Action, ActionsConfig, Disposition, DispositionEngine, DispositionPlan};

pub mod email;
pub use email::{Email, ParsedEmail, PartsIterator};

pub mod flag;
pub use flag::{Flag, Flags};

pub mod rule;
pub use rule::{find_match, MappingRule};
