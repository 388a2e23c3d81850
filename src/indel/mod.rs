mod descriptor;
mod mutation;
mod tokens;
mod window;

pub use descriptor::{Indel, IndelParts, IndelType, NULL_INDEL};
pub use mutation::{format_mutations, parse_mutations, PointMutation};
