/// Rank-indexed bit vector.
pub mod bit_vector;
/// Double-array layout from a key set or a DAWG.
pub mod builder;
/// Minimizing automaton builder.
pub mod dawg;
/// Immutable double array and its lookups.
pub mod double_array;
/// Keys and optional values of one build.
pub mod key_set;
pub(crate) mod node_arena;
/// Packed 32-bit units.
pub mod unit;

pub use bit_vector::BitVector;
pub use builder::DoubleArrayBuilder;
pub use dawg::{Dawg, DawgBuilder};
pub use double_array::{CommonPrefixIter, DoubleArray, TraverseResult, TraverseStatus};
pub use key_set::KeySet;
pub use unit::Unit;
