mod enumerative;

pub use enumerative::*;
