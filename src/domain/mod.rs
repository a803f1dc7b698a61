pub mod company;
pub mod enrichment;
pub mod sentinel;

pub use company::*;
pub use enrichment::*;
