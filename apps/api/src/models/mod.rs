pub mod district;
pub mod recommendation;
