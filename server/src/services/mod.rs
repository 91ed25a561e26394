pub mod fortune;
pub mod lucky;
