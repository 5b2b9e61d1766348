pub mod insight;
pub mod price;
