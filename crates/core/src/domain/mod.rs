pub mod distributor;
pub mod offer;
pub mod order;
pub mod product;
pub mod quote;
