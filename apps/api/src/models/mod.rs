pub mod contract;
pub mod role;
