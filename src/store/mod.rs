pub mod attendance;
pub mod audit;
pub mod correction;
pub mod reconcile;
pub mod shift;
