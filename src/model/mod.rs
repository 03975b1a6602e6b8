pub mod attendance;
pub mod correction;
pub mod division;
pub mod overview;
pub mod role;
pub mod shift;
