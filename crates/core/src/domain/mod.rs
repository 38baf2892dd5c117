pub mod contract;
pub mod driver;
pub mod intent;
pub mod scenario;
pub mod simulation;
pub mod trajectory;
