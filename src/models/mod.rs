// src/models/mod.rs
pub mod driver;
pub mod fraud;
pub mod notification;
pub mod order;
pub mod pricing;
pub mod ride;
pub mod user;
pub mod wallet;

pub use driver::*;
pub use fraud::*;
pub use notification::*;
pub use order::*;
pub use pricing::*;
pub use ride::*;
pub use user::*;
pub use wallet::*;
