//! Business logic services for storefront.
//!
//! - `cart` - Cart store persisted in the visitor's session

pub mod cart;

pub use cart::SessionCartStore;
