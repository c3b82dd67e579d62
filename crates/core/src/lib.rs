//! Vitrina Core - Shared catalog, cart and storage library.
//!
//! This crate provides the pieces shared by all Vitrina components:
//! - `storefront` - Public catalog and cart
//! - `admin` - Product and category management
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! Domain types and the cart are pure and synchronous. The remote relational
//! store and the blob store sit behind the [`CatalogRepository`] and
//! [`BlobStore`] traits so binaries and tests can swap backends.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices and emails
//! - [`catalog`] - Products, images, categories and the repository trait
//! - [`cart`] - The shopping cart store
//! - [`checkout`] - Order summary text and the messaging handoff URL
//! - [`storage`] - Blob storage for original and watermarked images

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod storage;
pub mod types;

pub use cart::{CART_SLOT, Cart, CartItem};
pub use catalog::{
    CatalogError, CatalogRepository, Category, CategoryIndex, MemoryCatalog, NewProduct,
    NewProductImage, Product, ProductFilter, ProductImage, ProductUpdate,
};
pub use storage::{
    BlobStore, HttpBlobStore, LocalBlobStore, MemoryBlobStore, StorageError, StorageSettings,
    SupabaseStorageConfig,
};
pub use types::*;
