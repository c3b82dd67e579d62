//! Shopping cart store.
//!
//! A [`Cart`] is an ordered list of line items, at most one per product id,
//! in first-added order. Every operation is total: removing or decreasing a
//! product that is not in the cart is a no-op.
//!
//! The cart itself does no I/O. Callers persist it after each mutation under
//! the [`CART_SLOT`] key and rehydrate it with serde on the next request.

use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::ProductId;

/// Name of the durable slot holding the serialized cart.
pub const CART_SLOT: &str = "cart-storage";

/// A cart line: a product snapshot taken when it was first added, and a
/// quantity that is never zero while the line exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    quantity: NonZeroU32,
}

impl CartItem {
    /// Number of units of this product.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity.get()
    }

    /// `price * quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price.times(self.quantity())
    }
}

/// Shopping cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredCart")]
pub struct Cart {
    items: Vec<CartItem>,
}

/// Wire form of a cart, normalised on load.
#[derive(Deserialize)]
struct StoredCart {
    #[serde(default)]
    items: Vec<CartItem>,
}

impl From<StoredCart> for Cart {
    fn from(stored: StoredCart) -> Self {
        let mut cart = Self::default();
        for item in stored.items {
            match cart.position(item.product.id) {
                Some(index) => {
                    if let Some(existing) = cart.items.get_mut(index) {
                        existing.quantity = existing.quantity.saturating_add(item.quantity.get());
                    }
                }
                None => cart.items.push(item),
            }
        }
        cart
    }
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Line items in first-added order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity held for `product_id`, or zero.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|item| item.product.id == product_id)
            .map_or(0, CartItem::quantity)
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product.id == product_id)
    }

    /// Add one unit of `product`.
    ///
    /// An existing line keeps its original snapshot and gains one unit; a new
    /// product is appended with quantity 1.
    pub fn add_item(&mut self, product: &Product) {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.product.id == product.id)
        {
            item.quantity = item.quantity.saturating_add(1);
        } else {
            self.items.push(CartItem {
                product: product.clone(),
                quantity: NonZeroU32::MIN,
            });
        }
    }

    /// Remove the line for `product_id`, if any.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.items.retain(|item| item.product.id != product_id);
    }

    /// Take one unit off the line for `product_id`.
    ///
    /// A line at quantity 1 is removed entirely.
    pub fn decrease_item(&mut self, product_id: ProductId) {
        let Some(index) = self.position(product_id) else {
            return;
        };
        let next = self
            .items
            .get(index)
            .and_then(|item| NonZeroU32::new(item.quantity.get() - 1));
        match (next, self.items.get_mut(index)) {
            (Some(quantity), Some(item)) => item.quantity = quantity,
            _ => {
                self.items.remove(index);
            }
        }
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Grand total: sum of `price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total number of units, for the cart badge.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, item| acc.saturating_add(item.quantity()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;

    use super::*;
    use crate::types::Price;

    fn product(name: &str, price: &str) -> Product {
        Product {
            id: ProductId::new(),
            name: name.to_owned(),
            description: String::new(),
            price: Price::parse(price).unwrap(),
            category_id: None,
            is_out_of_stock: false,
            images: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_appends_then_increments() {
        let a = product("A", "10.00");
        let b = product("B", "5.50");
        let mut cart = Cart::new();

        cart.add_item(&a);
        cart.add_item(&b);
        cart.add_item(&a);

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].product.id, a.id);
        assert_eq!(cart.items()[0].quantity(), 2);
        assert_eq!(cart.items()[1].quantity(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_add_keeps_first_snapshot() {
        let mut a = product("A", "10.00");
        let mut cart = Cart::new();
        cart.add_item(&a);

        a.price = Price::parse("99.00").unwrap();
        cart.add_item(&a);

        assert_eq!(cart.items()[0].product.price.display(), "$10.00");
        assert_eq!(cart.total(), Decimal::new(2000, 2));
    }

    #[test]
    fn test_decrease_quantity_one_removes() {
        let a = product("A", "1.00");
        let b = product("B", "2.00");
        let mut cart = Cart::new();
        cart.add_item(&a);
        cart.add_item(&b);
        cart.add_item(&b);
        cart.add_item(&b);

        cart.decrease_item(b.id);
        assert_eq!(cart.quantity_of(b.id), 2);
        assert_eq!(cart.quantity_of(a.id), 1);

        cart.decrease_item(a.id);
        assert_eq!(cart.quantity_of(a.id), 0);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product.id, b.id);
    }

    #[test]
    fn test_missing_product_is_noop() {
        let a = product("A", "1.00");
        let mut cart = Cart::new();
        cart.add_item(&a);
        let before = cart.clone();

        cart.remove_item(ProductId::new());
        cart.decrease_item(ProductId::new());

        assert_eq!(cart, before);
    }

    #[test]
    fn test_add_add_decrease_leaves_one() {
        let a = product("A", "3.00");
        let mut cart = Cart::new();
        cart.add_item(&a);
        cart.add_item(&a);
        cart.decrease_item(a.id);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity(), 1);
    }

    #[test]
    fn test_total_scenario() {
        let a = product("ProductA", "10.00");
        let b = product("ProductB", "5.50");
        let mut cart = Cart::new();
        cart.add_item(&a);
        cart.add_item(&a);
        cart.add_item(&b);

        assert_eq!(cart.total(), Decimal::new(2550, 2));
    }

    #[test]
    fn test_clear_and_remove() {
        let a = product("A", "1.00");
        let b = product("B", "1.00");
        let mut cart = Cart::new();
        cart.add_item(&a);
        cart.add_item(&b);

        cart.remove_item(a.id);
        assert_eq!(cart.items().len(), 1);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_serde_roundtrip_preserves_items_and_total() {
        let a = product("A", "10.00");
        let b = product("B", "5.50");
        let mut cart = Cart::new();
        cart.add_item(&a);
        cart.add_item(&b);
        cart.add_item(&a);

        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, cart);
        assert_eq!(restored.total(), cart.total());
    }

    #[test]
    fn test_load_merges_duplicate_lines() {
        let a = product("A", "2.00");
        let line = serde_json::json!({ "product": a, "quantity": 2 });
        let json = serde_json::json!({ "items": [line.clone(), line] });

        let cart: Cart = serde_json::from_value(json).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.quantity_of(a.id), 4);
    }

    #[test]
    fn test_load_rejects_zero_quantity() {
        let a = product("A", "2.00");
        let json = serde_json::json!({ "items": [{ "product": a, "quantity": 0 }] });
        assert!(serde_json::from_value::<Cart>(json).is_err());
    }

    proptest! {
        #[test]
        fn prop_repeated_add_aggregates(count in 1_u32..200) {
            let a = product("A", "1.25");
            let mut cart = Cart::new();
            for _ in 0..count {
                cart.add_item(&a);
            }
            prop_assert_eq!(cart.items().len(), 1);
            prop_assert_eq!(cart.quantity_of(a.id), count);
        }

        #[test]
        fn prop_total_ignores_insertion_order(
            lines in proptest::collection::vec((0_i64..1_000_000, 1_u32..6), 0..16)
        ) {
            let products: Vec<(Product, u32)> = lines
                .iter()
                .map(|(cents, qty)| {
                    let mut p = product("P", "0");
                    p.price = Price::new(Decimal::new(*cents, 2)).unwrap();
                    (p, *qty)
                })
                .collect();

            let mut forward = Cart::new();
            for (p, qty) in &products {
                for _ in 0..*qty {
                    forward.add_item(p);
                }
            }

            let mut backward = Cart::new();
            for (p, qty) in products.iter().rev() {
                for _ in 0..*qty {
                    backward.add_item(p);
                }
            }

            let expected: Decimal = products.iter().map(|(p, qty)| p.price.times(*qty)).sum();
            prop_assert_eq!(forward.total(), expected);
            prop_assert_eq!(backward.total(), expected);
        }
    }
}
