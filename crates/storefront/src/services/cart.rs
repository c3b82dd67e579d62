//! Session-backed cart store.
//!
//! Each visitor's cart lives in their tower-sessions session under the
//! [`CART_SLOT`] key. A [`SessionCartStore`] is loaded once per request and
//! writes the cart back before every mutating method returns, so a reload
//! never sees a state older than the last committed operation.

use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;
use vitrina_core::{CART_SLOT, Cart, Product, ProductId};

/// A visitor's cart bound to their session.
pub struct SessionCartStore {
    session: Session,
    cart: Cart,
}

impl SessionCartStore {
    /// Rehydrate the cart from the session, starting empty on first visit.
    ///
    /// A slot that no longer deserializes is logged and replaced with an empty
    /// cart rather than failing the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub async fn load(session: Session) -> Result<Self, SessionError> {
        let cart = match session.get::<Cart>(CART_SLOT).await {
            Ok(cart) => cart.unwrap_or_default(),
            Err(SessionError::SerdeJson(e)) => {
                tracing::warn!(error = %e, "Discarding unreadable cart");
                Cart::default()
            }
            Err(e) => return Err(e),
        };
        Ok(Self { session, cart })
    }

    /// The current cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Add one unit of `product` and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be written.
    pub async fn add_item(&mut self, product: &Product) -> Result<(), SessionError> {
        self.cart.add_item(product);
        self.persist().await
    }

    /// Take one unit of `product_id` off the cart and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be written.
    pub async fn decrease_item(&mut self, product_id: ProductId) -> Result<(), SessionError> {
        self.cart.decrease_item(product_id);
        self.persist().await
    }

    /// Remove the line for `product_id` and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be written.
    pub async fn remove_item(&mut self, product_id: ProductId) -> Result<(), SessionError> {
        self.cart.remove_item(product_id);
        self.persist().await
    }

    /// Empty the cart and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be written.
    pub async fn clear(&mut self) -> Result<(), SessionError> {
        self.cart.clear();
        self.persist().await
    }

    async fn persist(&self) -> Result<(), SessionError> {
        self.session.insert(CART_SLOT, &self.cart).await
    }
}
