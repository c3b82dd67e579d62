//! Checkout handoff to the external messaging channel.
//!
//! Checkout does not create an order. It renders a human-readable summary
//! of the cart and builds a pre-filled chat link to the store's contact
//! number; the customer sends it themselves.

use crate::cart::Cart;
use crate::catalog::Product;
use crate::types::format_amount;

/// Base URL of the click-to-chat service.
pub const CHAT_BASE_URL: &str = "https://wa.me";

/// Greeting used when the deployment does not configure one.
pub const DEFAULT_GREETING: &str = "Hello, I would like to place this order:";

/// Render the order summary for `cart`.
///
/// ```text
/// {greeting}
///
/// ProductA x2 - $20.00
/// ProductB x1 - $5.50
///
/// Total: $25.50
/// ```
#[must_use]
pub fn order_message(cart: &Cart, greeting: &str) -> String {
    let lines: Vec<String> = cart
        .items()
        .iter()
        .map(|item| {
            format!(
                "{} x{} - {}",
                item.product.name,
                item.quantity(),
                format_amount(item.line_total())
            )
        })
        .collect();

    format!(
        "{greeting}\n\n{}\n\nTotal: {}",
        lines.join("\n"),
        format_amount(cart.total())
    )
}

/// Build the pre-filled chat URL for `phone` carrying `message`.
///
/// Everything except digits is stripped from the phone number, so
/// `+1 (234) 567-890` and `1234567890` produce the same link.
#[must_use]
pub fn checkout_url(phone: &str, message: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!(
        "{CHAT_BASE_URL}/{digits}?text={}",
        urlencoding::encode(message)
    )
}

/// Text copied by the "copy info" action on a product card.
#[must_use]
pub fn share_text(product: &Product) -> String {
    format!(
        "*{}*\nPrice: {}\n\n{}",
        product.name,
        product.price.display(),
        product.description
    )
}
