//! Integration tests for Vitrina.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (no external services)
//! cargo test -p vitrina-integration-tests
//!
//! # Include the PostgreSQL tests
//! VITRINA_TEST_DATABASE_URL=postgres://... cargo test -p vitrina-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `storefront_cart` - Cart mutations and the checkout handoff
//! - `admin_uploads` - Product creation through the watermark pipeline
//! - `session_persistence` - Carts surviving across requests over real HTTP
//! - `postgres_catalog` - The `PostgreSQL` catalog adapter (ignored by default)
//!
//! [`TestShop`] wires both routers to one in-memory catalog and blob store,
//! so what the admin panel writes is what the storefront reads.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use image::{ImageFormat, Rgba, RgbaImage};
use secrecy::SecretString;
use tempfile::TempDir;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use vitrina_admin::services::{AdminCredentials, Watermarker, hash_password};
use vitrina_core::{
    CatalogRepository, Email, MemoryBlobStore, MemoryCatalog, NewProduct, Price, Product,
};
use vitrina_storefront::config::CheckoutConfig;

pub const OPERATOR_EMAIL: &str = "owner@example.com";
pub const OPERATOR_PASSWORD: &str = "correct horse battery";
pub const STORE_PHONE: &str = "+1 (555) 010-0100";
pub const GREETING: &str = "Hello, I would like to place this order:";

/// Multipart boundary used by [`multipart_request`].
const BOUNDARY: &str = "vitrina-test-boundary";

/// Whether the admin panel has a watermark logo to composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Present,
    Missing,
}

/// Storefront and admin routers over shared in-memory backends.
pub struct TestShop {
    pub catalog: Arc<MemoryCatalog>,
    pub blobs: Arc<MemoryBlobStore>,
    pub storefront: Router,
    pub admin: Router,
    // Keeps the overlay file alive for the shop's lifetime
    _dir: TempDir,
}

impl TestShop {
    pub fn new(overlay: Overlay) -> Self {
        let catalog = Arc::new(MemoryCatalog::new());
        let blobs = Arc::new(MemoryBlobStore::new("http://localhost:3000/media"));

        let dir = TempDir::new().unwrap();
        let overlay_path: PathBuf = dir.path().join("watermark.png");
        if overlay == Overlay::Present {
            std::fs::write(&overlay_path, png(40, 20, [255, 255, 255, 255])).unwrap();
        }

        let storefront_state = vitrina_storefront::state::AppState::new(
            catalog.clone(),
            blobs.clone(),
            CheckoutConfig {
                phone: STORE_PHONE.to_string(),
                greeting: GREETING.to_string(),
            },
            None,
        );
        let storefront = vitrina_storefront::app(
            storefront_state,
            vitrina_storefront::middleware::session_layer(MemoryStore::default(), false),
            None,
        );

        let admin_state = vitrina_admin::state::AppState::new(
            catalog.clone(),
            blobs.clone(),
            Watermarker::new(overlay_path),
            AdminCredentials::new(
                Email::parse(OPERATOR_EMAIL).unwrap(),
                SecretString::from(hash_password(OPERATOR_PASSWORD).unwrap()),
            ),
            Duration::from_secs(5),
        );
        let admin = vitrina_admin::app(
            admin_state,
            vitrina_admin::middleware::session_layer(MemoryStore::default(), false),
            10 * 1024 * 1024,
        );

        Self {
            catalog,
            blobs,
            storefront,
            admin,
            _dir: dir,
        }
    }

    /// Insert a product directly into the catalog.
    pub async fn product(&self, name: &str, price: &str) -> Product {
        self.catalog
            .create_product(NewProduct {
                name: name.to_string(),
                description: String::new(),
                price: Price::parse(price).unwrap(),
                category_id: None,
            })
            .await
            .unwrap()
    }

    /// Log in to the admin panel and return the session cookie.
    pub async fn admin_login(&self) -> String {
        let response = self
            .admin
            .clone()
            .oneshot(form_request(
                "/auth/login",
                &format!("email={OPERATOR_EMAIL}&password={OPERATOR_PASSWORD}")
                    .replace('@', "%40")
                    .replace(' ', "+"),
                None,
            ))
            .await
            .unwrap();
        assert!(response.status().is_redirection(), "login failed");
        session_cookie(&response).expect("login sets a session cookie")
    }
}

/// Encode a solid-colour PNG.
pub fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(rgba));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// `name=value` pair of the `Set-Cookie` header, if any.
pub fn session_cookie<B>(response: &Response<B>) -> Option<String> {
    let value = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    value.split(';').next().map(str::to_owned)
}

/// URL-encoded form post.
pub fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut request =
        Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    request.body(Body::from(body.to_string())).unwrap()
}

/// GET with an optional cookie.
pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut request = Request::get(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    request.body(Body::empty()).unwrap()
}

/// An uploaded file part.
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: Vec<u8>,
}

/// `multipart/form-data` post with text fields and files.
pub fn multipart_request(
    uri: &str,
    fields: &[(&str, &str)],
    files: Vec<FilePart<'_>>,
    cookie: &str,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.field, file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(&file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

/// Collect a response body as UTF-8.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
