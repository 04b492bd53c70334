//! Domain layer - Core business entities and logic
//!
//! Plain storefront models: users, catalog, carts, orders and session
//! tokens. Nothing here touches the database.

pub mod cart;
pub mod order;
pub mod password;
pub mod product;
pub mod token;
pub mod user;

pub use cart::{ensure_positive_quantity, Cart, CartItem, CartStatus};
pub use order::{CheckoutRequest, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus};
pub use password::{Argon2Hasher, Password, SecretHasher};
pub use product::{
    normalize_slug, Category, NewCategory, NewProduct, Product, ProductChanges, ProductDetails,
    ProductImage, ProductImageInput, ProductQuery, ProductStatus,
};
pub use token::{AuthResult, AuthTokens, RefreshToken};
pub use user::{
    normalize_email, CurrentUser, RegisterUser, SafeUser, User, UserChanges, UserRole,
};
