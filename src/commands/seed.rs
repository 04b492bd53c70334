//! Seed command - Admin account and a small published catalog.
//!
//! Safe to run repeatedly: existing rows are found and reused.

use std::collections::HashMap;
use uuid::Uuid;

use crate::cli::args::SeedArgs;
use crate::config::Config;
use crate::domain::{
    Argon2Hasher, CurrentUser, NewCategory, NewProduct, Password, ProductStatus, User, UserRole,
};
use crate::errors::{AppError, AppResult};
use crate::infra::{Database, Persistence, UnitOfWork};
use crate::services::{ServiceContainer, Services};
use crate::with_transaction;

const SAMPLE_CATEGORIES: &[(&str, &str)] = &[
    ("Lighting", "lighting"),
    ("Furniture", "furniture"),
    ("Stationery", "stationery"),
];

struct SampleProduct {
    name: &'static str,
    slug: &'static str,
    description: &'static str,
    price_cents: i64,
    stock_qty: i32,
    category: &'static str,
}

const SAMPLE_PRODUCTS: &[SampleProduct] = &[
    SampleProduct {
        name: "Brass Desk Lamp",
        slug: "brass-desk-lamp",
        description: "Adjustable arm, warm white bulb included.",
        price_cents: 4_900,
        stock_qty: 25,
        category: "lighting",
    },
    SampleProduct {
        name: "Oak Side Table",
        slug: "oak-side-table",
        description: "Solid oak, oiled finish.",
        price_cents: 12_900,
        stock_qty: 8,
        category: "furniture",
    },
    SampleProduct {
        name: "Linen Notebook",
        slug: "linen-notebook",
        description: "A5, 192 dotted pages.",
        price_cents: 1_800,
        stock_qty: 120,
        category: "stationery",
    },
];

/// Execute the seed command
pub async fn execute(args: SeedArgs, config: &Config) -> AppResult<()> {
    let db = Database::connect(config).await?;
    let uow = Persistence::new(db.get_connection());

    let admin = ensure_admin(&uow, config).await?;
    if args.admin_only {
        return Ok(());
    }

    let services = Services::from_config(db.get_connection(), config);
    let actor = CurrentUser::from(&admin);

    let categories = ensure_categories(&services, &actor).await?;
    let created = ensure_products(&services, &actor, &categories).await?;

    tracing::info!(
        categories = categories.len(),
        products_created = created,
        "Sample catalog ready"
    );
    Ok(())
}

async fn ensure_admin(uow: &Persistence, config: &Config) -> AppResult<User> {
    let email = config.seed_admin_email.clone();

    if let Some(user) = uow.users().find_by_email(&email).await? {
        if !user.is_admin() {
            return Err(AppError::conflict(format!(
                "{} exists but is not an administrator",
                user.email
            )));
        }
        tracing::info!(user_id = %user.id, "Admin account already present");
        return Ok(user);
    }

    let password_hash = Password::new(config.seed_admin_password(), &Argon2Hasher)?.into_string();
    let user = with_transaction!(uow, |ctx| {
        ctx.users()
            .create(&email, password_hash, Some("Store Admin".to_string()), UserRole::Admin)
            .await
    })?;

    tracing::info!(user_id = %user.id, email = %user.email, "Admin account created");
    Ok(user)
}

/// Category ids by slug, creating the missing sample categories
async fn ensure_categories(
    services: &Services,
    actor: &CurrentUser,
) -> AppResult<HashMap<String, Uuid>> {
    let catalog = services.catalog();
    let mut by_slug: HashMap<String, Uuid> = catalog
        .list_categories()
        .await?
        .into_iter()
        .map(|category| (category.slug, category.id))
        .collect();

    for (name, slug) in SAMPLE_CATEGORIES {
        if by_slug.contains_key(*slug) {
            continue;
        }
        let input = NewCategory {
            name: name.to_string(),
            slug: slug.to_string(),
        };
        let category = catalog.create_category(actor, input).await?;
        by_slug.insert(category.slug, category.id);
    }

    Ok(by_slug)
}

/// Create the missing sample products; returns how many were created
async fn ensure_products(
    services: &Services,
    actor: &CurrentUser,
    categories: &HashMap<String, Uuid>,
) -> AppResult<usize> {
    let catalog = services.catalog();
    let mut created = 0;

    for sample in SAMPLE_PRODUCTS {
        match catalog.get_product_by_slug(sample.slug).await {
            Ok(_) => continue,
            Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let input = NewProduct {
            name: sample.name.to_string(),
            slug: sample.slug.to_string(),
            description: Some(sample.description.to_string()),
            price_cents: sample.price_cents,
            stock_qty: sample.stock_qty,
            status: Some(ProductStatus::Published),
            category_ids: categories.get(sample.category).copied().into_iter().collect(),
            images: vec![],
        };
        catalog.create_product(actor, input).await?;
        created += 1;
    }

    Ok(created)
}
