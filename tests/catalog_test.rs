//! Catalog maintenance against a real store and a temporary image root.

mod common;

use uuid::Uuid;

use storefront::domain::{
    NewCategory, NewProduct, ProductChanges, ProductImageInput, ProductQuery, ProductStatus,
};
use storefront::errors::AppError;
use storefront::services::ServiceContainer;

fn new_product(name: &str, slug: &str, status: ProductStatus) -> NewProduct {
    NewProduct {
        name: name.into(),
        slug: slug.into(),
        description: None,
        price_cents: 1_000,
        stock_qty: 5,
        status: Some(status),
        category_ids: vec![],
        images: vec![],
    }
}

fn image_input(url: &str, sort_order: i32) -> ProductImageInput {
    ProductImageInput {
        image_url: url.into(),
        sort_order: Some(sort_order),
    }
}

#[tokio::test]
async fn test_create_product_normalizes_slug_and_links_categories() {
    let app = common::setup().await;
    let catalog = app.services.catalog();

    let lighting = catalog
        .create_category(
            &app.admin,
            NewCategory {
                name: "Lighting".into(),
                slug: " Lighting ".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(lighting.slug, "lighting");

    let mut input = new_product("Brass Lamp", "  Brass-Lamp ", ProductStatus::Published);
    input.category_ids = vec![lighting.id];
    input.images = vec![image_input("https://cdn.example.com/lamp.png", 0)];

    let details = catalog.create_product(&app.admin, input).await.unwrap();
    assert_eq!(details.product.slug, "brass-lamp");
    assert_eq!(details.categories, vec![lighting]);
    assert_eq!(details.product.images.len(), 1);

    let by_slug = catalog.get_product_by_slug("BRASS-LAMP").await.unwrap();
    assert_eq!(by_slug.id, details.product.id);
}

#[tokio::test]
async fn test_duplicate_slug_is_a_conflict() {
    let app = common::setup().await;
    let catalog = app.services.catalog();

    catalog
        .create_product(&app.admin, new_product("Lamp", "lamp", ProductStatus::Draft))
        .await
        .unwrap();
    let err = catalog
        .create_product(&app.admin, new_product("Other Lamp", "LAMP", ProductStatus::Draft))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_unknown_category_aborts_creation() {
    let app = common::setup().await;
    let catalog = app.services.catalog();

    let mut input = new_product("Lamp", "lamp", ProductStatus::Draft);
    input.category_ids = vec![Uuid::new_v4()];

    let err = catalog.create_product(&app.admin, input).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound("Category")));

    // The product row was rolled back with the failed link
    let err = catalog.get_product_by_slug("lamp").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound("Product")));
}

#[tokio::test]
async fn test_customers_cannot_create_products() {
    let app = common::setup().await;
    let customer = app.customer("ada@example.com").await;

    let err = app
        .services
        .catalog()
        .create_product(&customer, new_product("Lamp", "lamp", ProductStatus::Draft))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn test_listing_filters_searches_and_paginates() {
    let app = common::setup().await;
    let catalog = app.services.catalog();

    for (name, slug, status) in [
        ("Brass Lamp", "brass-lamp", ProductStatus::Published),
        ("Floor Lamp", "floor-lamp", ProductStatus::Published),
        ("Oak Table", "oak-table", ProductStatus::Published),
        ("Draft Lamp", "draft-lamp", ProductStatus::Draft),
    ] {
        catalog
            .create_product(&app.admin, new_product(name, slug, status))
            .await
            .unwrap();
    }

    let published = catalog
        .list_products(ProductQuery {
            status: Some(ProductStatus::Published),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(published.meta.total, 3);

    let lamps = catalog
        .list_products(ProductQuery {
            search: Some("LAMP".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(lamps.meta.total, 3);
    assert!(lamps.items.iter().all(|p| p.name.contains("Lamp")));

    let page = catalog
        .list_products(ProductQuery {
            page: 2,
            limit: 3,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.meta.page, 2);
    assert_eq!(page.meta.total, 4);
    assert_eq!(page.meta.total_pages, 2);
}

#[tokio::test]
async fn test_search_takes_wildcards_literally() {
    let app = common::setup().await;
    let catalog = app.services.catalog();

    for (name, slug) in [
        ("50% Off Lamp", "sale-lamp"),
        ("500 Lamp", "five-hundred-lamp"),
        ("Desk_Lamp", "desk-lamp"),
        ("Desk Lamp", "plain-desk-lamp"),
    ] {
        catalog
            .create_product(&app.admin, new_product(name, slug, ProductStatus::Published))
            .await
            .unwrap();
    }

    let search = |term: &str| ProductQuery {
        search: Some(term.into()),
        ..Default::default()
    };

    let percent = catalog.list_products(search("50%")).await.unwrap();
    assert_eq!(percent.meta.total, 1);
    assert_eq!(percent.items[0].name, "50% Off Lamp");

    let underscore = catalog.list_products(search("desk_")).await.unwrap();
    assert_eq!(underscore.meta.total, 1);
    assert_eq!(underscore.items[0].name, "Desk_Lamp");
}

#[tokio::test]
async fn test_update_replaces_images_and_categories() {
    let app = common::setup().await;
    let catalog = app.services.catalog();

    let furniture = catalog
        .create_category(
            &app.admin,
            NewCategory {
                name: "Furniture".into(),
                slug: "furniture".into(),
            },
        )
        .await
        .unwrap();

    let mut input = new_product("Table", "table", ProductStatus::Draft);
    input.images = vec![image_input("https://cdn.example.com/a.png", 0)];
    let created = catalog.create_product(&app.admin, input).await.unwrap();

    let changes = ProductChanges {
        name: Some("Oak Table".into()),
        status: Some(ProductStatus::Published),
        category_ids: Some(vec![furniture.id]),
        images: Some(vec![
            image_input("https://cdn.example.com/c.png", 1),
            image_input("https://cdn.example.com/b.png", 0),
        ]),
        ..Default::default()
    };
    let updated = catalog
        .update_product(&app.admin, created.product.id, changes)
        .await
        .unwrap();

    assert_eq!(updated.product.name, "Oak Table");
    assert_eq!(updated.product.slug, "table");
    assert_eq!(updated.product.status, ProductStatus::Published);
    assert_eq!(updated.categories, vec![furniture]);
    let urls: Vec<&str> = updated
        .product
        .images
        .iter()
        .map(|image| image.image_url.as_str())
        .collect();
    assert_eq!(urls, ["https://cdn.example.com/b.png", "https://cdn.example.com/c.png"]);

    // Untouched collections stay as they are
    let renamed = catalog
        .update_product(
            &app.admin,
            created.product.id,
            ProductChanges {
                description: Some("Solid oak".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.product.images.len(), 2);
    assert_eq!(renamed.categories.len(), 1);
}

#[tokio::test]
async fn test_update_rejects_slug_of_another_product() {
    let app = common::setup().await;
    let catalog = app.services.catalog();

    catalog
        .create_product(&app.admin, new_product("Lamp", "lamp", ProductStatus::Draft))
        .await
        .unwrap();
    let table = catalog
        .create_product(&app.admin, new_product("Table", "table", ProductStatus::Draft))
        .await
        .unwrap();

    let taken = ProductChanges {
        slug: Some("lamp".into()),
        ..Default::default()
    };
    let err = catalog
        .update_product(&app.admin, table.product.id, taken)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Keeping its own slug is fine
    let own = ProductChanges {
        slug: Some("TABLE".into()),
        ..Default::default()
    };
    catalog
        .update_product(&app.admin, table.product.id, own)
        .await
        .unwrap();

    let err = catalog
        .update_product(&app.admin, Uuid::new_v4(), ProductChanges::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Product")));
}

#[tokio::test]
async fn test_delete_product_and_category() {
    let app = common::setup().await;
    let catalog = app.services.catalog();

    let category = catalog
        .create_category(
            &app.admin,
            NewCategory {
                name: "Lighting".into(),
                slug: "lighting".into(),
            },
        )
        .await
        .unwrap();
    let mut input = new_product("Lamp", "lamp", ProductStatus::Draft);
    input.category_ids = vec![category.id];
    let lamp = catalog.create_product(&app.admin, input).await.unwrap();

    catalog.delete_category(&app.admin, category.id).await.unwrap();
    let details = catalog.get_product(lamp.product.id).await.unwrap();
    assert!(details.categories.is_empty());

    catalog.delete_product(&app.admin, lamp.product.id).await.unwrap();
    let err = catalog.get_product(lamp.product.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound("Product")));

    let err = catalog.delete_product(&app.admin, lamp.product.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound("Product")));
}

#[tokio::test]
async fn test_uploaded_images_land_on_disk_and_are_replaced() {
    let app = common::setup().await;
    let catalog = app.services.catalog();
    let lamp = app.product("Lamp", 1_000, 5).await;
    let root = app.dir.path().join("images");

    let added = catalog
        .add_image(&app.admin, lamp.id, "Lamp Photo.PNG".into(), b"first".to_vec())
        .await
        .unwrap();
    assert!(added.image_url.ends_with(".png"));
    assert_eq!(std::fs::read(root.join(&added.image_url)).unwrap(), b"first");

    let replaced = catalog
        .replace_image(&app.admin, lamp.id, added.id, "angle.jpg".into(), b"second".to_vec())
        .await
        .unwrap();
    assert_eq!(replaced.id, added.id);
    assert_eq!(replaced.sort_order, added.sort_order);
    assert!(replaced.image_url.ends_with(".jpg"));
    assert_eq!(std::fs::read(root.join(&replaced.image_url)).unwrap(), b"second");
    assert!(!root.join(&added.image_url).exists());

    let details = catalog.get_product(lamp.id).await.unwrap();
    assert_eq!(details.product.images.len(), 1);
    assert_eq!(details.product.images[0].image_url, replaced.image_url);
}

#[tokio::test]
async fn test_image_operations_require_existing_targets() {
    let app = common::setup().await;
    let catalog = app.services.catalog();
    let lamp = app.product("Lamp", 1_000, 5).await;

    let err = catalog
        .add_image(&app.admin, Uuid::new_v4(), "a.png".into(), vec![1])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Product")));

    let err = catalog
        .replace_image(&app.admin, lamp.id, Uuid::new_v4(), "a.png".into(), vec![1])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Product image")));
}
