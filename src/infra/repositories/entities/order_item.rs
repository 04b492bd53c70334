//! Order item database entity. Rows are written once at checkout.

use sea_orm::entity::prelude::*;

use crate::domain::OrderItem;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub name_snapshot: String,
    pub price_cents: i64,
    pub quantity: i32,
    /// Position of the line in the source cart
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "SetNull"
    )]
    Product,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for OrderItem {
    fn from(model: Model) -> Self {
        OrderItem {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            name_snapshot: model.name_snapshot,
            price_cents: model.price_cents,
            quantity: model.quantity,
        }
    }
}
