use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity,
    error::{AppError, AppResult},
};

/// Status enums are stored as text columns; this wires up the string mapping.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(AppError::BadRequest(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Employee,
    Manager,
}

text_enum!(Role {
    Customer => "customer",
    Employee => "employee",
    Manager => "manager",
});

impl Role {
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Employee | Role::Manager)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Inactive,
}

text_enum!(ProductStatus {
    Active => "active",
    Inactive => "inactive",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    Active,
    CheckedOut,
}

text_enum!(CartStatus {
    Active => "active",
    CheckedOut => "checked_out",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Completed,
    Rejected,
}

text_enum!(OrderStatus {
    Pending => "pending",
    Completed => "completed",
    Rejected => "rejected",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Accepted,
    Rejected,
}

text_enum!(ImportStatus {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LiquidationState {
    Pending,
    Approved,
    Rejected,
}

text_enum!(LiquidationState {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// Workflows whose only live state is `Pending`; every other state is final.
pub trait PendingWorkflow: Copy + PartialEq + fmt::Display {
    const PENDING: Self;
    const NAME: &'static str;

    fn is_terminal(&self) -> bool {
        *self != Self::PENDING
    }

    /// Move from `Pending` to `to`. Anything else is a conflict.
    fn transition(self, to: Self) -> AppResult<Self> {
        if self.is_terminal() {
            return Err(AppError::Conflict(format!(
                "{} is already {}",
                Self::NAME,
                self
            )));
        }
        if to == Self::PENDING {
            return Err(AppError::Conflict(format!(
                "{} cannot move back to {}",
                Self::NAME,
                to
            )));
        }
        Ok(to)
    }
}

impl PendingWorkflow for OrderStatus {
    const PENDING: Self = OrderStatus::Pending;
    const NAME: &'static str = "order";
}

impl PendingWorkflow for ImportStatus {
    const PENDING: Self = ImportStatus::Pending;
    const NAME: &'static str = "import";
}

impl PendingWorkflow for LiquidationState {
    const PENDING: Self = LiquidationState::Pending;
    const NAME: &'static str = "liquidation";
}

/// Parse a status stored in the database; the schema's CHECK constraints keep these valid.
pub fn stored<T: FromStr<Err = AppError>>(value: &str) -> AppResult<T> {
    value
        .parse::<T>()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("corrupt stored value '{value}'")))
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub role: Role,
    pub is_active: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<entity::users::Model> for User {
    type Error = AppError;

    fn try_from(model: entity::users::Model) -> AppResult<Self> {
        Ok(Self {
            id: model.id,
            full_name: model.full_name,
            email: model.email,
            phone: model.phone,
            address: model.address,
            birthday: model.birthday,
            role: stored(&model.role)?,
            is_active: model.is_active,
            avatar_url: model.avatar_url,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

impl From<entity::categories::Model> for Category {
    fn from(model: entity::categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub material: Option<String>,
    pub description: Option<String>,
    pub price: i64,
    pub quantity: i32,
    pub category_id: Uuid,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<entity::products::Model> for Product {
    type Error = AppError;

    fn try_from(model: entity::products::Model) -> AppResult<Self> {
        Ok(Self {
            id: model.id,
            name: model.name,
            material: model.material,
            description: model.description,
            price: model.price,
            quantity: model.quantity,
            category_id: model.category_id,
            status: stored(&model.status)?,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct ProductImage {
    pub product_id: Uuid,
    pub image_order: i32,
    pub url: String,
}

impl From<entity::product_images::Model> for ProductImage {
    fn from(model: entity::product_images::Model) -> Self {
        Self {
            product_id: model.product_id,
            image_order: model.image_order,
            url: model.url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Gemstone {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub weight: f64,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl From<entity::gemstones::Model> for Gemstone {
    fn from(model: entity::gemstones::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            name: model.name,
            weight: model.weight,
            size: model.size,
            color: model.color,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<entity::suppliers::Model> for Supplier {
    fn from(model: entity::suppliers::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            address: model.address,
            phone: model.phone,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub total_price: i64,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<entity::orders::Model> for Order {
    type Error = AppError;

    fn try_from(model: entity::orders::Model) -> AppResult<Self> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            staff_id: model.staff_id,
            total_price: model.total_price,
            status: stored(&model.status)?,
            shipping_address: model.shipping_address,
            phone: model.phone,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct OrderDetail {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price at the time of sale.
    pub price: i64,
    /// Position of the line in the checkout, starting at 1.
    pub line_no: i32,
    pub created_at: DateTime<Utc>,
}

impl From<entity::order_details::Model> for OrderDetail {
    fn from(model: entity::order_details::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price: model.price,
            line_no: model.line_no,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Import {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub staff_id: Uuid,
    pub total_price: i64,
    pub status: ImportStatus,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<entity::imports::Model> for Import {
    type Error = AppError;

    fn try_from(model: entity::imports::Model) -> AppResult<Self> {
        Ok(Self {
            id: model.id,
            supplier_id: model.supplier_id,
            staff_id: model.staff_id,
            total_price: model.total_price,
            status: stored(&model.status)?,
            decided_by: model.decided_by,
            decided_at: model.decided_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ImportDetail {
    pub id: Uuid,
    pub import_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub import_price: i64,
    pub line_no: i32,
}

impl From<entity::import_details::Model> for ImportDetail {
    fn from(model: entity::import_details::Model) -> Self {
        Self {
            id: model.id,
            import_id: model.import_id,
            product_id: model.product_id,
            quantity: model.quantity,
            import_price: model.import_price,
            line_no: model.line_no,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Liquidation {
    pub id: Uuid,
    pub created_by: Uuid,
    pub inspected_by: Option<Uuid>,
    pub state: LiquidationState,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub inspected_at: Option<DateTime<Utc>>,
}

impl TryFrom<entity::liquidations::Model> for Liquidation {
    type Error = AppError;

    fn try_from(model: entity::liquidations::Model) -> AppResult<Self> {
        Ok(Self {
            id: model.id,
            created_by: model.created_by,
            inspected_by: model.inspected_by,
            state: stored(&model.state)?,
            note: model.note,
            created_at: model.created_at.with_timezone(&Utc),
            inspected_at: model.inspected_at.map(|dt| dt.with_timezone(&Utc)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_order_can_complete_or_reject() {
        assert_eq!(
            OrderStatus::Pending.transition(OrderStatus::Completed).unwrap(),
            OrderStatus::Completed
        );
        assert_eq!(
            OrderStatus::Pending.transition(OrderStatus::Rejected).unwrap(),
            OrderStatus::Rejected
        );
    }

    #[test]
    fn terminal_order_rejects_every_transition() {
        for from in [OrderStatus::Completed, OrderStatus::Rejected] {
            for to in [
                OrderStatus::Pending,
                OrderStatus::Completed,
                OrderStatus::Rejected,
            ] {
                assert!(matches!(from.transition(to), Err(AppError::Conflict(_))));
            }
        }
    }

    #[test]
    fn pending_cannot_transition_to_pending() {
        assert!(ImportStatus::Pending.transition(ImportStatus::Pending).is_err());
    }

    #[test]
    fn accepted_import_is_terminal() {
        assert!(ImportStatus::Accepted.is_terminal());
        assert!(!ImportStatus::Pending.is_terminal());
        assert!(
            ImportStatus::Accepted
                .transition(ImportStatus::Rejected)
                .is_err()
        );
    }

    #[test]
    fn text_mapping_round_trips() {
        assert_eq!("checked_out".parse::<CartStatus>().unwrap(), CartStatus::CheckedOut);
        assert_eq!(Role::Manager.as_str(), "manager");
        assert!("admin".parse::<Role>().is_err());
        assert!(Role::Employee.is_staff());
        assert!(!Role::Customer.is_staff());
    }

    #[test]
    fn corrupt_stored_value_is_internal() {
        assert!(matches!(
            stored::<OrderStatus>("shipped"),
            Err(AppError::Internal(_))
        ));
    }
}
