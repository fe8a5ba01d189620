pub mod audit_logs;
pub mod cart_items;
pub mod carts;
pub mod categories;
pub mod gemstones;
pub mod import_details;
pub mod imports;
pub mod liquidations;
pub mod order_details;
pub mod orders;
pub mod product_images;
pub mod products;
pub mod suppliers;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use categories::Entity as Categories;
pub use gemstones::Entity as Gemstones;
pub use import_details::Entity as ImportDetails;
pub use imports::Entity as Imports;
pub use liquidations::Entity as Liquidations;
pub use order_details::Entity as OrderDetails;
pub use orders::Entity as Orders;
pub use product_images::Entity as ProductImages;
pub use products::Entity as Products;
pub use suppliers::Entity as Suppliers;
pub use users::Entity as Users;
