use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth, cart, catalog, dashboard as dashboard_dto, imports as import_dto,
        liquidations as liquidation_dto, orders as order_dto, suppliers as supplier_dto,
        users as user_dto,
    },
    error::ErrorData,
    models::{
        CartStatus, Category, Gemstone, Import, ImportDetail, ImportStatus, Liquidation,
        LiquidationState, Order, OrderDetail, OrderStatus, Product, ProductImage, ProductStatus,
        Role, Supplier, User,
    },
    response::Meta,
    routes::{
        auth as auth_routes, cart as cart_routes, catalog as catalog_routes, dashboard, health,
        imports, liquidations, orders, params, products, suppliers, users,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth_routes::register,
        auth_routes::login,
        auth_routes::logout,
        auth_routes::activate,
        auth_routes::forgot_password,
        auth_routes::reset_password,
        auth_routes::change_password,
        auth_routes::me,
        products::list_products,
        products::preview_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::list_images,
        products::add_image,
        products::replace_images,
        products::delete_image,
        catalog_routes::list_gemstones,
        catalog_routes::create_gemstone,
        catalog_routes::update_gemstone,
        catalog_routes::delete_gemstone,
        catalog_routes::list_categories,
        catalog_routes::create_category,
        catalog_routes::update_category,
        catalog_routes::delete_category,
        catalog_routes::get_inventory,
        catalog_routes::adjust_inventory,
        cart_routes::my_cart,
        cart_routes::add_product,
        cart_routes::remove_product,
        cart_routes::update_quantity,
        cart_routes::confirm,
        cart_routes::clear,
        orders::list_orders,
        orders::list_my_orders,
        orders::summary,
        orders::get_order,
        orders::get_order_details,
        orders::complete_order,
        orders::reject_order,
        imports::list_imports,
        imports::create_import,
        imports::get_import,
        imports::get_import_details,
        imports::accept_import,
        imports::reject_import,
        suppliers::list_suppliers,
        suppliers::get_supplier,
        suppliers::create_supplier,
        suppliers::update_supplier,
        suppliers::delete_supplier,
        users::list_users,
        users::create_user,
        users::summary,
        users::get_user,
        users::update_user,
        users::update_avatar,
        users::reset_password,
        liquidations::list_liquidations,
        liquidations::create_liquidation,
        liquidations::get_liquidation,
        liquidations::inspect_liquidation,
        dashboard::revenue,
        dashboard::top_products,
        dashboard::top_customers,
        dashboard::order_stats
    ),
    components(
        schemas(
            User,
            Role,
            Category,
            Product,
            ProductStatus,
            ProductImage,
            Gemstone,
            Supplier,
            Order,
            OrderStatus,
            OrderDetail,
            Import,
            ImportStatus,
            ImportDetail,
            Liquidation,
            LiquidationState,
            CartStatus,
            Meta,
            ErrorData,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::LoginResponse,
            catalog::CreateProductRequest,
            catalog::UpdateProductRequest,
            catalog::GemstoneInput,
            catalog::ProductDetail,
            catalog::ProductPreview,
            cart::CartDto,
            cart::CartLine,
            order_dto::OrderWithDetails,
            order_dto::OrderSummary,
            import_dto::CreateImportRequest,
            import_dto::ImportDetailInput,
            import_dto::ImportWithDetails,
            supplier_dto::SupplierRequest,
            user_dto::CreateUserRequest,
            user_dto::UpdateUserRequest,
            user_dto::UserSummary,
            liquidation_dto::InspectLiquidationRequest,
            dashboard_dto::RevenueSeries,
            dashboard_dto::TopProduct,
            dashboard_dto::TopCustomer,
            params::Pagination,
            params::SortOrder,
            params::ProductSortBy
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, activation, login and passwords"),
        (name = "Products", description = "Catalog products and their images"),
        (name = "Gemstones", description = "Gemstones set in a product"),
        (name = "Categories", description = "Product categories"),
        (name = "Inventory", description = "Stock levels"),
        (name = "Cart", description = "Shopping cart and checkout"),
        (name = "Orders", description = "Order lifecycle"),
        (name = "Imports", description = "Supplier deliveries"),
        (name = "Suppliers", description = "Supplier directory"),
        (name = "Users", description = "Account administration"),
        (name = "Liquidations", description = "Stock write-off requests"),
        (name = "Dashboard", description = "Sales reporting"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
