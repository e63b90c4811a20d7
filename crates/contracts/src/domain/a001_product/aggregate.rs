use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

// ============================================================================
// Constraints
// ============================================================================

pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 100;

/// Количество знаков после запятой в цене (decimal(18,2))
pub const PRICE_SCALE: u32 = 2;

/// Минимально допустимая цена: 0.01
pub fn min_price() -> Decimal {
    Decimal::new(1, PRICE_SCALE)
}

/// Максимально допустимая цена: 999999.99
pub fn max_price() -> Decimal {
    Decimal::new(99_999_999, PRICE_SCALE)
}

/// Приведение цены к фиксированной точке с двумя знаками
pub fn normalize_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Товар
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

impl Product {
    /// Создать новый товар для вставки в БД.
    ///
    /// `id` назначается базой при вставке, `created_date` перезаписывается сервисом.
    pub fn new_for_insert(
        name: String,
        description: String,
        price: Decimal,
        stock_quantity: i32,
    ) -> Self {
        Self {
            id: 0,
            name,
            description,
            price: normalize_price(price),
            stock_quantity,
            created_date: Utc::now(),
            updated_date: None,
        }
    }

    /// Достаточно ли остатка для заказа `quantity` единиц
    pub fn is_available(&self, quantity: i32) -> bool {
        self.stock_quantity >= quantity
    }
}

// ============================================================================
// DTOs
// ============================================================================

/// Ответ API с данными товара
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponseDto {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

impl From<Product> for ProductResponseDto {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            stock_quantity: p.stock_quantity,
            created_date: p.created_date,
            updated_date: p.updated_date,
        }
    }
}

/// Данные для создания товара.
///
/// Поля `id`, `createdDate`, `updatedDate` в теле запроса игнорируются.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreateDto {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i32,
}

impl ProductCreateDto {
    pub fn validate(&self) -> Result<(), String> {
        validate_fields(
            &self.name,
            &self.description,
            self.price,
            self.stock_quantity,
        )
    }

    pub fn into_product(self) -> Product {
        Product::new_for_insert(self.name, self.description, self.price, self.stock_quantity)
    }
}

/// Данные для обновления товара.
///
/// `id` берётся из пути запроса; `createdDate`/`updatedDate` принимаются,
/// но сервер выставляет их сам.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdateDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_date: Option<DateTime<Utc>>,
}

impl ProductUpdateDto {
    pub fn validate(&self) -> Result<(), String> {
        validate_fields(
            &self.name,
            &self.description,
            self.price,
            self.stock_quantity,
        )
    }

    pub fn into_product(self, id: i32) -> Product {
        let mut product =
            Product::new_for_insert(self.name, self.description, self.price, self.stock_quantity);
        product.id = id;
        product
    }
}

fn validate_fields(
    name: &str,
    description: &str,
    price: Decimal,
    stock_quantity: i32,
) -> Result<(), String> {
    let mut errors: Vec<String> = Vec::new();

    if name.trim().is_empty() {
        errors.push("Product name is required.".into());
    } else if name.chars().count() > NAME_MAX_LEN {
        errors.push(format!(
            "Product name cannot exceed {} characters.",
            NAME_MAX_LEN
        ));
    }

    if description.trim().is_empty() {
        errors.push("Description is required.".into());
    } else if description.chars().count() > DESCRIPTION_MAX_LEN {
        errors.push(format!(
            "Description cannot exceed {} characters.",
            DESCRIPTION_MAX_LEN
        ));
    }

    if price < min_price() || price > max_price() {
        errors.push(format!(
            "Price must be between {} and {}.",
            min_price(),
            max_price()
        ));
    }

    if stock_quantity < 0 {
        errors.push("Stock quantity cannot be negative.".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join(" "))
    }
}
