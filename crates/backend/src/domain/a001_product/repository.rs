use anyhow::anyhow;
use async_trait::async_trait;
use contracts::domain::a001_product::aggregate::{normalize_price, Product};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue::NotSet, DbErr, PaginatorTrait, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "PRODUCTS")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "ID")]
    pub id: i32,
    #[sea_orm(column_name = "NAME")]
    pub name: String,
    #[sea_orm(column_name = "DESCRIPTION")]
    pub description: String,
    #[sea_orm(column_name = "PRICE")]
    pub price: f64,
    #[sea_orm(column_name = "STOCK_QUANTITY")]
    pub stock_quantity: i32,
    #[sea_orm(column_name = "CREATED_DATE")]
    pub created_date: chrono::DateTime<chrono::Utc>,
    #[sea_orm(column_name = "UPDATED_DATE")]
    pub updated_date: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Product {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let price = Decimal::from_f64(m.price)
            .ok_or_else(|| anyhow!("PRICE {} of product {} is not a valid decimal", m.price, m.id))?;

        Ok(Product {
            id: m.id,
            name: m.name,
            description: m.description,
            price: normalize_price(price),
            stock_quantity: m.stock_quantity,
            created_date: m.created_date,
            updated_date: m.updated_date,
        })
    }
}

fn price_to_column(price: Decimal) -> anyhow::Result<f64> {
    normalize_price(price)
        .to_f64()
        .ok_or_else(|| anyhow!("price {} cannot be stored", price))
}

/// Лог ошибки БД и проброс без изменений
fn log_failure(operation: &'static str) -> impl FnOnce(DbErr) -> anyhow::Error {
    move |e| {
        tracing::error!("Error in {}: {}", operation, e);
        e.into()
    }
}

/// Строка → `Product`; битое значение логируется так же, как ошибка БД
fn to_product(operation: &'static str) -> impl Fn(Model) -> anyhow::Result<Product> {
    move |m| {
        Product::try_from(m).map_err(|e| {
            tracing::error!("Error in {}: {}", operation, e);
            e
        })
    }
}

/// Доступ к таблице PRODUCTS. Бизнес-правил здесь нет.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Все товары по возрастанию ID
    async fn list(&self) -> anyhow::Result<Vec<Product>>;

    async fn get_by_id(&self, id: i32) -> anyhow::Result<Option<Product>>;

    /// Вставка NAME/DESCRIPTION/PRICE/STOCK_QUANTITY/CREATED_DATE; возвращает товар с новым ID
    async fn create(&self, product: Product) -> anyhow::Result<Product>;

    /// Перезапись полей строки с `product.id`; CREATED_DATE не трогается.
    /// Отсутствие строки не ошибка.
    async fn update(&self, product: Product) -> anyhow::Result<Product>;

    /// Жёсткое удаление; идемпотентно
    async fn delete(&self, id: i32) -> anyhow::Result<()>;

    async fn exists(&self, id: i32) -> anyhow::Result<bool>;
}

pub struct SqlProductRepository {
    conn: DatabaseConnection,
}

impl SqlProductRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ProductRepository for SqlProductRepository {
    async fn list(&self) -> anyhow::Result<Vec<Product>> {
        Entity::find()
            .order_by_asc(Column::Id)
            .all(&self.conn)
            .await
            .map_err(log_failure("list"))?
            .into_iter()
            .map(to_product("list"))
            .collect()
    }

    async fn get_by_id(&self, id: i32) -> anyhow::Result<Option<Product>> {
        let result = Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(log_failure("get_by_id"))?;
        result.map(to_product("get_by_id")).transpose()
    }

    async fn create(&self, mut product: Product) -> anyhow::Result<Product> {
        let active = ActiveModel {
            id: NotSet,
            name: Set(product.name.clone()),
            description: Set(product.description.clone()),
            price: Set(price_to_column(product.price)?),
            stock_quantity: Set(product.stock_quantity),
            created_date: Set(product.created_date),
            updated_date: NotSet,
        };
        let result = Entity::insert(active)
            .exec(&self.conn)
            .await
            .map_err(log_failure("create"))?;

        product.id = result.last_insert_id;
        product.price = normalize_price(product.price);
        Ok(product)
    }

    async fn update(&self, mut product: Product) -> anyhow::Result<Product> {
        let result = Entity::update_many()
            .col_expr(Column::Name, Expr::value(product.name.clone()))
            .col_expr(Column::Description, Expr::value(product.description.clone()))
            .col_expr(Column::Price, Expr::value(price_to_column(product.price)?))
            .col_expr(Column::StockQuantity, Expr::value(product.stock_quantity))
            .col_expr(Column::UpdatedDate, Expr::value(product.updated_date))
            .filter(Column::Id.eq(product.id))
            .exec(&self.conn)
            .await
            .map_err(log_failure("update"))?;

        if result.rows_affected == 0 {
            tracing::warn!("update: product {} not found, nothing written", product.id);
        }

        product.price = normalize_price(product.price);
        Ok(product)
    }

    async fn delete(&self, id: i32) -> anyhow::Result<()> {
        let result = Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .map_err(log_failure("delete"))?;
        tracing::debug!("delete: product {}, rows affected {}", id, result.rows_affected);
        Ok(())
    }

    async fn exists(&self, id: i32) -> anyhow::Result<bool> {
        let count = Entity::find_by_id(id)
            .count(&self.conn)
            .await
            .map_err(log_failure("exists"))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;
    use chrono::{SubsecRound, Utc};

    fn widget(name: &str, stock: i32) -> Product {
        let mut product =
            Product::new_for_insert(name.into(), "A widget".into(), Decimal::new(999, 2), stock);
        product.created_date = Utc::now().trunc_subsecs(3);
        product
    }

    #[tokio::test]
    async fn test_list_empty_table() {
        let repo = SqlProductRepository::new(connect_in_memory().await);
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_lists_in_order() {
        let repo = SqlProductRepository::new(connect_in_memory().await);

        let first = repo.create(widget("First", 1)).await.unwrap();
        let second = repo.create(widget("Second", 2)).await.unwrap();
        assert!(first.id > 0);
        assert!(second.id > first.id);

        let names: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_get_by_id_round_trip() {
        let repo = SqlProductRepository::new(connect_in_memory().await);
        let created = repo.create(widget("Widget", 10)).await.unwrap();

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.updated_date, None);

        assert!(repo.get_by_id(created.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_ignores_caller_updated_date() {
        let repo = SqlProductRepository::new(connect_in_memory().await);
        let mut product = widget("Widget", 1);
        product.updated_date = Some(Utc::now());

        let created = repo.create(product).await.unwrap();
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.updated_date, None);
    }

    #[tokio::test]
    async fn test_update_keeps_created_date() {
        let repo = SqlProductRepository::new(connect_in_memory().await);
        let created = repo.create(widget("Widget", 10)).await.unwrap();

        let mut changed = created.clone();
        changed.name = "Gadget".into();
        changed.price = Decimal::new(1250, 2);
        changed.stock_quantity = 8;
        changed.created_date = created.created_date + chrono::Duration::days(30);
        changed.updated_date = Some(Utc::now().trunc_subsecs(3));
        repo.update(changed.clone()).await.unwrap();

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Gadget");
        assert_eq!(fetched.price, Decimal::new(1250, 2));
        assert_eq!(fetched.stock_quantity, 8);
        assert_eq!(fetched.created_date, created.created_date);
        assert_eq!(fetched.updated_date, changed.updated_date);
    }

    #[tokio::test]
    async fn test_update_missing_row_is_silent() {
        let repo = SqlProductRepository::new(connect_in_memory().await);
        let mut ghost = widget("Ghost", 1);
        ghost.id = 77;

        assert!(repo.update(ghost).await.is_ok());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_exists() {
        let repo = SqlProductRepository::new(connect_in_memory().await);
        let created = repo.create(widget("Widget", 1)).await.unwrap();

        assert!(repo.exists(created.id).await.unwrap());
        repo.delete(created.id).await.unwrap();
        assert!(!repo.exists(created.id).await.unwrap());

        // повторное удаление не ошибка
        repo.delete(created.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_price_rounded_to_two_places() {
        let repo = SqlProductRepository::new(connect_in_memory().await);
        let mut product = widget("Widget", 1);
        product.price = Decimal::new(10_005, 3);

        let created = repo.create(product).await.unwrap();
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.price, Decimal::new(1001, 2));
    }

    #[tokio::test]
    async fn test_unreadable_price_is_error_not_missing() {
        use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

        let conn = connect_in_memory().await;
        let repo = SqlProductRepository::new(conn.clone());
        let created = repo.create(widget("Widget", 1)).await.unwrap();

        // 9e999 переполняет REAL, SQLite хранит +Inf
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            format!("UPDATE PRODUCTS SET PRICE = 9e999 WHERE ID = {};", created.id),
        ))
        .await
        .unwrap();

        let err = repo.get_by_id(created.id).await.unwrap_err();
        assert!(err.to_string().contains("is not a valid decimal"));
        assert!(repo.list().await.is_err());
    }
}
