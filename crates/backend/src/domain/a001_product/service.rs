use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use contracts::domain::a001_product::aggregate::Product;

use super::repository::ProductRepository;

#[derive(Debug, thiserror::Error)]
pub enum ProductServiceError {
    #[error("Product with ID {0} not found")]
    NotFound(i32),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ProductServiceError>;

/// Текущее время с точностью до миллисекунд (столько хранит CREATED_DATE/UPDATED_DATE)
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Правила над репозиторием: изменение и удаление только существующих товаров,
/// даты создания и изменения выставляются здесь и только здесь.
pub struct ProductService {
    repository: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(repository: Arc<dyn ProductRepository>) -> Self {
        Self { repository }
    }

    /// Получение списка всех товаров
    pub async fn list_all(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.repository.list().await?)
    }

    /// Получение товара по ID; `None` если не найден
    pub async fn get_by_id(&self, id: i32) -> ServiceResult<Option<Product>> {
        Ok(self.repository.get_by_id(id).await?)
    }

    /// Создание товара
    pub async fn create(&self, mut product: Product) -> ServiceResult<Product> {
        product.created_date = now();
        product.updated_date = None;
        Ok(self.repository.create(product).await?)
    }

    /// Обновление существующего товара
    pub async fn update(&self, id: i32, mut product: Product) -> ServiceResult<Product> {
        let existing = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(ProductServiceError::NotFound(id))?;

        product.id = id;
        product.created_date = existing.created_date;
        product.updated_date = Some(now());

        Ok(self.repository.update(product).await?)
    }

    /// Удаление существующего товара
    pub async fn delete(&self, id: i32) -> ServiceResult<()> {
        if !self.repository.exists(id).await? {
            return Err(ProductServiceError::NotFound(id));
        }
        Ok(self.repository.delete(id).await?)
    }

    /// Есть ли на складе `quantity` единиц; для несуществующего товара `false`
    pub async fn check_availability(&self, id: i32, quantity: i32) -> ServiceResult<bool> {
        let product = self.repository.get_by_id(id).await?;
        Ok(product.is_some_and(|p| p.is_available(quantity)))
    }
}
