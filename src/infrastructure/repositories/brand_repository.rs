//! SeaORM implementation of the brand catalog

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::{BrandInput, CatalogRepository, DomainError};
use crate::models::brand::{self, ActiveModel, Column, Entity as Brand};
use crate::models::product;
use crate::utils::dates::now_rfc3339;

pub struct SeaOrmBrandRepository {
    db: DatabaseConnection,
}

impl SeaOrmBrandRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn get(&self, id: i32) -> Result<brand::Model, DomainError> {
        Brand::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Brand"))
    }

    async fn check_unique(&self, name: &str, exclude: Option<i32>) -> Result<(), DomainError> {
        let mut query = Brand::find().filter(Column::Name.eq(name));
        if let Some(id) = exclude {
            query = query.filter(Column::Id.ne(id));
        }
        if query.count(&self.db).await? > 0 {
            return Err(DomainError::Validation(format!(
                "A brand named '{}' already exists",
                name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for SeaOrmBrandRepository {
    type Record = brand::Model;
    type Input = BrandInput;

    const NAME: &'static str = "Brand";

    async fn list(&self, only_active: bool) -> Result<Vec<brand::Model>, DomainError> {
        let mut query = Brand::find();
        if only_active {
            query = query.filter(Column::Active.eq(true));
        }
        Ok(query.order_by_asc(Column::Name).all(&self.db).await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<brand::Model>, DomainError> {
        Ok(Brand::find_by_id(id).one(&self.db).await?)
    }

    async fn create(&self, input: BrandInput, _user_id: i32) -> Result<brand::Model, DomainError> {
        let input = input.normalized()?;
        self.check_unique(&input.name, None).await?;

        let now = now_rfc3339();
        let model = ActiveModel {
            name: Set(input.name),
            active: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn update(&self, id: i32, input: BrandInput) -> Result<brand::Model, DomainError> {
        let existing = self.get(id).await?;
        let input = input.normalized()?;
        self.check_unique(&input.name, Some(id)).await?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(input.name);
        active.updated_at = Set(now_rfc3339());

        Ok(active.update(&self.db).await?)
    }

    async fn toggle_active(&self, id: i32) -> Result<brand::Model, DomainError> {
        let existing = self.get(id).await?;
        let flipped = !existing.active;

        let mut active: ActiveModel = existing.into();
        active.active = Set(flipped);
        active.updated_at = Set(now_rfc3339());

        Ok(active.update(&self.db).await?)
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        self.get(id).await?;

        let in_use = product::Entity::find()
            .filter(product::Column::BrandId.eq(id))
            .count(&self.db)
            .await?;
        if in_use > 0 {
            return Err(DomainError::BusinessRule(format!(
                "The brand is used by {} product(s); deactivate it instead",
                in_use
            )));
        }

        Brand::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}
