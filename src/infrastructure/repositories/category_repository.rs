//! SeaORM implementation of the category catalog

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::domain::attributes::definitions_to_json_text;
use crate::domain::{CatalogRepository, CategoryInput, DomainError};
use crate::models::category::{self, ActiveModel, Column, Entity as Category};
use crate::models::{product, product_type_category};
use crate::utils::dates::now_rfc3339;

pub struct SeaOrmCategoryRepository {
    db: DatabaseConnection,
}

impl SeaOrmCategoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn check_unique(&self, input: &CategoryInput, exclude: Option<i32>) -> Result<(), DomainError> {
        let mut clash = Condition::any()
            .add(Column::Name.eq(input.name.as_str()))
            .add(Column::Code.eq(input.code.as_str()));
        if let Some(id) = exclude {
            clash = Condition::all().add(clash).add(Column::Id.ne(id));
        }

        if let Some(existing) = Category::find().filter(clash).one(&self.db).await? {
            let field = if existing.name == input.name { "name" } else { "code" };
            return Err(DomainError::Validation(format!(
                "A category with this {} already exists",
                field
            )));
        }
        Ok(())
    }

    async fn get(&self, id: i32) -> Result<category::Model, DomainError> {
        Category::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Category"))
    }
}

#[async_trait]
impl CatalogRepository for SeaOrmCategoryRepository {
    type Record = category::Model;
    type Input = CategoryInput;

    const NAME: &'static str = "Category";

    async fn list(&self, only_active: bool) -> Result<Vec<category::Model>, DomainError> {
        let mut query = Category::find();
        if only_active {
            query = query.filter(Column::Active.eq(true));
        }
        Ok(query.order_by_asc(Column::Name).all(&self.db).await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<category::Model>, DomainError> {
        Ok(Category::find_by_id(id).one(&self.db).await?)
    }

    async fn create(&self, input: CategoryInput, user_id: i32) -> Result<category::Model, DomainError> {
        let input = input.normalized()?;
        self.check_unique(&input, None).await?;

        let now = now_rfc3339();
        let model = ActiveModel {
            name: Set(input.name),
            code: Set(input.code),
            description: Set(input.description),
            specific_fields: Set(definitions_to_json_text(&input.specific_fields)),
            active: Set(true),
            created_by: Set(Some(user_id)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn update(&self, id: i32, input: CategoryInput) -> Result<category::Model, DomainError> {
        let existing = self.get(id).await?;
        let input = input.normalized()?;
        self.check_unique(&input, Some(id)).await?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(input.name);
        active.code = Set(input.code);
        active.description = Set(input.description);
        active.specific_fields = Set(definitions_to_json_text(&input.specific_fields));
        active.updated_at = Set(now_rfc3339());

        Ok(active.update(&self.db).await?)
    }

    async fn toggle_active(&self, id: i32) -> Result<category::Model, DomainError> {
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
            .filter(product::Column::CategoryId.eq(id))
            .count(&self.db)
            .await?;
        if in_use > 0 {
            return Err(DomainError::BusinessRule(format!(
                "The category is used by {} product(s); deactivate it instead",
                in_use
            )));
        }

        product_type_category::Entity::delete_many()
            .filter(product_type_category::Column::CategoryId.eq(id))
            .exec(&self.db)
            .await?;
        Category::delete_by_id(id).exec(&self.db).await?;

        Ok(())
    }
}
