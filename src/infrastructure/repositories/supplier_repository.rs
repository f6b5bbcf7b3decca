//! SeaORM implementation of the supplier catalog

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::{CatalogRepository, DomainError, SupplierInput};
use crate::models::product;
use crate::models::supplier::{self, ActiveModel, Column, Entity as Supplier};
use crate::utils::dates::now_rfc3339;

pub struct SeaOrmSupplierRepository {
    db: DatabaseConnection,
}

impl SeaOrmSupplierRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn get(&self, id: i32) -> Result<supplier::Model, DomainError> {
        Supplier::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Supplier"))
    }

    async fn check_unique(&self, tax_id: &str, exclude: Option<i32>) -> Result<(), DomainError> {
        let mut query = Supplier::find().filter(Column::TaxId.eq(tax_id));
        if let Some(id) = exclude {
            query = query.filter(Column::Id.ne(id));
        }
        if query.count(&self.db).await? > 0 {
            return Err(DomainError::Validation(format!(
                "A supplier with tax id {} already exists",
                tax_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for SeaOrmSupplierRepository {
    type Record = supplier::Model;
    type Input = SupplierInput;

    const NAME: &'static str = "Supplier";

    async fn list(&self, only_active: bool) -> Result<Vec<supplier::Model>, DomainError> {
        let mut query = Supplier::find();
        if only_active {
            query = query.filter(Column::Active.eq(true));
        }
        Ok(query.order_by_asc(Column::Name).all(&self.db).await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<supplier::Model>, DomainError> {
        Ok(Supplier::find_by_id(id).one(&self.db).await?)
    }

    async fn create(&self, input: SupplierInput, _user_id: i32) -> Result<supplier::Model, DomainError> {
        let input = input.normalized()?;
        self.check_unique(&input.tax_id, None).await?;

        let now = now_rfc3339();
        let model = ActiveModel {
            name: Set(input.name),
            tax_id: Set(input.tax_id),
            phone: Set(input.phone),
            email: Set(input.email),
            address: Set(input.address),
            active: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn update(&self, id: i32, input: SupplierInput) -> Result<supplier::Model, DomainError> {
        let existing = self.get(id).await?;
        let input = input.normalized()?;
        self.check_unique(&input.tax_id, Some(id)).await?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(input.name);
        active.tax_id = Set(input.tax_id);
        active.phone = Set(input.phone);
        active.email = Set(input.email);
        active.address = Set(input.address);
        active.updated_at = Set(now_rfc3339());

        Ok(active.update(&self.db).await?)
    }

    async fn toggle_active(&self, id: i32) -> Result<supplier::Model, DomainError> {
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
            .filter(product::Column::SupplierId.eq(id))
            .count(&self.db)
            .await?;
        if in_use > 0 {
            return Err(DomainError::BusinessRule(format!(
                "The supplier is referenced by {} product(s); deactivate it instead",
                in_use
            )));
        }

        Supplier::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}
