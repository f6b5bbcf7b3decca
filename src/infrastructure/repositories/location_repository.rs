//! SeaORM implementation of the location catalog

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::{CatalogRepository, DomainError, LocationInput};
use crate::models::location::{self, ActiveModel, Column, Entity as Location};
use crate::models::product;
use crate::utils::dates::now_rfc3339;

pub struct SeaOrmLocationRepository {
    db: DatabaseConnection,
}

impl SeaOrmLocationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn get(&self, id: i32) -> Result<location::Model, DomainError> {
        Location::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Location"))
    }
}

#[async_trait]
impl CatalogRepository for SeaOrmLocationRepository {
    type Record = location::Model;
    type Input = LocationInput;

    const NAME: &'static str = "Location";

    async fn list(&self, only_active: bool) -> Result<Vec<location::Model>, DomainError> {
        let mut query = Location::find();
        if only_active {
            query = query.filter(Column::Active.eq(true));
        }
        Ok(query
            .order_by_asc(Column::Name)
            .order_by_asc(Column::Building)
            .all(&self.db)
            .await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<location::Model>, DomainError> {
        Ok(Location::find_by_id(id).one(&self.db).await?)
    }

    async fn create(&self, input: LocationInput, _user_id: i32) -> Result<location::Model, DomainError> {
        let input = input.normalized()?;

        let now = now_rfc3339();
        let model = ActiveModel {
            name: Set(input.name),
            building: Set(input.building),
            floor: Set(input.floor),
            room: Set(input.room),
            description: Set(input.description),
            active: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn update(&self, id: i32, input: LocationInput) -> Result<location::Model, DomainError> {
        let existing = self.get(id).await?;
        let input = input.normalized()?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(input.name);
        active.building = Set(input.building);
        active.floor = Set(input.floor);
        active.room = Set(input.room);
        active.description = Set(input.description);
        active.updated_at = Set(now_rfc3339());

        Ok(active.update(&self.db).await?)
    }

    async fn toggle_active(&self, id: i32) -> Result<location::Model, DomainError> {
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
            .filter(product::Column::LocationId.eq(id))
            .count(&self.db)
            .await?;
        if in_use > 0 {
            return Err(DomainError::BusinessRule(format!(
                "{} product(s) are stored at this location; deactivate it instead",
                in_use
            )));
        }

        Location::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}
