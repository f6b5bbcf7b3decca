//! SeaORM implementation of the department catalog

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::domain::{CatalogRepository, DepartmentInput, DomainError};
use crate::models::department::{self, ActiveModel, Column, Entity as Department};
use crate::models::{assignment, employee};
use crate::utils::dates::now_rfc3339;

pub struct SeaOrmDepartmentRepository {
    db: DatabaseConnection,
}

impl SeaOrmDepartmentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn get(&self, id: i32) -> Result<department::Model, DomainError> {
        Department::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Department"))
    }

    async fn check_unique(&self, input: &DepartmentInput, exclude: Option<i32>) -> Result<(), DomainError> {
        let mut clash = Condition::any()
            .add(Column::Name.eq(input.name.as_str()))
            .add(Column::Code.eq(input.code.as_str()));
        if let Some(id) = exclude {
            clash = Condition::all().add(clash).add(Column::Id.ne(id));
        }

        if let Some(existing) = Department::find().filter(clash).one(&self.db).await? {
            let field = if existing.name == input.name { "name" } else { "code" };
            return Err(DomainError::Validation(format!(
                "A department with this {} already exists",
                field
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for SeaOrmDepartmentRepository {
    type Record = department::Model;
    type Input = DepartmentInput;

    const NAME: &'static str = "Department";

    async fn list(&self, only_active: bool) -> Result<Vec<department::Model>, DomainError> {
        let mut query = Department::find();
        if only_active {
            query = query.filter(Column::Active.eq(true));
        }
        Ok(query.order_by_asc(Column::Name).all(&self.db).await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<department::Model>, DomainError> {
        Ok(Department::find_by_id(id).one(&self.db).await?)
    }

    async fn create(&self, input: DepartmentInput, user_id: i32) -> Result<department::Model, DomainError> {
        let input = input.normalized()?;
        self.check_unique(&input, None).await?;

        let now = now_rfc3339();
        let model = ActiveModel {
            name: Set(input.name),
            code: Set(input.code),
            description: Set(input.description),
            manager_user_id: Set(input.manager_user_id),
            created_by: Set(Some(user_id)),
            active: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn update(&self, id: i32, input: DepartmentInput) -> Result<department::Model, DomainError> {
        let existing = self.get(id).await?;
        let input = input.normalized()?;
        self.check_unique(&input, Some(id)).await?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(input.name);
        active.code = Set(input.code);
        active.description = Set(input.description);
        active.manager_user_id = Set(input.manager_user_id);
        active.updated_at = Set(now_rfc3339());

        Ok(active.update(&self.db).await?)
    }

    async fn toggle_active(&self, id: i32) -> Result<department::Model, DomainError> {
        let existing = self.get(id).await?;
        let flipped = !existing.active;

        let mut active: ActiveModel = existing.into();
        active.active = Set(flipped);
        active.updated_at = Set(now_rfc3339());

        Ok(active.update(&self.db).await?)
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        self.get(id).await?;

        let employees = employee::Entity::find()
            .filter(employee::Column::DepartmentId.eq(id))
            .count(&self.db)
            .await?;
        let assignments = assignment::Entity::find()
            .filter(assignment::Column::DepartmentId.eq(id))
            .count(&self.db)
            .await?;
        if employees + assignments > 0 {
            return Err(DomainError::BusinessRule(format!(
                "The department has {} employee(s) and {} assignment(s); deactivate it instead",
                employees, assignments
            )));
        }

        Department::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}
