//! SeaORM implementation of the employee catalog

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::domain::{CatalogRepository, DomainError, EmployeeInput};
use crate::models::employee::{self, ActiveModel, Column, Entity as Employee};
use crate::models::{assignment, department};
use crate::utils::dates::{now_rfc3339, parse_date, today};

pub struct SeaOrmEmployeeRepository {
    db: DatabaseConnection,
}

impl SeaOrmEmployeeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn get(&self, id: i32) -> Result<employee::Model, DomainError> {
        Employee::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Employee"))
    }

    /// Shared checks for create and update
    async fn validate(&self, input: &EmployeeInput, exclude: Option<i32>) -> Result<(), DomainError> {
        let dept = department::Entity::find_by_id(input.department_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Department"))?;
        if !dept.active {
            return Err(DomainError::Validation(format!(
                "Department '{}' is inactive",
                dept.name
            )));
        }

        if let Some(hired) = &input.hired_on {
            parse_date(hired, "Hire date")?;
        }
        if let Some(left) = &input.left_on {
            parse_date(left, "Leave date")?;
        }

        let mut clash = Condition::any()
            .add(Column::NationalId.eq(input.national_id.as_str()))
            .add(Column::Email.eq(input.email.as_str()));
        if let Some(id) = exclude {
            clash = Condition::all().add(clash).add(Column::Id.ne(id));
        }
        if let Some(existing) = Employee::find().filter(clash).one(&self.db).await? {
            let field = if existing.national_id == input.national_id {
                "national id"
            } else {
                "e-mail"
            };
            return Err(DomainError::Validation(format!(
                "An employee with this {} already exists",
                field
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for SeaOrmEmployeeRepository {
    type Record = employee::Model;
    type Input = EmployeeInput;

    const NAME: &'static str = "Employee";

    async fn list(&self, only_active: bool) -> Result<Vec<employee::Model>, DomainError> {
        let mut query = Employee::find();
        if only_active {
            query = query.filter(Column::Active.eq(true));
        }
        Ok(query.order_by_asc(Column::Name).all(&self.db).await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<employee::Model>, DomainError> {
        Ok(Employee::find_by_id(id).one(&self.db).await?)
    }

    async fn create(&self, input: EmployeeInput, _user_id: i32) -> Result<employee::Model, DomainError> {
        let input = input.normalized()?;
        self.validate(&input, None).await?;

        let now = now_rfc3339();
        let model = ActiveModel {
            name: Set(input.name),
            national_id: Set(input.national_id),
            email: Set(input.email),
            phone: Set(input.phone),
            department_id: Set(input.department_id),
            position: Set(input.position),
            active: Set(true),
            hired_on: Set(input
                .hired_on
                .unwrap_or_else(|| today().format("%Y-%m-%d").to_string())),
            left_on: Set(input.left_on),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn update(&self, id: i32, input: EmployeeInput) -> Result<employee::Model, DomainError> {
        let existing = self.get(id).await?;
        let input = input.normalized()?;
        self.validate(&input, Some(id)).await?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(input.name);
        active.national_id = Set(input.national_id);
        active.email = Set(input.email);
        active.phone = Set(input.phone);
        active.department_id = Set(input.department_id);
        active.position = Set(input.position);
        if let Some(hired) = input.hired_on {
            active.hired_on = Set(hired);
        }
        active.left_on = Set(input.left_on);
        active.updated_at = Set(now_rfc3339());

        Ok(active.update(&self.db).await?)
    }

    async fn toggle_active(&self, id: i32) -> Result<employee::Model, DomainError> {
        let existing = self.get(id).await?;
        let flipped = !existing.active;

        let mut active: ActiveModel = existing.into();
        active.active = Set(flipped);
        active.updated_at = Set(now_rfc3339());

        Ok(active.update(&self.db).await?)
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        self.get(id).await?;

        let in_use = assignment::Entity::find()
            .filter(assignment::Column::EmployeeId.eq(id))
            .count(&self.db)
            .await?;
        if in_use > 0 {
            return Err(DomainError::BusinessRule(format!(
                "The employee appears in {} assignment(s); deactivate them instead",
                in_use
            )));
        }

        Employee::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}
