//! Product types: custom field sets linked to categories, a per-type serial
//! counter, and the per-product custom data those fields describe.

use sea_orm::*;
use serde::{Deserialize, Serialize};

use super::Actor;
use crate::domain::DomainError;
use crate::domain::attributes::{
    Attributes, FieldDefinitions, definitions_to_json_text, parse_attributes, parse_definitions,
    retain_defined, to_json_text, validate_against,
};
use crate::domain::identifiers::sequential_serial;
use crate::models::product_type::{self, Entity as ProductType};
use crate::models::{category, custom_data, product, product_type_category};
use crate::utils::dates::now_rfc3339;

#[derive(Debug, Clone, Deserialize)]
pub struct ProductTypeInput {
    pub name: String,
    pub code_prefix: String,
    pub description: Option<String>,
    #[serde(default)]
    pub custom_fields: FieldDefinitions,
    #[serde(default)]
    pub category_ids: Vec<i32>,
}

impl ProductTypeInput {
    fn normalized(mut self) -> Result<Self, DomainError> {
        self.name = self.name.trim().to_string();
        self.code_prefix = self.code_prefix.trim().to_uppercase();
        if self.name.is_empty() || self.code_prefix.is_empty() {
            return Err(DomainError::Validation(
                "Name and code prefix are required".to_string(),
            ));
        }
        if self.code_prefix.chars().count() > 10 {
            return Err(DomainError::Validation(
                "Code prefix must be at most 10 characters".to_string(),
            ));
        }
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.category_ids.sort_unstable();
        self.category_ids.dedup();
        Ok(self)
    }
}

#[derive(Debug, Serialize)]
pub struct ProductTypeView {
    #[serde(flatten)]
    pub product_type: product_type::Model,
    pub fields: FieldDefinitions,
    pub category_ids: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomDataInput {
    pub product_type_id: i32,
    #[serde(default)]
    pub data: Attributes,
}

#[derive(Debug, Serialize)]
pub struct CustomDataView {
    pub product_id: i32,
    pub product_type_id: i32,
    pub product_type_name: String,
    pub fields: FieldDefinitions,
    pub data: Attributes,
    pub updated_at: String,
}

async fn linked_categories<C: ConnectionTrait>(conn: &C, type_id: i32) -> Result<Vec<i32>, DomainError> {
    Ok(product_type_category::Entity::find()
        .filter(product_type_category::Column::ProductTypeId.eq(type_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|link| link.category_id)
        .collect())
}

async fn view<C: ConnectionTrait>(conn: &C, model: product_type::Model) -> Result<ProductTypeView, DomainError> {
    let category_ids = linked_categories(conn, model.id).await?;
    Ok(ProductTypeView {
        fields: parse_definitions(&model.custom_fields),
        category_ids,
        product_type: model,
    })
}

async fn find_type(db: &DatabaseConnection, id: i32) -> Result<product_type::Model, DomainError> {
    ProductType::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Product type"))
}

async fn check_unique(
    db: &DatabaseConnection,
    input: &ProductTypeInput,
    exclude: Option<i32>,
) -> Result<(), DomainError> {
    let mut clash = Condition::any()
        .add(product_type::Column::Name.eq(input.name.as_str()))
        .add(product_type::Column::CodePrefix.eq(input.code_prefix.as_str()));
    if let Some(id) = exclude {
        clash = Condition::all().add(clash).add(product_type::Column::Id.ne(id));
    }

    if let Some(existing) = ProductType::find().filter(clash).one(db).await? {
        let field = if existing.name == input.name { "name" } else { "code prefix" };
        return Err(DomainError::Validation(format!(
            "A product type with this {} already exists",
            field
        )));
    }
    Ok(())
}

async fn check_categories(db: &DatabaseConnection, ids: &[i32]) -> Result<(), DomainError> {
    if ids.is_empty() {
        return Ok(());
    }
    let found = category::Entity::find()
        .filter(category::Column::Id.is_in(ids.to_vec()))
        .count(db)
        .await?;
    if found != ids.len() as u64 {
        return Err(DomainError::Validation(
            "One or more categories do not exist".to_string(),
        ));
    }
    Ok(())
}

async fn replace_links<C: ConnectionTrait>(conn: &C, type_id: i32, category_ids: &[i32]) -> Result<(), DomainError> {
    product_type_category::Entity::delete_many()
        .filter(product_type_category::Column::ProductTypeId.eq(type_id))
        .exec(conn)
        .await?;

    if category_ids.is_empty() {
        return Ok(());
    }
    let links = category_ids.iter().map(|cid| product_type_category::ActiveModel {
        product_type_id: Set(type_id),
        category_id: Set(*cid),
    });
    product_type_category::Entity::insert_many(links)
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn list_types(db: &DatabaseConnection, only_active: bool) -> Result<Vec<ProductTypeView>, DomainError> {
    let mut query = ProductType::find();
    if only_active {
        query = query.filter(product_type::Column::Active.eq(true));
    }
    let types = query
        .order_by_asc(product_type::Column::Name)
        .all(db)
        .await?;

    let mut views = Vec::with_capacity(types.len());
    for model in types {
        views.push(view(db, model).await?);
    }
    Ok(views)
}

pub async fn get_type(db: &DatabaseConnection, id: i32) -> Result<ProductTypeView, DomainError> {
    let model = find_type(db, id).await?;
    view(db, model).await
}

pub async fn create_type(
    db: &DatabaseConnection,
    input: ProductTypeInput,
    actor: &Actor,
) -> Result<ProductTypeView, DomainError> {
    let input = input.normalized()?;
    check_unique(db, &input, None).await?;
    check_categories(db, &input.category_ids).await?;

    let now = now_rfc3339();
    let txn = db.begin().await?;
    let saved = product_type::ActiveModel {
        name: Set(input.name),
        code_prefix: Set(input.code_prefix),
        description: Set(input.description),
        custom_fields: Set(definitions_to_json_text(&input.custom_fields)),
        last_number: Set(0),
        active: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    replace_links(&txn, saved.id, &input.category_ids).await?;
    let result = view(&txn, saved).await?;
    txn.commit().await?;

    tracing::info!(user = %actor.username, action = "PRODUCT_TYPE_CREATED", name = %result.product_type.name);
    Ok(result)
}

/// Replace name, prefix, fields and category links. The counter is left alone.
pub async fn update_type(
    db: &DatabaseConnection,
    id: i32,
    input: ProductTypeInput,
    actor: &Actor,
) -> Result<ProductTypeView, DomainError> {
    let existing = find_type(db, id).await?;
    let input = input.normalized()?;
    check_unique(db, &input, Some(id)).await?;
    check_categories(db, &input.category_ids).await?;

    let txn = db.begin().await?;
    let mut active: product_type::ActiveModel = existing.into();
    active.name = Set(input.name);
    active.code_prefix = Set(input.code_prefix);
    active.description = Set(input.description);
    active.custom_fields = Set(definitions_to_json_text(&input.custom_fields));
    active.updated_at = Set(now_rfc3339());
    let saved = active.update(&txn).await?;
    replace_links(&txn, id, &input.category_ids).await?;
    let result = view(&txn, saved).await?;
    txn.commit().await?;

    tracing::info!(user = %actor.username, action = "PRODUCT_TYPE_UPDATED", product_type_id = id);
    Ok(result)
}

/// Refused while any product still carries custom data of this type
pub async fn delete_type(db: &DatabaseConnection, id: i32, actor: &Actor) -> Result<(), DomainError> {
    let existing = find_type(db, id).await?;

    let in_use = custom_data::Entity::find()
        .filter(custom_data::Column::ProductTypeId.eq(id))
        .count(db)
        .await?;
    if in_use > 0 {
        return Err(DomainError::BusinessRule(format!(
            "Product type '{}' is used by {} product(s)",
            existing.name, in_use
        )));
    }

    let txn = db.begin().await?;
    replace_links(&txn, id, &[]).await?;
    ProductType::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(user = %actor.username, action = "PRODUCT_TYPE_DELETED", name = %existing.name);
    Ok(())
}

/// First active type linked to the category, by name
pub async fn detect_for_category(
    db: &DatabaseConnection,
    category_id: i32,
) -> Result<Option<ProductTypeView>, DomainError> {
    let found = ProductType::find()
        .inner_join(product_type_category::Entity)
        .filter(product_type_category::Column::CategoryId.eq(category_id))
        .filter(product_type::Column::Active.eq(true))
        .order_by_asc(product_type::Column::Name)
        .one(db)
        .await?;

    match found {
        Some(model) => Ok(Some(view(db, model).await?)),
        None => Ok(None),
    }
}

/// Advance the type's counter and format the new value.
///
/// Increment and read happen in a single statement, so concurrent callers
/// never see the same number.
pub async fn next_serial(db: &DatabaseConnection, type_id: i32) -> Result<String, DomainError> {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_sql_and_values(
            backend,
            r#"UPDATE product_types
               SET last_number = last_number + 1, updated_at = ?
               WHERE id = ? AND active = 1
               RETURNING last_number, code_prefix"#,
            vec![now_rfc3339().into(), type_id.into()],
        ))
        .await?
        .ok_or_else(|| DomainError::not_found("Product type"))?;

    let number: i32 = row.try_get("", "last_number")?;
    let prefix: String = row.try_get("", "code_prefix")?;
    tracing::debug!(type_id, number, "product type counter advanced");
    Ok(sequential_serial(&prefix, number))
}

pub async fn get_custom_data(
    db: &DatabaseConnection,
    product_id: i32,
) -> Result<Option<CustomDataView>, DomainError> {
    let found = custom_data::Entity::find()
        .filter(custom_data::Column::ProductId.eq(product_id))
        .find_also_related(ProductType)
        .one(db)
        .await?;

    Ok(found.map(|(row, ptype)| {
        let (name, fields) = ptype
            .map(|t| (t.name, parse_definitions(&t.custom_fields)))
            .unwrap_or_default();
        CustomDataView {
            product_id: row.product_id,
            product_type_id: row.product_type_id,
            product_type_name: name,
            fields,
            data: parse_attributes(&row.data),
            updated_at: row.updated_at,
        }
    }))
}

/// Store a product's custom data, replacing any previous row
pub async fn save_custom_data(
    db: &DatabaseConnection,
    product_id: i32,
    input: CustomDataInput,
    actor: &Actor,
) -> Result<CustomDataView, DomainError> {
    product::Entity::find_by_id(product_id)
        .filter(product::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Product"))?;
    let ptype = ProductType::find_by_id(input.product_type_id)
        .filter(product_type::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Product type"))?;

    let fields = parse_definitions(&ptype.custom_fields);
    let problems = validate_against(&fields, &input.data);
    if !problems.is_empty() {
        return Err(DomainError::Validation(problems.join("; ")));
    }
    let data = retain_defined(input.data, &fields);

    let now = now_rfc3339();
    let existing = custom_data::Entity::find()
        .filter(custom_data::Column::ProductId.eq(product_id))
        .one(db)
        .await?;
    let saved = match existing {
        Some(row) => {
            let mut active: custom_data::ActiveModel = row.into();
            active.product_type_id = Set(ptype.id);
            active.data = Set(to_json_text(&data));
            active.updated_at = Set(now);
            active.update(db).await?
        }
        None => {
            custom_data::ActiveModel {
                product_id: Set(product_id),
                product_type_id: Set(ptype.id),
                data: Set(to_json_text(&data)),
                created_at: Set(now.clone()),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    tracing::info!(user = %actor.username, action = "CUSTOM_DATA_SAVED", product_id, product_type = %ptype.name);

    Ok(CustomDataView {
        product_id,
        product_type_id: ptype.id,
        product_type_name: ptype.name,
        fields,
        data,
        updated_at: saved.updated_at,
    })
}
