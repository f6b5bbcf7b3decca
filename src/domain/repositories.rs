//! Repository trait definitions
//!
//! Master data (categories, brands, suppliers, departments, employees, locations)
//! all share the same contract. Implementations live in the infrastructure layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::DomainError;
use super::attributes::FieldDefinitions;

/// CRUD contract shared by every master-data table
#[async_trait]
pub trait CatalogRepository: Send + Sync + 'static {
    type Record: Serialize + Send;
    type Input: DeserializeOwned + Send;

    /// Singular display name used in messages
    const NAME: &'static str;

    /// List records, optionally only the active ones, ordered by name
    async fn list(&self, only_active: bool) -> Result<Vec<Self::Record>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Self::Record>, DomainError>;

    /// Create a record; `user_id` is stamped where the table tracks its creator
    async fn create(&self, input: Self::Input, user_id: i32) -> Result<Self::Record, DomainError>;

    async fn update(&self, id: i32, input: Self::Input) -> Result<Self::Record, DomainError>;

    /// Flip the `active` flag
    async fn toggle_active(&self, id: i32) -> Result<Self::Record, DomainError>;

    /// Remove a record. Refused while other rows still reference it.
    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

fn required(value: &str, field: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_email(email: &str) -> Result<(), DomainError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(DomainError::Validation(format!(
            "'{}' is not a valid e-mail address",
            email
        ))),
    }
}

/// Spanish national id: eight digits and an uppercase control letter
pub fn is_valid_national_id(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 9
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[8].is_ascii_uppercase()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    #[serde(default)]
    pub specific_fields: FieldDefinitions,
}

impl CategoryInput {
    pub fn normalized(self) -> Result<Self, DomainError> {
        let code = required(&self.code, "Code")?.to_uppercase();
        if code.chars().count() > 10 {
            return Err(DomainError::Validation(
                "Code must be at most 10 characters".to_string(),
            ));
        }
        Ok(Self {
            name: required(&self.name, "Name")?,
            code,
            description: optional(self.description),
            specific_fields: self.specific_fields,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrandInput {
    pub name: String,
}

impl BrandInput {
    pub fn normalized(self) -> Result<Self, DomainError> {
        Ok(Self {
            name: required(&self.name, "Name")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    pub tax_id: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl SupplierInput {
    pub fn normalized(self) -> Result<Self, DomainError> {
        let email = optional(self.email);
        if let Some(email) = &email {
            check_email(email)?;
        }
        Ok(Self {
            name: required(&self.name, "Name")?,
            tax_id: required(&self.tax_id, "Tax id")?.to_uppercase(),
            phone: optional(self.phone),
            email,
            address: optional(self.address),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentInput {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub manager_user_id: Option<i32>,
}

impl DepartmentInput {
    pub fn normalized(self) -> Result<Self, DomainError> {
        Ok(Self {
            name: required(&self.name, "Name")?,
            code: required(&self.code, "Code")?.to_uppercase(),
            description: optional(self.description),
            manager_user_id: self.manager_user_id,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeInput {
    pub name: String,
    pub national_id: String,
    pub email: String,
    pub phone: Option<String>,
    pub department_id: i32,
    pub position: Option<String>,
    /// `YYYY-MM-DD`; defaults to today
    pub hired_on: Option<String>,
    pub left_on: Option<String>,
}

impl EmployeeInput {
    pub fn normalized(self) -> Result<Self, DomainError> {
        let national_id = required(&self.national_id, "National id")?.to_uppercase();
        if !is_valid_national_id(&national_id) {
            return Err(DomainError::Validation(
                "National id must be 8 digits followed by an uppercase letter".to_string(),
            ));
        }
        let email = required(&self.email, "E-mail")?.to_lowercase();
        check_email(&email)?;
        Ok(Self {
            name: required(&self.name, "Name")?,
            national_id,
            email,
            phone: optional(self.phone),
            department_id: self.department_id,
            position: optional(self.position),
            hired_on: optional(self.hired_on),
            left_on: optional(self.left_on),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInput {
    pub name: String,
    pub building: Option<String>,
    pub floor: Option<String>,
    pub room: Option<String>,
    pub description: Option<String>,
}

impl LocationInput {
    pub fn normalized(self) -> Result<Self, DomainError> {
        Ok(Self {
            name: required(&self.name, "Name")?,
            building: optional(self.building),
            floor: optional(self.floor),
            room: optional(self.room),
            description: optional(self.description),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn national_id_format() {
        assert!(is_valid_national_id("12345678Z"));
        assert!(!is_valid_national_id("12345678z"));
        assert!(!is_valid_national_id("1234567Z"));
        assert!(!is_valid_national_id("123456789"));
        assert!(!is_valid_national_id("12345678ZZ"));
    }

    #[test]
    fn employee_input_is_normalized() {
        let input = EmployeeInput {
            name: "  Ana Ruiz ".into(),
            national_id: "12345678z".into(),
            email: "Ana@Example.com".into(),
            phone: Some("".into()),
            department_id: 1,
            position: None,
            hired_on: None,
            left_on: None,
        }
        .normalized()
        .unwrap();

        assert_eq!(input.name, "Ana Ruiz");
        assert_eq!(input.national_id, "12345678Z");
        assert_eq!(input.email, "ana@example.com");
        assert_eq!(input.phone, None);
    }

    #[test]
    fn category_code_length_is_limited() {
        let input = CategoryInput {
            name: "Laptops".into(),
            code: "LAPTOPS-LONG".into(),
            description: None,
            specific_fields: Default::default(),
        };
        assert!(matches!(input.normalized(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn supplier_email_is_checked() {
        let input = SupplierInput {
            name: "ACME".into(),
            tax_id: "b12345678".into(),
            phone: None,
            email: Some("nope".into()),
            address: None,
        };
        assert!(input.normalized().is_err());
    }
}
