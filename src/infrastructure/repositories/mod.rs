//! Repository implementations using SeaORM

pub mod brand_repository;
pub mod category_repository;
pub mod department_repository;
pub mod employee_repository;
pub mod location_repository;
pub mod supplier_repository;

pub use brand_repository::SeaOrmBrandRepository;
pub use category_repository::SeaOrmCategoryRepository;
pub use department_repository::SeaOrmDepartmentRepository;
pub use employee_repository::SeaOrmEmployeeRepository;
pub use location_repository::SeaOrmLocationRepository;
pub use supplier_repository::SeaOrmSupplierRepository;
