pub mod product;

pub use product::{validate_columns, ProductForm, ProductPatch, Visibility, TITLE_COLUMN, VISIBILITY_COLUMN};
