pub mod entity;
pub mod error;
pub mod model;
pub mod options;
pub mod path;
pub mod value;

pub use entity::{Entity, PLACEHOLDER_TTL, DEFAULT_ENTITY_TTL, STATUS_NORMAL};
pub use error::{CoreError, Result};
pub use model::{Config, Menu, MenuType, Platform, Role, RoleMenu};
pub use options::{EnumRegistry, OptionValue, SelectOption};
pub use path::make_image_path;
pub use value::ColumnValue;
