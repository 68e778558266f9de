use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, push_int, push_text};
use crate::value::ColumnValue;

/// Key/value configuration entry, addressable by id or by `key`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub id: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub name: String,
    pub description: String,
    pub key: String,
    pub value: String,
}

impl Entity for Config {
    const NAME: &'static str = "config";
    const TABLE: &'static str = "t_config";
    const CACHE_PREFIX: &'static str = "config:";
    const SECONDARY_KEY: Option<&'static str> = Some("key");
    const COLUMNS: &'static [&'static str] = &["name", "description", "key", "value"];
    const UNIQUE_COLUMNS: &'static [&'static str] = &["key"];

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
    }

    fn values(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("name", self.name.as_str().into()),
            ("description", self.description.as_str().into()),
            ("key", self.key.as_str().into()),
            ("value", self.value.as_str().into()),
        ]
    }

    fn changes(&self) -> Vec<(&'static str, ColumnValue)> {
        let mut out = Vec::new();
        push_text(&mut out, "name", &self.name);
        push_text(&mut out, "description", &self.description);
        push_text(&mut out, "key", &self.key);
        push_text(&mut out, "value", &self.value);
        out
    }

    fn secondary_key(&self) -> Option<String> {
        (!self.key.is_empty()).then(|| self.key.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MenuType {
    Catalog,
    Menu,
    Button,
    Extlink,
}

impl MenuType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Catalog => "CATALOG",
            Self::Menu => "MENU",
            Self::Button => "BUTTON",
            Self::Extlink => "EXTLINK",
        }
    }
}

/// Navigation entry; menus form a tree through `parent_id` (0 = top level).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Menu {
    pub id: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub parent_id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub menu_type: Option<MenuType>,
    pub path: String,
    pub component: String,
    pub perm: String,
    pub sort: i32,
    pub visible: i32,
    pub icon: String,
    pub redirect: String,
    pub always_show: i32,
    pub keep_alive: i32,
    pub params: Option<Value>,
}

impl Entity for Menu {
    const NAME: &'static str = "menu";
    const TABLE: &'static str = "t_menu";
    const CACHE_PREFIX: &'static str = "menu:";
    const COLUMNS: &'static [&'static str] = &[
        "parent_id",
        "name",
        "type",
        "path",
        "component",
        "perm",
        "sort",
        "visible",
        "icon",
        "redirect",
        "always_show",
        "keep_alive",
        "params",
    ];

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
    }

    fn values(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("parent_id", self.parent_id.into()),
            ("name", self.name.as_str().into()),
            (
                "type",
                self.menu_type
                    .map_or(ColumnValue::Null, |t| t.as_str().into()),
            ),
            ("path", self.path.as_str().into()),
            ("component", self.component.as_str().into()),
            ("perm", self.perm.as_str().into()),
            ("sort", self.sort.into()),
            ("visible", self.visible.into()),
            ("icon", self.icon.as_str().into()),
            ("redirect", self.redirect.as_str().into()),
            ("always_show", self.always_show.into()),
            ("keep_alive", self.keep_alive.into()),
            (
                "params",
                self.params.clone().map_or(ColumnValue::Null, ColumnValue::Json),
            ),
        ]
    }

    fn changes(&self) -> Vec<(&'static str, ColumnValue)> {
        let mut out = Vec::new();
        push_int(&mut out, "parent_id", self.parent_id as i64);
        push_text(&mut out, "name", &self.name);
        if let Some(t) = self.menu_type {
            out.push(("type", t.as_str().into()));
        }
        push_text(&mut out, "path", &self.path);
        push_text(&mut out, "component", &self.component);
        push_text(&mut out, "perm", &self.perm);
        push_int(&mut out, "sort", i64::from(self.sort));
        push_int(&mut out, "visible", i64::from(self.visible));
        push_text(&mut out, "icon", &self.icon);
        push_text(&mut out, "redirect", &self.redirect);
        push_int(&mut out, "always_show", i64::from(self.always_show));
        push_int(&mut out, "keep_alive", i64::from(self.keep_alive));
        match &self.params {
            Some(params) if !params.is_null() => {
                out.push(("params", ColumnValue::Json(params.clone())));
            }
            _ => {}
        }
        out
    }
}

/// Back-office account. `password` holds an argon2 PHC hash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Platform {
    pub id: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub username: String,
    pub password: String,
    pub nickname: String,
    pub mobile: String,
    pub gender: Option<i32>,
    pub avatar: String,
    pub role_id: Vec<u64>,
    pub status: Option<i32>,
    pub last_time: Option<DateTime<Utc>>,
}

impl Entity for Platform {
    const NAME: &'static str = "platform";
    const TABLE: &'static str = "t_platform";
    const CACHE_PREFIX: &'static str = "platform:";
    const COLUMNS: &'static [&'static str] = &[
        "username",
        "password",
        "nickname",
        "mobile",
        "gender",
        "avatar",
        "role_id",
        "status",
        "last_time",
    ];
    const UNIQUE_COLUMNS: &'static [&'static str] = &["username"];

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
    }

    fn values(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("username", self.username.as_str().into()),
            ("password", self.password.as_str().into()),
            ("nickname", self.nickname.as_str().into()),
            ("mobile", self.mobile.as_str().into()),
            ("gender", self.gender.unwrap_or_default().into()),
            ("avatar", self.avatar.as_str().into()),
            ("role_id", ColumnValue::Json(Value::from(self.role_id.clone()))),
            ("status", self.status.unwrap_or_default().into()),
            (
                "last_time",
                self.last_time.map_or(ColumnValue::Null, ColumnValue::Timestamp),
            ),
        ]
    }

    fn changes(&self) -> Vec<(&'static str, ColumnValue)> {
        let mut out = Vec::new();
        push_text(&mut out, "username", &self.username);
        push_text(&mut out, "password", &self.password);
        push_text(&mut out, "nickname", &self.nickname);
        push_text(&mut out, "mobile", &self.mobile);
        // gender and status are optional so an explicit 0 can still be written
        if let Some(gender) = self.gender {
            out.push(("gender", gender.into()));
        }
        push_text(&mut out, "avatar", &self.avatar);
        if !self.role_id.is_empty() {
            out.push(("role_id", ColumnValue::Json(Value::from(self.role_id.clone()))));
        }
        if let Some(status) = self.status {
            out.push(("status", status.into()));
        }
        if let Some(last_time) = self.last_time {
            out.push(("last_time", last_time.into()));
        }
        out
    }
}

impl Platform {
    pub fn is_normal(&self) -> bool {
        self.status == Some(crate::entity::STATUS_NORMAL)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Role {
    pub id: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub name: String,
    pub code: String,
    pub sort: i32,
    pub status: i32,
}

impl Entity for Role {
    const NAME: &'static str = "role";
    const TABLE: &'static str = "t_role";
    const CACHE_PREFIX: &'static str = "role:";
    const COLUMNS: &'static [&'static str] = &["name", "code", "sort", "status"];

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
    }

    fn values(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("name", self.name.as_str().into()),
            ("code", self.code.as_str().into()),
            ("sort", self.sort.into()),
            ("status", self.status.into()),
        ]
    }

    fn changes(&self) -> Vec<(&'static str, ColumnValue)> {
        let mut out = Vec::new();
        push_text(&mut out, "name", &self.name);
        push_text(&mut out, "code", &self.code);
        push_int(&mut out, "sort", i64::from(self.sort));
        push_int(&mut out, "status", i64::from(self.status));
        out
    }
}

/// Binding between a role and a menu it grants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleMenu {
    pub id: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub role_id: u64,
    pub menu_id: u64,
}

impl RoleMenu {
    pub fn new(role_id: u64, menu_id: u64) -> Self {
        Self {
            role_id,
            menu_id,
            ..Default::default()
        }
    }
}

impl Entity for RoleMenu {
    const NAME: &'static str = "roleMenu";
    const TABLE: &'static str = "t_role_menu";
    const CACHE_PREFIX: &'static str = "roleMenu:";
    const COLUMNS: &'static [&'static str] = &["role_id", "menu_id"];

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
    }

    fn values(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("role_id", self.role_id.into()),
            ("menu_id", self.menu_id.into()),
        ]
    }

    fn changes(&self) -> Vec<(&'static str, ColumnValue)> {
        let mut out = Vec::new();
        push_int(&mut out, "role_id", self.role_id as i64);
        push_int(&mut out, "menu_id", self.menu_id as i64);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_changes_skip_empty_fields() {
        let patch = Config {
            id: 3,
            value: "new".into(),
            ..Default::default()
        };
        let changes = patch.changes();
        assert_eq!(changes, vec![("value", ColumnValue::Text("new".into()))]);
    }

    #[test]
    fn test_config_secondary_key() {
        let cfg = Config {
            key: "imageDomain".into(),
            ..Default::default()
        };
        assert_eq!(cfg.secondary_key().as_deref(), Some("imageDomain"));
        assert_eq!(Config::default().secondary_key(), None);
    }

    #[test]
    fn test_platform_optional_zero_is_written() {
        let patch = Platform {
            id: 1,
            status: Some(0),
            ..Default::default()
        };
        assert_eq!(patch.changes(), vec![("status", ColumnValue::Int(0))]);
    }

    #[test]
    fn test_menu_type_serde() {
        let menu: Menu = serde_json::from_str(r#"{"id":1,"type":"CATALOG","name":"System"}"#).unwrap();
        assert_eq!(menu.menu_type, Some(MenuType::Catalog));
        let json = serde_json::to_value(&menu).unwrap();
        assert_eq!(json["type"], "CATALOG");
    }

    #[test]
    fn test_columns_cover_values() {
        fn check<E: Entity + Default>() {
            for (column, _) in E::default().values() {
                assert!(E::is_column(column), "{} missing column {column}", E::NAME);
            }
        }
        check::<Config>();
        check::<Menu>();
        check::<Platform>();
        check::<Role>();
        check::<RoleMenu>();
    }
}
