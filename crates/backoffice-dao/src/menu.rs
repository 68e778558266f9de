//! Navigation routes and menu option trees.

use std::collections::{HashMap, HashSet};

use backoffice_core::{Menu, MenuType, SelectOption};
use backoffice_storage::ListQuery;
use serde::Serialize;
use serde_json::Value;

use crate::dao::Dao;
use crate::error::DaoError;

/// Route metadata consumed by the front-end router.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    pub title: String,
    pub icon: String,
    pub hidden: bool,
    pub keep_alive: bool,
    pub always_show: bool,
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub path: String,
    /// Route names are the paths, which are unique per tree.
    pub name: String,
    pub component: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub redirect: String,
    pub meta: RouteMeta,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Route>,
}

impl From<&Menu> for Route {
    fn from(menu: &Menu) -> Self {
        Self {
            path: menu.path.clone(),
            name: menu.path.clone(),
            component: menu.component.clone(),
            redirect: menu.redirect.clone(),
            meta: RouteMeta {
                title: menu.name.clone(),
                icon: menu.icon.clone(),
                hidden: menu.visible != 1,
                keep_alive: menu.keep_alive == 1,
                always_show: menu.always_show == 1,
                params: menu.params.clone(),
            },
            children: Vec::new(),
        }
    }
}

/// Menus grouped by parent, each group in `sort` order.
struct MenuTree<'a> {
    children: HashMap<u64, Vec<&'a Menu>>,
}

impl<'a> MenuTree<'a> {
    /// `menus` must already be sorted; `keep` filters every level.
    fn new(menus: &'a [Menu], keep: impl Fn(&Menu) -> bool) -> Self {
        let mut children: HashMap<u64, Vec<&'a Menu>> = HashMap::new();
        for menu in menus.iter().filter(|m| keep(m)) {
            children.entry(menu.parent_id).or_default().push(menu);
        }
        Self { children }
    }

    fn build<T>(&self, parent_id: u64, node: &impl Fn(&Menu, Vec<T>) -> T) -> Vec<T> {
        self.build_guarded(parent_id, node, &mut HashSet::new())
    }

    fn build_guarded<T>(
        &self,
        parent_id: u64,
        node: &impl Fn(&Menu, Vec<T>) -> T,
        visited: &mut HashSet<u64>,
    ) -> Vec<T> {
        let Some(menus) = self.children.get(&parent_id) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(menus.len());
        for menu in menus {
            // a parent_id cycle would recurse forever
            if !visited.insert(menu.id) {
                continue;
            }
            let children = self.build_guarded(menu.id, node, visited);
            out.push(node(menu, children));
        }
        out
    }
}

/// Route tree rooted at `parent_id = 0`. A menu is only reachable when its
/// parent is too.
pub fn build_routes(menus: &[Menu], allowed: Option<&HashSet<u64>>) -> Vec<Route> {
    let tree = MenuTree::new(menus, |m| allowed.is_none_or(|ids| ids.contains(&m.id)));
    tree.build(0, &|menu, children| Route {
        children,
        ..Route::from(menu)
    })
}

/// Option tree rooted at `parent_id = 0`; `only_parent` keeps catalogs and
/// pages, dropping buttons and external links.
pub fn build_options(menus: &[Menu], only_parent: bool) -> Vec<SelectOption> {
    let tree = MenuTree::new(menus, |m| {
        !only_parent || matches!(m.menu_type, Some(MenuType::Catalog | MenuType::Menu))
    });
    tree.build(0, &|menu, children| {
        SelectOption::new(menu.name.clone(), menu.id).with_children(children)
    })
}

impl Dao<Menu> {
    /// Every menu, ordered by `sort` then id.
    pub async fn all_sorted(&self) -> Result<Vec<Menu>, DaoError> {
        Ok(self.list(&ListQuery::all().with_sort("sort,id")).await?.list)
    }

    /// Route tree restricted to `allowed` menu ids, or every menu for `None`.
    pub async fn routes(&self, allowed: Option<&HashSet<u64>>) -> Result<Vec<Route>, DaoError> {
        let menus = self.all_sorted().await?;
        Ok(build_routes(&menus, allowed))
    }

    pub async fn options(&self, only_parent: bool) -> Result<Vec<SelectOption>, DaoError> {
        let menus = self.all_sorted().await?;
        Ok(build_options(&menus, only_parent))
    }
}
