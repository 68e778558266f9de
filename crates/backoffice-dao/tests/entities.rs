//! Entity-specific helpers built on the generic DAO.

mod common;

use backoffice_core::{Config, Menu, MenuType, OptionValue, Platform, Role, RoleMenu};
use backoffice_dao::{Daos, IMAGE_DOMAIN_KEY};
use common::{CountingStore, daos};

async fn seed_menus(daos: &Daos) -> Vec<Menu> {
    let specs = [
        (0, 1, "System", "/system", MenuType::Catalog, ""),
        (1, 1, "Users", "/system/users", MenuType::Menu, "sys:user:list"),
        (2, 1, "Add user", "", MenuType::Button, "sys:user:add"),
        (1, 2, "Roles", "/system/roles", MenuType::Menu, "sys:role:list"),
        (0, 2, "Docs", "https://docs.example.com", MenuType::Extlink, "sys:user:list"),
    ];
    let mut created: Vec<Menu> = Vec::new();
    for (parent, sort, name, path, menu_type, perm) in specs {
        // parent indexes are 1-based positions in `created`
        let parent_id = if parent == 0 { 0 } else { created[parent - 1].id };
        let menu = Menu {
            parent_id,
            sort,
            name: name.into(),
            path: path.into(),
            menu_type: Some(menu_type),
            perm: perm.into(),
            visible: 1,
            ..Default::default()
        };
        created.push(daos.menu.create(&menu).await.unwrap());
    }
    created
}

#[tokio::test]
async fn test_replace_for_role_rebinds_menus() {
    let store = CountingStore::new();
    let daos = daos(&store, true);

    daos.role_menu.replace_for_role(1, &[3, 2, 2, 0]).await.unwrap();
    assert_eq!(daos.role_menu.menu_ids(1).await.unwrap(), vec![2, 3]);

    daos.role_menu.replace_for_role(1, &[5]).await.unwrap();
    assert_eq!(daos.role_menu.menu_ids(1).await.unwrap(), vec![5]);

    daos.role_menu.replace_for_role(1, &[]).await.unwrap();
    assert!(daos.role_menu.menu_ids(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_replace_for_role_leaves_other_roles() {
    let store = CountingStore::new();
    let daos = daos(&store, true);
    daos.role_menu.create(&RoleMenu::new(2, 9)).await.unwrap();

    daos.role_menu.replace_for_role(1, &[4]).await.unwrap();
    assert_eq!(daos.role_menu.menu_ids(2).await.unwrap(), vec![9]);
    assert_eq!(
        daos.role_menu.menu_ids_for_roles(&[1, 2]).await.unwrap(),
        vec![4, 9]
    );
}

#[tokio::test]
async fn test_replace_for_role_rejects_zero_role() {
    let store = CountingStore::new();
    let daos = daos(&store, false);
    let err = daos.role_menu.replace_for_role(0, &[1]).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_role_permissions_are_distinct_and_sorted() {
    let store = CountingStore::new();
    let daos = daos(&store, true);
    let menus = seed_menus(&daos).await;
    let ids: Vec<u64> = menus.iter().map(|m| m.id).collect();
    daos.role_menu.replace_for_role(1, &ids).await.unwrap();

    let perms = daos.role_permissions(&[1]).await.unwrap();
    assert_eq!(perms, vec!["sys:role:list", "sys:user:add", "sys:user:list"]);
    assert!(daos.role_permissions(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_routes_filtered_by_role() {
    let store = CountingStore::new();
    let daos = daos(&store, true);
    let menus = seed_menus(&daos).await;

    let all = daos.routes(&[]).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].meta.title, "System");
    assert_eq!(all[0].children.len(), 2);
    assert_eq!(all[0].children[0].path, "/system/users");

    // System and Roles only
    daos.role_menu
        .replace_for_role(7, &[menus[0].id, menus[3].id])
        .await
        .unwrap();
    let limited = daos.routes(&[7]).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].children.len(), 1);
    assert_eq!(limited[0].children[0].path, "/system/roles");
}

#[tokio::test]
async fn test_menu_options_only_parent() {
    let store = CountingStore::new();
    let daos = daos(&store, false);
    seed_menus(&daos).await;

    let all = daos.menu.options(false).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].children[0].children.len(), 1);

    let parents = daos.menu.options(true).await.unwrap();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].label, "System");
    assert!(parents[0].children.iter().all(|c| c.children.is_empty()));
}

#[tokio::test]
async fn test_make_path_uses_configured_domain() {
    let store = CountingStore::new();
    let daos = daos(&store, true);
    daos.config
        .create(&Config {
            name: "Image domain".into(),
            key: IMAGE_DOMAIN_KEY.into(),
            value: "https://cdn.example.com/".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(
        daos.config.make_path("/up/a.png", IMAGE_DOMAIN_KEY).await,
        "https://cdn.example.com/up/a.png"
    );
    assert_eq!(
        daos.config.make_path("https://other/x.png", IMAGE_DOMAIN_KEY).await,
        "https://other/x.png"
    );
    assert_eq!(store.reads(), 1, "the domain lookup is cached");
}

#[tokio::test]
async fn test_make_path_without_domain_stays_relative() {
    let store = CountingStore::new();
    let daos = daos(&store, true);
    assert_eq!(daos.config.make_path("/up/a.png", IMAGE_DOMAIN_KEY).await, "up/a.png");
    assert_eq!(daos.config.make_path("", IMAGE_DOMAIN_KEY).await, "");
}

#[tokio::test]
async fn test_get_by_username_reads_store() {
    let store = CountingStore::new();
    let daos = daos(&store, true);
    let admin = daos
        .platform
        .create(&Platform {
            username: "admin".into(),
            nickname: "Administrator".into(),
            role_id: vec![1],
            status: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(daos.platform.get_by_username("admin").await.unwrap().id, admin.id);
    assert_eq!(daos.platform.get_by_username("admin").await.unwrap().id, admin.id);
    assert_eq!(store.reads(), 2);

    assert!(daos.platform.get_by_username("nobody").await.unwrap_err().is_not_found());
    assert!(daos.platform.get_by_username("").await.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_role_options_and_codes() {
    let store = CountingStore::new();
    let daos = daos(&store, true);
    let mut ids = Vec::new();
    for (name, code, sort, status) in [
        ("Editor", "editor", 2, 1),
        ("Admin", "admin", 1, 1),
        ("Retired", "retired", 0, 0),
    ] {
        let role = daos
            .role
            .create(&Role {
                name: name.into(),
                code: code.into(),
                sort,
                status,
                ..Default::default()
            })
            .await
            .unwrap();
        ids.push(role.id);
    }

    let options = daos.role.options().await.unwrap();
    let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["Admin", "Editor"]);
    assert_eq!(options[0].value, OptionValue::from(ids[1]));

    let codes = daos.role.codes(&[ids[2], 999, ids[0]]).await.unwrap();
    assert_eq!(codes, vec!["retired", "editor"]);
}
