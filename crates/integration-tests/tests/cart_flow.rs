//! Cart mutations against the stub backend: every write is followed by a
//! full refetch and local state always mirrors the last server response.

use clementine_client::api::CartAction;
use clementine_client::session::{Credentials, MemorySessionStore};
use clementine_client::{ClientError, Config, NoticeLevel, Storefront};
use clementine_core::{ProductId, Role};
use clementine_integration_tests::{StubCommerce, USER_EMAIL, USER_PASSWORD};
use rust_decimal::Decimal;

async fn logged_in_user(stub: &StubCommerce) -> Storefront {
    let store = Storefront::with_persistence(
        Config::new(stub.url()),
        Box::new(MemorySessionStore::new()),
    )
    .expect("client");
    store.init().await;
    store
        .login(
            Role::User,
            &Credentials {
                email: USER_EMAIL.to_owned(),
                password: USER_PASSWORD.to_owned(),
            },
        )
        .await
        .expect("login");
    store
}

#[tokio::test]
async fn test_add_to_cart_reflects_server_totals() {
    let stub = StubCommerce::spawn().await;
    let store = logged_in_user(&stub).await;
    let teapot = ProductId::new("p1");

    let state = store.cart().add_to_cart(&teapot).await.expect("first add");
    assert_eq!(state.total_quantity, 1);
    assert_eq!(state.sub_total, Decimal::from(10));

    // Same product again merges into the existing line.
    let state = store.cart().add_to_cart(&teapot).await.expect("second add");
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].quantity, 2);
    assert_eq!(state.total_quantity, 2);
    assert_eq!(state.sub_total, Decimal::from(20));
}

#[tokio::test]
async fn test_mixed_cart_sums_across_lines() {
    let stub = StubCommerce::spawn().await;
    let store = logged_in_user(&stub).await;

    store
        .cart()
        .add_to_cart(&ProductId::new("p1"))
        .await
        .expect("add teapot");
    let state = store
        .cart()
        .add_to_cart(&ProductId::new("p2"))
        .await
        .expect("add mug");

    assert_eq!(state.items.len(), 2);
    assert_eq!(state.total_quantity, 2);
    // 10 + 2.50
    assert_eq!(state.sub_total, Decimal::new(1250, 2));
}

#[tokio::test]
async fn test_increment_then_decrement_restores_quantity() {
    let stub = StubCommerce::spawn().await;
    let store = logged_in_user(&stub).await;

    let state = store
        .cart()
        .add_to_cart(&ProductId::new("p1"))
        .await
        .expect("add");
    let item_id = state.items[0].item_id.clone();
    let mut rx = store.notices().subscribe();

    let state = store
        .cart()
        .update_cart(CartAction::Increment, &item_id)
        .await
        .expect("increment");
    assert_eq!(state.items[0].quantity, 2);

    // Quantity changes announce themselves like every other mutation.
    let notice = rx.try_recv().expect("success notice");
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.message, "Cart updated");

    let state = store
        .cart()
        .update_cart(CartAction::Decrement, &item_id)
        .await
        .expect("decrement");
    assert_eq!(state.items[0].quantity, 1);
    assert_eq!(state.sub_total, Decimal::from(10));
}

#[tokio::test]
async fn test_decrement_to_zero_reflects_server_removal() {
    let stub = StubCommerce::spawn().await;
    let store = logged_in_user(&stub).await;

    let state = store
        .cart()
        .add_to_cart(&ProductId::new("p2"))
        .await
        .expect("add");
    let item_id = state.items[0].item_id.clone();

    // The server removes a line decremented past one; the refetch mirrors it.
    let state = store
        .cart()
        .update_cart(CartAction::Decrement, &item_id)
        .await
        .expect("decrement");
    assert!(state.is_empty());
    assert_eq!(state.sub_total, Decimal::ZERO);
}

#[tokio::test]
async fn test_remove_from_cart() {
    let stub = StubCommerce::spawn().await;
    let store = logged_in_user(&stub).await;

    store
        .cart()
        .add_to_cart(&ProductId::new("p1"))
        .await
        .expect("add teapot");
    let state = store
        .cart()
        .add_to_cart(&ProductId::new("p2"))
        .await
        .expect("add mug");
    let mug_line = state
        .items
        .iter()
        .find(|i| i.product_id == ProductId::new("p2"))
        .expect("mug line")
        .item_id
        .clone();

    let state = store
        .cart()
        .remove_from_cart(&mug_line)
        .await
        .expect("remove");
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].product_id, ProductId::new("p1"));
}

#[tokio::test]
async fn test_failed_write_keeps_last_state_and_surfaces_notice() {
    let stub = StubCommerce::spawn().await;
    let store = logged_in_user(&stub).await;

    let before = store
        .cart()
        .add_to_cart(&ProductId::new("p1"))
        .await
        .expect("add");
    let mut rx = store.notices().subscribe();

    stub.fail_next_cart_write().await;
    let err = store
        .cart()
        .add_to_cart(&ProductId::new("p1"))
        .await
        .expect_err("write must fail");
    assert!(matches!(err, ClientError::Network(_)));

    // The last successfully fetched state is still displayed.
    let after = store.cart().state().await;
    assert_eq!(after.total_quantity, before.total_quantity);
    assert_eq!(after.sub_total, before.sub_total);

    let notice = rx.try_recv().expect("error notice");
    assert_eq!(notice.level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_cart_requires_a_session() {
    let stub = StubCommerce::spawn().await;
    let store = Storefront::with_persistence(
        Config::new(stub.url()),
        Box::new(MemorySessionStore::new()),
    )
    .expect("client");
    store.init().await;

    let err = store
        .cart()
        .add_to_cart(&ProductId::new("p1"))
        .await
        .expect_err("no session");
    assert!(matches!(err, ClientError::Auth(_)));
    assert!(!stub.saw_request("POST /api/cart/add").await);
}
