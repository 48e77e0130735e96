#[allow(dead_code)]
mod common;

use futures::SinkExt;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use huddle_core::net::messages::{AnnouncementMsg, Message};

use common::{
    TestServer, is_clock_timestamp, ws_join, ws_read_msg, ws_send_action, ws_send_chat,
    ws_send_msg, ws_send_text, ws_try_read_msg,
};

fn expect_announcement(msg: Message) -> (&'static str, AnnouncementMsg) {
    match msg {
        Message::Welcome(a) => ("welcome", a),
        Message::PlayerJoined(a) => ("player_joined", a),
        Message::PlayerLeft(a) => ("player_left", a),
        other => panic!("Expected an announcement, got: {other:?}"),
    }
}

#[tokio::test]
async fn alice_and_bob_session() {
    let server = TestServer::new().await;

    // Alice joins alone
    let (mut alice, welcome) = ws_join(&server, "Alice").await;
    let (kind, a) = expect_announcement(welcome);
    assert_eq!(kind, "welcome");
    assert_eq!(a.message, "Welcome Alice! You're connected to the game.");
    assert_eq!(a.players_count, 1);

    // Bob joins; Alice hears about it
    let (mut bob, welcome) = ws_join(&server, "Bob").await;
    let (kind, b) = expect_announcement(welcome);
    assert_eq!(kind, "welcome");
    assert_eq!(b.players_count, 2);

    let (kind, joined) = expect_announcement(ws_read_msg(&mut alice).await);
    assert_eq!(kind, "player_joined");
    assert_eq!(joined.message, "Bob joined the game!");
    assert_eq!(joined.players_count, 2);

    // Alice chats; Bob receives it stamped with her name
    ws_send_chat(&mut alice, "hi").await;
    match ws_read_msg(&mut bob).await {
        Message::Chat(chat) => {
            assert_eq!(chat.player.as_deref(), Some("Alice"));
            assert_eq!(chat.message, "hi");
            assert!(is_clock_timestamp(chat.timestamp.as_deref().unwrap()));
        },
        other => panic!("Expected Chat, got: {other:?}"),
    }

    // The sender gets the echo too; suppression is the client's job
    match ws_read_msg(&mut alice).await {
        Message::Chat(chat) => assert_eq!(chat.player.as_deref(), Some("Alice")),
        other => panic!("Expected Chat echo, got: {other:?}"),
    }

    // Bob leaves
    drop(bob);
    let (kind, left) = expect_announcement(ws_read_msg(&mut alice).await);
    assert_eq!(kind, "player_left");
    assert_eq!(left.message, "Bob left the game.");
    assert_eq!(left.players_count, 1);

    // Exactly one departure announcement
    assert!(ws_try_read_msg(&mut alice, 300).await.is_none());
    assert_eq!(server.player_count().await, 1);
}

#[tokio::test]
async fn new_player_does_not_see_own_join() {
    let server = TestServer::new().await;
    let (_alice, _) = ws_join(&server, "Alice").await;
    let (mut bob, _) = ws_join(&server, "Bob").await;

    assert!(ws_try_read_msg(&mut bob, 200).await.is_none());
}

#[tokio::test]
async fn game_action_relayed_to_everyone() {
    let server = TestServer::new().await;
    let (mut alice, _) = ws_join(&server, "Alice").await;
    let (mut bob, _) = ws_join(&server, "Bob").await;
    let _ = ws_read_msg(&mut alice).await; // player_joined

    ws_send_action(&mut bob, "opens the treasure chest").await;

    for stream in [&mut alice, &mut bob] {
        match ws_read_msg(stream).await {
            Message::GameAction(action) => {
                assert_eq!(action.player.as_deref(), Some("Bob"));
                assert_eq!(action.action, "opens the treasure chest");
                assert!(is_clock_timestamp(action.timestamp.as_deref().unwrap()));
            },
            other => panic!("Expected GameAction, got: {other:?}"),
        }
    }
}

#[tokio::test]
async fn client_supplied_player_field_is_overwritten() {
    let server = TestServer::new().await;
    let (mut alice, _) = ws_join(&server, "Alice").await;
    let (mut bob, _) = ws_join(&server, "Bob").await;
    let _ = ws_read_msg(&mut alice).await; // player_joined

    ws_send_text(
        &mut bob,
        r#"{"type":"chat","player":"Alice","message":"trust me","timestamp":"00:00:00"}"#,
    )
    .await;

    match ws_read_msg(&mut alice).await {
        Message::Chat(chat) => {
            assert_eq!(chat.player.as_deref(), Some("Bob"));
            assert_eq!(chat.message, "trust me");
            assert_ne!(chat.timestamp.as_deref(), Some("00:00:00"));
        },
        other => panic!("Expected Chat, got: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_message_keeps_connection_alive() {
    let server = TestServer::new().await;
    let (mut alice, _) = ws_join(&server, "Alice").await;
    let (mut bob, _) = ws_join(&server, "Bob").await;
    let _ = ws_read_msg(&mut alice).await; // player_joined

    ws_send_text(&mut bob, "this is not json").await;
    ws_send_text(&mut bob, r#"{"type":"chat"}"#).await;
    ws_send_text(&mut bob, r#"{"type":"teleport","to":"moon"}"#).await;
    ws_send_chat(&mut bob, "still here").await;

    match ws_read_msg(&mut alice).await {
        Message::Chat(chat) => assert_eq!(chat.message, "still here"),
        other => panic!("Expected Chat, got: {other:?}"),
    }
    assert_eq!(server.player_count().await, 2);
}

#[tokio::test]
async fn server_only_types_from_clients_are_ignored() {
    let server = TestServer::new().await;
    let (mut alice, _) = ws_join(&server, "Alice").await;
    let (mut bob, _) = ws_join(&server, "Bob").await;
    let _ = ws_read_msg(&mut alice).await; // player_joined

    ws_send_msg(&mut bob, &Message::player_left("Alice", 0)).await;
    ws_send_msg(&mut bob, &Message::join("Bobby")).await;

    assert!(ws_try_read_msg(&mut alice, 300).await.is_none());
    assert_eq!(server.player_count().await, 2);
    let names = server.state.registry.read().await.names();
    assert_eq!(names, vec!["Alice", "Bob"]);
}

#[tokio::test]
async fn binary_frames_are_accepted() {
    let server = TestServer::new().await;
    let (mut alice, _) = ws_join(&server, "Alice").await;

    let payload = br#"{"type":"chat","message":"in binary"}"#.to_vec();
    alice
        .send(WsMessage::Binary(payload.into()))
        .await
        .unwrap();

    match ws_read_msg(&mut alice).await {
        Message::Chat(chat) => assert_eq!(chat.message, "in binary"),
        other => panic!("Expected Chat, got: {other:?}"),
    }
}

#[tokio::test]
async fn messages_from_one_sender_arrive_in_order() {
    let server = TestServer::new().await;
    let (mut alice, _) = ws_join(&server, "Alice").await;
    let (mut bob, _) = ws_join(&server, "Bob").await;
    let _ = ws_read_msg(&mut alice).await; // player_joined

    for i in 0..20 {
        ws_send_chat(&mut alice, &format!("msg {i}")).await;
    }
    for i in 0..20 {
        match ws_read_msg(&mut bob).await {
            Message::Chat(chat) => assert_eq!(chat.message, format!("msg {i}")),
            other => panic!("Expected Chat, got: {other:?}"),
        }
    }
}

#[tokio::test]
async fn rate_limited_messages_are_dropped() {
    let mut config = huddle_server::config::ServerConfig::default();
    config.limits.rate_limit_per_sec = 2.0;
    let server = TestServer::from_config(config).await;
    let (mut alice, _) = ws_join(&server, "Alice").await;

    for i in 0..5 {
        ws_send_chat(&mut alice, &format!("burst {i}")).await;
    }

    let mut received = 0;
    while ws_try_read_msg(&mut alice, 300).await.is_some() {
        received += 1;
    }
    assert!(received >= 2 && received < 5, "received {received}");
    assert_eq!(server.player_count().await, 1);
}
