use super::*;

#[tokio::test]
async fn subscribers_receive_events_in_order() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    bus.emit(ClientEvent::Unauthorized { generation: 1, path: "/api/user/info".to_owned() });
    bus.emit(ClientEvent::RequestFailed { path: "/api/x".to_owned(), status: 500, message: "boom".to_owned() });

    assert_eq!(
        rx.recv().await.unwrap(),
        ClientEvent::Unauthorized { generation: 1, path: "/api/user/info".to_owned() }
    );
    assert!(matches!(rx.recv().await.unwrap(), ClientEvent::RequestFailed { status: 500, .. }));
}

#[test]
fn emit_without_subscribers_is_silent() {
    let bus = EventBus::new();
    bus.emit(ClientEvent::RequestFailed { path: "/".to_owned(), status: 0, message: "x".to_owned() });
}
