//! End-to-end tests: real sockets, real time.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use slow_request_monitor::config::{ClientConfig, MonitorConfig};
use slow_request_monitor::error::ClientError;
use slow_request_monitor::http::slow_backend;
use slow_request_monitor::monitor::{NavigationState, Visibility};
use slow_request_monitor::{MonitoredClient, Shutdown, SlowRequestMonitor};

mod common;

fn quick_config(threshold_ms: u64) -> MonitorConfig {
    MonitorConfig {
        threshold_ms,
        confirmation_delay_ms: 50,
        settling_window_ms: 400,
    }
}

#[tokio::test]
async fn slow_backend_raises_and_clears_signal() {
    let addr = common::start_delayed_backend(Duration::from_millis(250), "late").await;
    let monitor = SlowRequestMonitor::new(quick_config(100));
    let client = MonitoredClient::new(monitor.clone(), &ClientConfig::default());

    let outcome = client.get(&format!("http://{}/", addr)).await.unwrap();
    assert_eq!(outcome.status, 200);
    assert_eq!(outcome.body_bytes, 4);
    assert!(!monitor.is_tracking());

    let signal = monitor.slow_network();
    tokio::time::timeout(Duration::from_secs(2), signal.wait_for(true))
        .await
        .expect("slow signal should rise");
    tokio::time::timeout(Duration::from_secs(2), signal.wait_for(false))
        .await
        .expect("slow signal should settle");
    assert_eq!(monitor.warnings_published(), 1);
}

#[tokio::test]
async fn fast_backend_never_raises_signal() {
    let addr = common::start_delayed_backend(Duration::ZERO, "ok").await;
    let monitor = SlowRequestMonitor::new(quick_config(1000));
    let client = MonitoredClient::new(monitor.clone(), &ClientConfig::default());
    let mut rx = monitor.slow_network().subscribe();

    for _ in 0..5 {
        let outcome = client.get(&format!("http://{}/", addr)).await.unwrap();
        assert_eq!(outcome.status, 200);
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(!monitor.slow_network().get());
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test]
async fn server_errors_are_still_timed() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let addr = common::start_programmable_backend(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            (503, "busy".to_string())
        }
    })
    .await;

    let monitor = SlowRequestMonitor::new(quick_config(100));
    let client = MonitoredClient::new(monitor.clone(), &ClientConfig::default());

    let outcome = client.get(&format!("http://{}/", addr)).await.unwrap();
    assert_eq!(outcome.status, 503);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::timeout(Duration::from_secs(2), monitor.slow_network().wait_for(true))
        .await
        .expect("503 after 200ms is still slow");
}

#[tokio::test]
async fn client_timeout_releases_tracking() {
    let addr = common::start_delayed_backend(Duration::from_secs(5), "never").await;
    let monitor = SlowRequestMonitor::new(quick_config(100));
    let config = ClientConfig {
        connect_timeout_secs: 1,
        request_timeout_secs: 1,
    };
    let client = MonitoredClient::new(monitor.clone(), &config);

    let err = client.get(&format!("http://{}/", addr)).await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
    assert!(!monitor.is_tracking());

    // A one second wait is well over the threshold.
    tokio::time::timeout(Duration::from_secs(2), monitor.slow_network().wait_for(true))
        .await
        .expect("abandoned request should count as slow");
}

#[tokio::test]
async fn home_visibility_published_with_warning() {
    let addr = common::start_delayed_backend(Duration::from_millis(200), "late").await;
    let monitor = SlowRequestMonitor::new(quick_config(100));
    let nav = Arc::new(NavigationState::new(true, true));
    monitor.set_home_screen_context(Some(nav.clone()));
    let client = MonitoredClient::new(monitor.clone(), &ClientConfig::default());

    assert!(!monitor.home_visible().get());
    client.get(&format!("http://{}/", addr)).await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), monitor.slow_network().wait_for(true))
        .await
        .unwrap();
    assert!(monitor.home_visible().get());
    assert_eq!(monitor.last_visibility(), Visibility::Visible);

    // User navigates away; the GUI asks for a refresh.
    nav.set_current(false);
    monitor.refresh();
    assert!(!monitor.home_visible().get());
}

#[tokio::test]
async fn monitored_client_against_slow_backend_app() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = tokio::spawn(slow_backend::serve(
        listener,
        Duration::from_millis(10),
        shutdown.subscribe(),
    ));

    let monitor = SlowRequestMonitor::new(quick_config(100));
    let client = MonitoredClient::new(monitor.clone(), &ClientConfig::default());

    let fast = client.get(&format!("http://{}/ping", addr)).await.unwrap();
    assert_eq!(fast.status, 200);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!monitor.slow_network().get());

    let slow = client
        .get(&format!("http://{}/ping?delay_ms=250", addr))
        .await
        .unwrap();
    assert_eq!(slow.status, 200);
    tokio::time::timeout(Duration::from_secs(2), monitor.slow_network().wait_for(true))
        .await
        .unwrap();

    drop(client);
    shutdown.trigger();
    server.await.unwrap().unwrap();
}
