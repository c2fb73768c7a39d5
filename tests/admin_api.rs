//! Admin API served over a real socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dispatch_gate::admin;
use dispatch_gate::config::ServiceClass;
use dispatch_gate::dispatch::DispatchOptions;
use dispatch_gate::health::HealthSnapshot;
use dispatch_gate::lifecycle::{GateServices, Shutdown};
use dispatch_gate::registry::Pool;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

mod common;
use common::{fail_after, pool, replica};

async fn start_admin(services: &GateServices, shutdown: &Shutdown) -> (SocketAddr, JoinHandle<Result<(), std::io::Error>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(admin::serve(listener, services.admin_state(), shutdown.subscribe()));
    (addr, handle)
}

#[tokio::test]
async fn test_status_and_pool_health() {
    let services = common::services(vec![
        pool(ServiceClass::Ai, "ai-0"),
        pool(ServiceClass::Ai, "ai-1"),
        replica("replica-0"),
    ]);
    let shutdown = Shutdown::new();
    let (addr, server) = start_admin(&services, &shutdown).await;
    let client = reqwest::Client::new();

    let status: Value = client
        .get(format!("http://{}/status", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "operational");
    assert_eq!(status["total_pools"], 3);

    // Fail ai-0 once so it shows up as unhealthy and excluded.
    services
        .invoker
        .dispatch(
            ServiceClass::Ai,
            1,
            |p: Arc<Pool>| fail_after(p, Duration::ZERO),
            DispatchOptions::new(1, Duration::from_secs(1)),
        )
        .await
        .unwrap_err();

    let snapshot: HealthSnapshot = client
        .get(format!("http://{}/pools/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot.total_pools, 3);
    assert_eq!(snapshot.healthy_pools, 2);
    let ai0 = &snapshot.pools["ai-0"];
    assert!(!ai0.healthy);
    assert!(ai0.excluded);
    assert_eq!(ai0.failure_count, 1);
    assert!(ai0.last_failure.is_some());
    assert_eq!(ai0.breaker_state, "closed");

    let status: Value = client
        .get(format!("http://{}/status", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "degraded");
    assert_eq!(status["excluded_pools"], serde_json::json!(["ai-0"]));

    drop(client);
    shutdown.trigger();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_replica_route() {
    let services = common::services(vec![replica("replica-0"), replica("replica-1"), replica("replica-2")]);
    let shutdown = Shutdown::new();
    let (addr, server) = start_admin(&services, &shutdown).await;
    let client = reqwest::Client::new();

    let route: Value = client
        .get(format!("http://{}/replica/route/7", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(route["tenant_id"], 7);
    assert_eq!(route["shard"], 0);
    assert_eq!(route["pool"], "replica-0");
    assert_eq!(route["on_owner"], true);
    assert_eq!(route["primary"], "primary");

    let res = client
        .get(format!("http://{}/replica/route/not-a-tenant", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    drop(res);
    drop(client);
    shutdown.trigger();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_replica_route_without_primary() {
    let mut config = common::gate_config(vec![pool(ServiceClass::Ai, "ai-0")]);
    config.primary = None;
    let services = dispatch_gate::lifecycle::build(config).unwrap();
    let shutdown = Shutdown::new();
    let (addr, server) = start_admin(&services, &shutdown).await;

    let res = reqwest::get(format!("http://{}/replica/route/1", addr)).await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "no replica pools configured");

    shutdown.trigger();
    server.await.unwrap().unwrap();
}
