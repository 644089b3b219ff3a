//! Router tests against live in-process devices.
//!
//! Each simulator can be switched off mid-test: once offline it drops every
//! connection without answering, which the clients report as a failed poll.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use hashwatch_core::{DeviceKind, HttpTimeouts, MonitorConfig, TcpTimeouts, TelemetryRecord};
use hashwatch_server::{AppContext, build_router};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;

const INFO: &str = r#"{"power":15.2,"temp":61.0}"#;
const SUMMARY: &str = "STATUS=S,When=1700000000,Code=11,Msg=Summary|\
    SUMMARY,Elapsed=120,MHS av=500000.0,MHS 5s=480000.0,Accepted=10,Rejected=5|";
const POOLS: &str = "STATUS=S,When=1700000003,Code=7,Msg=1 Pool(s)|\
    POOL=0,URL=stratum+tcp://pool.example:3333,Status=Alive,User=bc1qworker,\
    Stratum Active=true|";

/// A simulated miner that answers until switched off.
struct Device {
    addr: SocketAddr,
    online: Arc<AtomicBool>,
}

impl Device {
    fn stop(&self) {
        self.online.store(false, Ordering::SeqCst);
    }
}

async fn spawn_device<F, Fut>(serve: F) -> Device
where
    F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let online = Arc::new(AtomicBool::new(true));
    let flag = online.clone();
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            if flag.load(Ordering::SeqCst) {
                tokio::spawn(serve(socket));
            }
        }
    });
    Device { addr, online }
}

/// AxeOS stand-in answering every request with [`INFO`].
async fn axeos_device() -> Device {
    spawn_device(|mut socket| async move {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n",
            INFO.len()
        );
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(INFO.as_bytes()).await;
        let _ = socket.shutdown().await;
    })
    .await
}

/// cgminer stand-in; commands other than summary and pools get an empty reply.
async fn cgminer_device() -> Device {
    spawn_device(|mut socket| async move {
        let mut buf = [0u8; 64];
        let n = socket.read(&mut buf).await.unwrap_or(0);
        let reply = match &buf[..n] {
            b"summary" => SUMMARY,
            b"pools" => POOLS,
            _ => "",
        };
        let _ = socket.write_all(reply.as_bytes()).await;
    })
    .await
}

fn context(bitaxe: &Device, avalon: &Device) -> Arc<AppContext> {
    let config = MonitorConfig {
        bitaxe_host: bitaxe.addr.to_string(),
        avalon_host: avalon.addr.ip().to_string(),
        avalon_port: avalon.addr.port(),
        template: Some("/nonexistent/hashwatch/index.html".into()),
        http_timeouts: HttpTimeouts {
            request: Duration::from_secs(2),
        },
        tcp_timeouts: TcpTimeouts {
            io: Duration::from_secs(1),
            read_loop: Duration::from_millis(400),
            ..Default::default()
        },
        ..Default::default()
    };
    Arc::new(AppContext::new(config).unwrap())
}

async fn get_json(router: &Router, uri: &str) -> Value {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK, "{uri}");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn bitaxe_poll_returns_and_publishes_the_record() {
    let bitaxe = axeos_device().await;
    let avalon = cgminer_device().await;
    let ctx = context(&bitaxe, &avalon);
    let router = build_router(ctx.clone());

    let json = get_json(&router, "/api/stats").await;
    assert_eq!(json["power"], 15.2);
    assert_eq!(json["temp"], 61.0);
    assert_eq!(json["voltage"], 0.0);
    assert_eq!(json["hashRate"], 0.0);
    assert_eq!(json["ASICModel"], "");
    assert_eq!(json["hashRateAvgSource"], "device");
    assert!(json["sharesRejectedPercentage"].is_null());

    let Some(TelemetryRecord::Bitaxe(stored)) = ctx.store().get_latest(DeviceKind::Bitaxe) else {
        panic!("bitaxe record was not published");
    };
    assert_eq!(stored.power, 15.2);
    assert_eq!(stored.temperature, 61.0);
}

#[tokio::test]
async fn avalon_poll_returns_and_publishes_the_record() {
    let bitaxe = axeos_device().await;
    let avalon = cgminer_device().await;
    let ctx = context(&bitaxe, &avalon);
    let router = build_router(ctx.clone());

    let json = get_json(&router, "/api/avalon/stats").await;
    assert_eq!(json["elapsed"], 120);
    assert_eq!(json["accepted"], 10);
    assert_eq!(json["reject"], 5);
    assert_eq!(json["session_samples"], 1);
    assert_eq!(json["session_average_hash"], 0.48);
    assert_eq!(json["current_pool"], 0);
    assert_eq!(json["inferred"]["pool_connected"], true);

    let Some(TelemetryRecord::Avalon(stored)) = ctx.store().get_latest(DeviceKind::Avalon) else {
        panic!("avalon record was not published");
    };
    assert_eq!(stored.elapsed, 120);
    assert_eq!(stored.session_samples, 1);
}

#[tokio::test]
async fn failed_poll_keeps_last_snapshot_visible() {
    let bitaxe = axeos_device().await;
    let avalon = cgminer_device().await;
    let ctx = context(&bitaxe, &avalon);
    let router = build_router(ctx.clone());

    assert_eq!(get_json(&router, "/api/stats").await["power"], 15.2);
    assert_eq!(get_json(&router, "/api/avalon/stats").await["elapsed"], 120);

    bitaxe.stop();
    avalon.stop();
    assert!(get_json(&router, "/api/stats").await.is_null());
    assert!(get_json(&router, "/api/avalon/stats").await.is_null());

    assert!(ctx.store().get_latest(DeviceKind::Bitaxe).is_some());
    assert!(ctx.store().get_latest(DeviceKind::Avalon).is_some());

    let snapshot = get_json(&router, "/api/snapshot").await;
    assert_eq!(snapshot["bitaxe"]["record"]["power"], 15.2);
    assert_eq!(snapshot["avalon"]["record"]["elapsed"], 120);
    assert_eq!(snapshot["avalon"]["record"]["session_samples"], 1);
    assert!(snapshot["bitaxe"]["age_secs"].as_f64().unwrap() >= 0.0);
}
