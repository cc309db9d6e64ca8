//! Shared mocks for integration tests: a crowdfunding backend, a Solana RPC
//! node and a running gateway, all on loopback ports.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use base64::Engine;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crowdfund_gateway::config::GatewayConfig;
use crowdfund_gateway::http::HttpServer;
use crowdfund_gateway::lifecycle::Shutdown;

/// Wallet the mock backend hands out for donations (`[9; 32]`).
pub const FUND_WALLET: &str = "cGfHiC6Kgg3FpFZvgwGcswsCRtp4aBP2fzuXRQPizuN";

pub const PLATFORM_KEY: &str = "platform-key";

async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub api_key: Option<String>,
    pub from_proxy: Option<String>,
    pub body: Value,
}

pub struct MockBackend {
    pub fund: Mutex<Value>,
    pub requests: Mutex<Vec<Recorded>>,
}

impl MockBackend {
    pub fn recorded(&self, method: Method, path: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    fn record(&self, method: Method, path: String, headers: &HeaderMap, body: &Bytes) {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().unwrap().push(Recorded {
            method,
            path,
            api_key: text("x-api-key"),
            from_proxy: text("x-from-vercel"),
            body: serde_json::from_slice(body).unwrap_or(Value::Null),
        });
    }
}

pub fn fund_json(id: &str, target: f64, current: f64) -> Value {
    json!({
        "_id": id,
        "userId": { "walletAddress": "LbUiWL3xVV8hTFYBVdbTNrpDo41NKS6o3LHHuDzjfcY" },
        "name": "Integration fund",
        "fundWalletAddress": FUND_WALLET,
        "tokenName": "Integration",
        "tokenSymbol": "INT",
        "targetSolAmount": target,
        "currentDonatedSol": current,
        "status": if current >= target { "completed" } else { "active" },
    })
}

/// Start the crowdfunding backend mock serving one fund.
pub async fn start_mock_backend(fund: Value) -> (SocketAddr, Arc<MockBackend>) {
    let state = Arc::new(MockBackend {
        fund: Mutex::new(fund),
        requests: Mutex::new(Vec::new()),
    });

    let router = Router::new()
        .route("/funds/fee", get(fee))
        .route("/funds", post(create_fund))
        .route("/funds/{id}", get(get_fund))
        .route("/funds/{id}/pre-donate", post(pre_donate))
        .route("/funds/{id}/donate", post(donate))
        .route("/echo", any(echo))
        .route("/missing", get(|| async {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "Fund not found" })))
        }))
        .route("/bare-error", get(|| async {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})))
        }))
        .route("/broken", get(|| async {
            ([(header::CONTENT_TYPE, "application/json")], "{not json")
        }))
        .route("/page", get(|| async {
            (
                StatusCode::ACCEPTED,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                "<p>hello</p>",
            )
        }))
        .with_state(state.clone());

    (spawn(router).await, state)
}

async fn fee() -> Json<Value> {
    Json(json!({ "minDonation": 0.1, "maxDonation": 5.0, "creationFee": 0.2 }))
}

async fn get_fund(State(state): State<Arc<MockBackend>>, Path(_id): Path<String>) -> Json<Value> {
    Json(state.fund.lock().unwrap().clone())
}

async fn pre_donate(
    State(state): State<Arc<MockBackend>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(Method::POST, format!("/funds/{id}/pre-donate"), &headers, &body);
    let fund = state.fund.lock().unwrap().clone();
    if fund["status"] == "completed" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Crowdfund is already completed" })),
        )
            .into_response();
    }
    Json(json!({ "fundWalletAddress": fund["fundWalletAddress"] })).into_response()
}

async fn donate(
    State(state): State<Arc<MockBackend>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    state.record(Method::POST, format!("/funds/{id}/donate"), &headers, &body);
    let amount = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|b| b["amount"].as_f64())
        .unwrap_or(0.0);

    let mut fund = state.fund.lock().unwrap();
    let raised = fund["currentDonatedSol"].as_f64().unwrap_or(0.0) + amount;
    fund["currentDonatedSol"] = json!(raised);
    if raised >= fund["targetSolAmount"].as_f64().unwrap_or(f64::MAX) {
        fund["status"] = json!("completed");
    }
    Json(fund.clone())
}

async fn create_fund(
    State(state): State<Arc<MockBackend>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    state.record(Method::POST, "/funds".into(), &headers, &body);
    (
        StatusCode::CREATED,
        Json(json!({ "_id": "created-1", "message": "Fund created" })),
    )
}

async fn echo(
    State(state): State<Arc<MockBackend>>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    state.record(method.clone(), "/echo".into(), &headers, &body);
    let text = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "apiKey": text("x-api-key"),
        "fromProxy": text("x-from-vercel"),
        "cacheControl": text("cache-control"),
        "contentType": text("content-type"),
        "body": String::from_utf8_lossy(&body),
    }))
}

pub struct MockNode {
    pub balance: u64,
    pub sent: Mutex<Vec<String>>,
}

/// Start a Solana JSON-RPC node mock that confirms everything it receives.
pub async fn start_mock_rpc(balance: u64) -> (SocketAddr, Arc<MockNode>) {
    let state = Arc::new(MockNode {
        balance,
        sent: Mutex::new(Vec::new()),
    });
    let router = Router::new()
        .route("/", post(rpc))
        .with_state(state.clone());
    (spawn(router).await, state)
}

async fn rpc(State(node): State<Arc<MockNode>>, Json(req): Json<Value>) -> Json<Value> {
    let id = req["id"].clone();
    let ok = |result: Value| Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }));
    let context = json!({ "slot": 5 });

    match req["method"].as_str().unwrap_or_default() {
        "getBalance" => ok(json!({ "context": context, "value": node.balance })),
        "getLatestBlockhash" => ok(json!({
            "context": context,
            "value": {
                "blockhash": "11111111111111111111111111111111",
                "lastValidBlockHeight": 100
            }
        })),
        "getVersion" => ok(json!({ "solana-core": "2.1.0", "feature-set": 1 })),
        "sendTransaction" => {
            let encoded = req["params"][0].as_str().unwrap_or_default();
            let wire = match req["params"][1]["encoding"].as_str() {
                Some("base64") => base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .unwrap_or_default(),
                _ => bs58::decode(encoded).into_vec().unwrap_or_default(),
            };
            if wire.len() < 65 {
                return Json(json!({
                    "jsonrpc": "2.0",
                    "id": req["id"],
                    "error": { "code": -32602, "message": "invalid transaction" }
                }));
            }
            // compact-u16 signature count, then the first signature.
            let signature = bs58::encode(&wire[1..65]).into_string();
            node.sent.lock().unwrap().push(signature.clone());
            ok(json!(signature))
        }
        "getSignatureStatuses" => ok(json!({
            "context": context,
            "value": [{
                "slot": 5,
                "confirmations": null,
                "status": { "Ok": null },
                "err": null,
                "confirmationStatus": "confirmed"
            }]
        })),
        "getHealth" => ok(json!("ok")),
        _ => Json(json!({
            "jsonrpc": "2.0",
            "id": req["id"],
            "error": { "code": -32602, "message": "Invalid param" }
        })),
    }
}

/// A gateway pointed at the given RPC node and backend.
pub fn gateway_config(rpc: Option<SocketAddr>, backend: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.network.dev_rpc_url = rpc.map(|addr| format!("http://{addr}/"));
    config.network.api_key = Some(PLATFORM_KEY.to_string());
    config.backend.api_url = format!("http://{backend}");
    config.timeouts.request_secs = 5;
    config.timeouts.connect_secs = 1;
    config
}

pub struct RunningGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Run the real gateway server on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> RunningGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let task = tokio::spawn(server.run(listener, shutdown.clone()));
    RunningGateway {
        addr,
        shutdown,
        task,
    }
}
