use serde_json::json;
use starknet_activity::rpc::{ChainReader, RpcClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Minimal HTTP endpoint answering every request with a fixed status and
/// body. Stands in for an upstream JSON-RPC service.
async fn spawn_endpoint(status: u16, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let reason = if status == 200 { "OK" } else { "Internal Server Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });

    format!("http://{}", addr)
}

fn tip_response() -> String {
    json!({ "jsonrpc": "2.0", "id": 1, "result": "0x7a120" }).to_string()
}

#[tokio::test]
async fn failing_endpoint_is_invisible_to_the_caller() {
    let bad = spawn_endpoint(500, "oops".to_string()).await;
    let good = spawn_endpoint(200, tip_response()).await;

    let client = RpcClient::new(&[bad, good.clone()]).unwrap();
    let tip = client.block_number().await.unwrap();

    assert_eq!(tip, 500_000);
    // The failure rotated the pool; later calls start on the good endpoint.
    assert_eq!(client.pool().current_url(), good);
}

#[tokio::test]
async fn json_rpc_error_body_also_rotates() {
    let erroring = spawn_endpoint(
        200,
        json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": -32603, "message": "boom" } })
            .to_string(),
    )
    .await;
    let good = spawn_endpoint(200, tip_response()).await;

    let client = RpcClient::new(&[erroring, good]).unwrap();
    assert_eq!(client.block_number().await.unwrap(), 500_000);
}

#[tokio::test]
async fn missing_result_field_also_rotates() {
    let empty = spawn_endpoint(200, json!({ "jsonrpc": "2.0", "id": 1 }).to_string()).await;
    let good = spawn_endpoint(200, tip_response()).await;

    let client = RpcClient::new(&[empty, good]).unwrap();
    assert_eq!(client.block_number().await.unwrap(), 500_000);
}

#[tokio::test]
async fn all_endpoints_failing_exhausts_the_call() {
    let bad1 = spawn_endpoint(500, "oops".to_string()).await;
    let bad2 = spawn_endpoint(503, "nope".to_string()).await;

    let client = RpcClient::new(&[bad1.clone(), bad2]).unwrap();
    let err = client.block_number().await.unwrap_err();

    assert!(err.to_string().contains("exhausted"));
    // Two failures walked the index all the way around.
    assert_eq!(client.pool().current_url(), bad1);
}

#[tokio::test]
async fn rotation_state_is_shared_across_unrelated_calls() {
    let bad = spawn_endpoint(500, "oops".to_string()).await;
    let good = spawn_endpoint(200, tip_response()).await;

    let client = RpcClient::new(&[bad, good.clone()]).unwrap();
    let sibling = client.clone();

    client.block_number().await.unwrap();

    // A clone made before the failure starts from the rotated position.
    assert_eq!(sibling.pool().current_url(), good);
    assert_eq!(sibling.block_number().await.unwrap(), 500_000);
}
