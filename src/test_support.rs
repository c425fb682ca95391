//! In-process stub servers standing in for Drive and the chat API.

use axum::Router;
use tokio::net::TcpListener;

use crate::settings::{AppConfig, AppSettings};

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_stub(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn stub_config(drive_base: &str, api_base: &str) -> AppConfig {
    let settings = AppSettings {
        drive_base_url: Some(drive_base.to_string()),
        api_base_url: Some(api_base.to_string()),
        ..Default::default()
    };
    AppConfig::from_settings(settings, "test-key".to_string()).unwrap()
}
