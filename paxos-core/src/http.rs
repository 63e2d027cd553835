//! A `reqwest::Client` builder for outbound calls with a fixed per-call
//! timeout, shared by every role's HTTP client.

use std::time::Duration;

pub fn client_with_timeout(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("reqwest client with a fixed timeout always builds")
}
