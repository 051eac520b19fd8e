use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/common/oauth2/v2.0/token";
pub const DEVICE_CODE_PATH: &str = "/common/oauth2/v2.0/devicecode";

/// Mount a refresh-token grant responder.
#[allow(dead_code)]
pub async fn mount_refresh(server: &MockServer, response: ResponseTemplate, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(response)
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Mount the device-code endpoint returning a session that polls every `interval` seconds.
#[allow(dead_code)]
pub async fn mount_device_code(server: &MockServer, interval: u64, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(DEVICE_CODE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "device_code": "dev-123",
            "user_code": "WXYZ-9876",
            "verification_uri": "https://microsoft.com/devicelogin",
            "interval": interval,
            "expires_in": 900,
            "message": "To sign in, use a web browser to open the page https://microsoft.com/devicelogin"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Mount a device-code poll responder, optionally limited to `times` matches.
#[allow(dead_code)]
pub async fn mount_device_poll(server: &MockServer, response: ResponseTemplate, times: Option<u64>) {
    let mock = Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("device_code=dev-123"))
        .respond_with(response);
    let mock = match times {
        Some(n) => mock.up_to_n_times(n),
        None => mock,
    };
    mock.mount(server).await;
}

#[allow(dead_code)]
pub fn token_response(access: &str, refresh: Option<&str>) -> ResponseTemplate {
    let mut body = serde_json::json!({
        "token_type": "Bearer",
        "scope": "Files.ReadWrite.All User.Read",
        "expires_in": 3599,
        "ext_expires_in": 3599,
        "access_token": access,
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = serde_json::Value::String(refresh.to_string());
    }
    ResponseTemplate::new(200).set_body_json(body)
}

#[allow(dead_code)]
pub fn oauth_error(code: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(serde_json::json!({
        "error": code,
        "error_description": format!("AADSTS: {code}"),
    }))
}
