//! End-to-end tests of the demonstration site.
//!
//! Each test drives the real configuration, controllers and templates
//! through the in-memory client, which keeps the session cookie between
//! requests like a browser would.

use http::StatusCode;
use portico::config::{PorticoConfig, RouteConfig};
use portico_site::{application, load_config};
use portico_test::{TestClient, TestResponse};

fn config() -> PorticoConfig {
    load_config(None).expect("bundled configuration should load")
}

fn client() -> TestClient {
    TestClient::new(application(config()).expect("application should build"))
}

async fn login(client: &TestClient, email: &str, password: &str) -> TestResponse {
    let form = client.get("/login").send().await;
    form.assert_status(StatusCode::OK);
    let token = form
        .input_value("csrf_token")
        .expect("login form should carry a CSRF token");

    client
        .post("/login")
        .form(&[
            ("email", email),
            ("password", password),
            ("csrf_token", token.as_str()),
        ])
        .send()
        .await
}

#[tokio::test]
async fn test_home_page_starts_session() {
    let client = client();
    let response = client.get("/").send().await;

    response
        .assert_status(StatusCode::OK)
        .assert_header("x-frame-options", "SAMEORIGIN")
        .assert_body_contains("Welcome to the Portico demonstration site")
        .assert_body_contains("Log in");
    assert!(response.cookie("portico_session").is_some());
    assert!(response.header("x-request-id").is_some());
    assert!(client.cookie("portico_session").is_some());
}

#[tokio::test]
async fn test_session_is_resumed() {
    let client = client();
    client.get("/").send().await;
    let first = client.cookie("portico_session");

    client.get("/about").send().await.assert_status(StatusCode::OK);
    assert_eq!(client.cookie("portico_session"), first);
}

#[tokio::test]
async fn test_guest_redirected_to_login() {
    let client = client();
    client.get("/dashboard").send().await.assert_redirect("/login");

    client
        .get("/login")
        .send()
        .await
        .assert_body_contains("Please log in to access this page");
}

#[tokio::test]
async fn test_login_reaches_dashboard() {
    let client = client();
    client.get("/dashboard").send().await.assert_redirect("/login");

    login(&client, "admin@example.com", "admin-password")
        .await
        .assert_redirect("/dashboard");

    client
        .get("/dashboard")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("Welcome back, Ada Admin")
        .assert_body_contains("admin@example.com");
}

#[tokio::test]
async fn test_login_rotates_session_id() {
    let client = client();
    client.get("/login").send().await;
    let guest_id = client.cookie("portico_session");

    login(&client, "user@example.com", "user-password").await;
    let member_id = client.cookie("portico_session");
    assert!(member_id.is_some());
    assert_ne!(member_id, guest_id);
}

#[tokio::test]
async fn test_wrong_password_returns_to_form() {
    let client = client();
    login(&client, "user@example.com", "nope")
        .await
        .assert_redirect("/login");

    let form = client.get("/login").send().await;
    form.assert_body_contains("Invalid email or password");
    assert_eq!(form.input_value("email").as_deref(), Some("user@example.com"));

    client.get("/dashboard").send().await.assert_redirect("/login");
}

#[tokio::test]
async fn test_login_rejects_forged_token() {
    let client = client();
    client.get("/login").send().await;

    let response = client
        .post("/login")
        .form(&[
            ("email", "admin@example.com"),
            ("password", "admin-password"),
            ("csrf_token", "forged"),
        ])
        .send()
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    client.get("/dashboard").send().await.assert_redirect("/login");
}

#[tokio::test]
async fn test_csrf_token_is_single_use() {
    let client = client();
    let form = client.get("/login").send().await;
    let token = form.input_value("csrf_token").unwrap();
    let attempt = [
        ("email", "user@example.com"),
        ("password", "nope"),
        ("csrf_token", token.as_str()),
    ];

    client
        .post("/login")
        .form(&attempt)
        .send()
        .await
        .assert_redirect("/login");

    client
        .post("/login")
        .form(&attempt)
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_logged_in_user_skips_login_form() {
    let client = client();
    login(&client, "user@example.com", "user-password").await;
    client.get("/login").send().await.assert_redirect("/dashboard");
}

#[tokio::test]
async fn test_member_is_kept_out_of_admin() {
    let client = client();
    login(&client, "user@example.com", "user-password").await;

    client.get("/admin").send().await.assert_redirect("/unauthorised");
    client.get("/users").send().await.assert_redirect("/unauthorised");

    client
        .get("/unauthorised")
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN)
        .assert_body_contains("Access denied");
}

#[tokio::test]
async fn test_admin_area_lists_logins() {
    let client = client();
    login(&client, "admin@example.com", "admin-password").await;

    client
        .get("/admin")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("Registered users")
        .assert_body_contains("admin@example.com (#1)");
}

#[tokio::test]
async fn test_user_directory() {
    let client = client();
    login(&client, "admin@example.com", "admin-password").await;

    client
        .get("/users")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("Una User");

    client
        .get("/USERS/2")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("user@example.com");

    client
        .get("/users/99")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout() {
    let client = client();
    login(&client, "admin@example.com", "admin-password").await;

    let dashboard = client.get("/dashboard").send().await;
    let token = dashboard
        .input_value("csrf_token")
        .expect("layout should carry the logout token");

    client
        .post("/logout")
        .form(&[("csrf_token", token.as_str())])
        .send()
        .await
        .assert_redirect("/");

    client.get("/dashboard").send().await.assert_redirect("/login");
}

#[tokio::test]
async fn test_logout_token_survives_other_pages() {
    let client = client();
    login(&client, "admin@example.com", "admin-password").await;

    let token = client
        .get("/dashboard")
        .send()
        .await
        .form_input_value("/logout", "csrf_token")
        .unwrap();
    for page in ["/about", "/users", "/admin"] {
        let again = client.get(page).send().await;
        assert_eq!(
            again.form_input_value("/logout", "csrf_token").as_deref(),
            Some(token.as_str()),
            "{page} issued a new logout token"
        );
    }

    client
        .post("/logout")
        .form(&[("csrf_token", token.as_str())])
        .send()
        .await
        .assert_redirect("/");
}

async fn create_user(client: &TestClient, fields: &[(&str, &str)]) -> TestResponse {
    let form = client.get("/users/create").send().await;
    form.assert_status(StatusCode::OK);
    let token = form
        .form_input_value("/users", "csrf_token")
        .expect("account form should carry a CSRF token");

    let mut fields = fields.to_vec();
    fields.push(("csrf_token", token.as_str()));
    client.post("/users").form(&fields).send().await
}

#[tokio::test]
async fn test_admin_creates_account() {
    let client = client();
    login(&client, "admin@example.com", "admin-password").await;

    client
        .get("/users")
        .send()
        .await
        .assert_body_contains("New user");

    create_user(
        &client,
        &[
            ("name", "Grace Hopper"),
            ("email", "grace@example.com"),
            ("password", "cobol-1959"),
            ("password_confirmation", "cobol-1959"),
            ("role", "member"),
        ],
    )
    .await
    .assert_redirect("/users/3");

    client
        .get("/users/3")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("Created account for Grace Hopper")
        .assert_body_contains("grace@example.com");

    client
        .get("/admin")
        .send()
        .await
        .assert_body_contains("Welcome to our site to grace@example.com");

    client.clear_cookies();
    login(&client, "grace@example.com", "cobol-1959")
        .await
        .assert_redirect("/dashboard");
}

#[tokio::test]
async fn test_invalid_account_returns_to_form() {
    let client = client();
    login(&client, "admin@example.com", "admin-password").await;

    create_user(
        &client,
        &[
            ("name", "Grace Hopper"),
            ("email", "not-an-email"),
            ("password", "short"),
            ("password_confirmation", "different"),
            ("role", "owner"),
        ],
    )
    .await
    .assert_redirect("/users/create");

    let form = client.get("/users/create").send().await;
    form.assert_status(StatusCode::OK)
        .assert_body_contains("Please enter a valid email address")
        .assert_body_contains("Password must be at least 8 characters")
        .assert_body_contains("Passwords do not match")
        .assert_body_contains("The role field has an invalid value.");
    assert_eq!(form.input_value("name").as_deref(), Some("Grace Hopper"));
    assert_eq!(form.input_value("email").as_deref(), Some("not-an-email"));
    assert_eq!(form.input_value("password"), None);

    client
        .get("/admin")
        .send()
        .await
        .assert_body_contains("Nothing sent yet.");
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let client = client();
    login(&client, "admin@example.com", "admin-password").await;

    create_user(
        &client,
        &[
            ("name", "Another Una"),
            ("email", "USER@example.com"),
            ("password", "long-enough"),
            ("password_confirmation", "long-enough"),
        ],
    )
    .await
    .assert_redirect("/users/create");

    client
        .get("/users/create")
        .send()
        .await
        .assert_body_contains("Email is already registered");
}

#[tokio::test]
async fn test_account_creation_requires_permission() {
    let client = client();
    client.get("/users/create").send().await.assert_redirect("/login");

    login(&client, "user@example.com", "user-password").await;
    client
        .get("/users/create")
        .send()
        .await
        .assert_redirect("/unauthorised");
    client
        .post("/users")
        .form(&[("name", "Sneaky"), ("email", "sneaky@example.com")])
        .send()
        .await
        .assert_redirect("/unauthorised");
}

#[tokio::test]
async fn test_account_creation_requires_token() {
    let client = client();
    login(&client, "admin@example.com", "admin-password").await;
    client.get("/users/create").send().await;

    client
        .post("/users")
        .form(&[
            ("name", "Grace Hopper"),
            ("email", "grace@example.com"),
            ("password", "cobol-1959"),
            ("password_confirmation", "cobol-1959"),
            ("csrf_token", "forged"),
        ])
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    client()
        .get("/nowhere")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_method_is_not_found() {
    client()
        .delete("/dashboard")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_middleware_fails_request() {
    let mut config = config();
    config.routes.push(
        RouteConfig::new("GET", "/broken", "HomeController", "index")
            .with_middleware(["web", "no_such_middleware"]),
    );
    let client = TestClient::new(application(config).unwrap());

    client
        .get("/broken")
        .send()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_middleware_cycle_fails_request() {
    let mut config = config();
    config
        .middleware
        .groups
        .insert("loop".to_string(), vec!["web".to_string(), "loop".to_string()]);
    config.routes.push(
        RouteConfig::new("GET", "/loop", "HomeController", "index").with_middleware(["loop"]),
    );
    let client = TestClient::new(application(config).unwrap());

    client
        .get("/loop")
        .send()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_body_contains("MiddlewareCycle");
}
