//! The user directory.

use std::sync::Arc;

use http::StatusCode;
use portico::core::controller::{unknown_action, Controller};
use portico::core::di::{ContainerError, Injectable, Resolver};
use portico::core::keys;
use portico::core::types::{read_form, BoxFuture, FormData, Request, Response, ResponseExt};
use portico::core::validation::Validator;
use portico::core::{PorticoError, PorticoResult};
use portico::router::Params;
use portico::session::{NewUser, SessionError, UserProvider};
use serde_json::{json, Value};

use crate::page::Page;

/// Form name the account creation CSRF token is issued for.
const CREATE_FORM: &str = "create_user";

/// Roles an account can be created with.
const ROLES: [&str; 2] = ["member", "admin"];

/// Fields echoed back into the form after a failed submission.
const OLD_INPUT: [&str; 3] = ["name", "email", "role"];

/// Lists users, shows one user's profile and creates accounts.
pub struct UsersController {
    page: Arc<Page>,
    users: Arc<dyn UserProvider>,
}

impl UsersController {
    fn index(&self) -> PorticoResult<Response> {
        self.page.render(
            "users/index.html",
            json!({
                "title": "Users",
                "users": self.users.all(),
            }),
        )
    }

    fn show(&self, params: &Params) -> PorticoResult<Response> {
        let user = params
            .get(0)
            .and_then(|id| id.parse::<u64>().ok())
            .and_then(|id| self.users.find_by_id(id))
            .ok_or_else(|| PorticoError::http(StatusCode::NOT_FOUND, "User not found"))?;
        self.page.render(
            "users/show.html",
            json!({
                "title": user.name,
                "profile": user,
            }),
        )
    }

    fn create(&self) -> PorticoResult<Response> {
        let session = self.page.session();
        let errors = session.take_flash("errors").unwrap_or_else(|| json!({}));
        let old = session.take_flash("old").unwrap_or_else(|| json!({}));
        self.page.render(
            "users/create.html",
            json!({
                "title": "New user",
                "errors": errors,
                "old": old,
                "roles": ROLES,
                "csrf_field": self.page.security().csrf_field(CREATE_FORM),
            }),
        )
    }

    async fn store(&self, request: Request) -> PorticoResult<Response> {
        let (_, form) = read_form(request).await;
        let field = |name: &str| form.get(name).map_or("", |value| value.trim());

        let mut validator = Validator::new(&form)
            .required("name", None)
            .max("name", 100, None)
            .required("email", None)
            .email("email", Some("Please enter a valid email address"))
            .required("password", None)
            .min("password", 8, Some("Password must be at least 8 characters"))
            .matches("password_confirmation", "password", Some("Passwords do not match"))
            .in_list("role", &ROLES, None);
        if validator.is_valid() && self.users.find_by_email(field("email")).is_some() {
            validator = validator.fail("email", "Email is already registered");
        }
        if let Err(errors) = validator.finish() {
            return Ok(self.back_with(&form, serde_json::to_value(errors).unwrap_or(Value::Null)));
        }

        let role = match field("role") {
            "" => ROLES[0],
            role => role,
        };
        let new_user = NewUser::new(
            field("name"),
            field("email"),
            form.get("password").map_or("", String::as_str),
        )
        .roles([role]);
        let user = match self.page.auth().register(new_user) {
            Ok(user) => user,
            Err(SessionError::DuplicateEmail { .. }) => {
                return Ok(self.back_with(
                    &form,
                    json!({ "email": "Email is already registered" }),
                ));
            }
            Err(err) => return Err(PorticoError::internal(err.to_string())),
        };

        self.page
            .session()
            .flash("success", format!("Created account for {}", user.name));
        Ok(Response::redirect(&format!("/users/{}", user.id)))
    }

    /// Redirects to the form with the errors and everything but the passwords.
    fn back_with(&self, form: &FormData, errors: Value) -> Response {
        let session = self.page.session();
        let old: serde_json::Map<String, Value> = OLD_INPUT
            .iter()
            .filter_map(|name| {
                form.get(*name)
                    .map(|value| ((*name).to_string(), Value::String(value.clone())))
            })
            .collect();
        session.flash("errors", errors);
        session.flash("old", Value::Object(old));
        Response::redirect("/users/create")
    }
}

impl Injectable for UsersController {
    const CLASS: &'static str = "UsersController";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        let users = resolver.dependency_as::<Arc<dyn UserProvider>>("users", keys::USERS)?;
        Ok(Self {
            page: resolver.dependency::<Page>("page")?,
            users: Arc::clone(&*users),
        })
    }
}

impl Controller for UsersController {
    fn call(
        self: Arc<Self>,
        action: &str,
        request: Request,
        _response: Response,
        params: Params,
    ) -> BoxFuture<'static, PorticoResult<Response>> {
        match action {
            "index" => Box::pin(async move { self.index() }),
            "show" => Box::pin(async move { self.show(&params) }),
            "create" => Box::pin(async move { self.create() }),
            "store" => Box::pin(async move { self.store(request).await }),
            other => unknown_action(Self::CLASS, other),
        }
    }
}
