use crate::{
    auth::{
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::AppError,
    models::{LoginReqDto, TokenPair, TokenType},
    state::AppState,
    store::Store,
};
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::{debug, info, instrument};

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Signs a fresh access/refresh pair and persists the refresh token's jti.
async fn issue_pair(store: &dyn Store, config: &Config, subject: &TokenSubject) -> Result<TokenPair, AppError> {
    let access_token = generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");
    store
        .save_refresh_token(subject.user_id, &refresh_claims.jti, refresh_claims.exp as i64)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Access and refresh tokens", body = TokenPair),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(state, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    let username = user.username.trim();
    if username.is_empty() || user.password.is_empty() {
        return Err(AppError::validation("Username and password must not be empty"));
    }

    let store = state.store();
    let Some(db_user) = store.find_user_by_username(username).await? else {
        info!("Invalid credentials: user not found");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_password(&user.password, &db_user.password) {
        info!(user_id = db_user.id, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    // the account of an employee is named after its employee code
    let employee_id = store
        .find_employee_by_code(&db_user.username)
        .await?
        .map(|e| e.id);

    let subject = TokenSubject {
        user_id: db_user.id,
        username: db_user.username.clone(),
        role: db_user.role(),
        employee_id,
    };
    let pair = issue_pair(store, &config, &subject).await?;

    info!(user_id = db_user.id, role = %subject.role, "Login successful");
    Ok(HttpResponse::Ok().json(pair))
}

/// Exchange a refresh token for a new pair; the presented token is revoked.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New access and refresh tokens", body = TokenPair),
        (status = 401, description = "Missing, invalid, reused or non-refresh token")
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn refresh_token(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let token = bearer(&req).ok_or_else(|| AppError::Unauthorized("No token".into()))?;

    let claims = verify_token(token, &config.jwt_secret).map_err(|e| {
        debug!(error = %e, "Rejected refresh token");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Not a refresh token".into()));
    }

    let store = state.store();
    if !store.consume_refresh_token(&claims.jti).await? {
        info!(user_id = claims.user_id, jti = %claims.jti, "Refresh token reused or revoked");
        return Err(AppError::Unauthorized("Refresh token revoked".into()));
    }

    let pair = issue_pair(store, &config, &TokenSubject::from_claims(&claims)).await?;
    Ok(HttpResponse::Ok().json(pair))
}

/// Revoke the presented refresh token. Always succeeds.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(req: HttpRequest, state: web::Data<AppState>, config: web::Data<Config>) -> HttpResponse {
    let claims = match bearer(&req).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = state.store().consume_refresh_token(&claims.jti).await {
        debug!(error = %e, "Failed to revoke refresh token on logout");
    }

    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{middleware::auth_middleware, password::hash_password},
        model::user::NewUser,
        store::memory::MemoryStore,
    };
    use actix_web::{App, http::StatusCode, middleware::from_fn, test};
    use std::sync::Arc;

    async fn seeded() -> (Arc<MemoryStore>, Config) {
        let store = Arc::new(MemoryStore::new());
        let dept = store.seed_department("技术科");
        let id = store.seed_employee("张伟", "工程师", dept, true);
        store
            .create_user(NewUser {
                username: format!("E{id:04}"),
                password_hash: hash_password("pa55word").unwrap(),
                is_admin: false,
                department_id: Some(dept),
            })
            .await
            .unwrap();
        (store, Config::for_tests())
    }

    macro_rules! app {
        ($store:expr, $config:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(AppState::new($store.clone(), &$config)))
                    .app_data(web::Data::new($config.clone()))
                    .route("/auth/login", web::post().to(login))
                    .route("/auth/refresh", web::post().to(refresh_token))
                    .route("/auth/logout", web::post().to(logout))
                    .service(
                        web::scope("/api")
                            .wrap(from_fn(auth_middleware))
                            .route("/ping", web::get().to(|| async { HttpResponse::Ok().finish() })),
                    ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn login_links_employee_and_refresh_is_single_use() {
        let (store, config) = seeded().await;
        let app = app!(store, config);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({"username": "E0002", "password": "pa55word"}))
            .to_request();
        let pair: TokenPair = test::call_and_read_body_json(&app, req).await;

        let claims = verify_token(&pair.access_token, &config.jwt_secret).unwrap();
        assert_eq!(claims.employee_id, Some(2));

        // refresh tokens do not open the API
        let req = test::TestRequest::get()
            .uri("/api/ping")
            .insert_header(("Authorization", format!("Bearer {}", pair.refresh_token)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/ping")
            .insert_header(("Authorization", format!("Bearer {}", pair.access_token)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let refresh = || {
            test::TestRequest::post()
                .uri("/auth/refresh")
                .insert_header(("Authorization", format!("Bearer {}", pair.refresh_token)))
                .to_request()
        };
        assert_eq!(test::call_service(&app, refresh()).await.status(), StatusCode::OK);
        assert_eq!(test::call_service(&app, refresh()).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn bad_credentials_are_rejected() {
        let (store, config) = seeded().await;
        let app = app!(store, config);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({"username": "E0002", "password": "wrong"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({"username": " ", "password": "x"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/ping").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post().uri("/auth/logout").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    }
}
