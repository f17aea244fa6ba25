use actix_web::{web, HttpRequest, HttpResponse};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;

use super::with_cookie;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::{current_user, issue_token, logout_cookie, session_cookie};
use crate::auth::CurrentUser;
use crate::error::{CrmError, CrmResult};
use crate::flash::{self, Flash};
use crate::models::user;
use crate::state::AppState;
use crate::utils::text::{non_blank, non_empty};
use crate::views;

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Older forms post `old_password` and `confirm_password`.
#[derive(Debug, Default, Deserialize)]
pub struct ChangePasswordForm {
    #[serde(default, alias = "old_password")]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
    #[serde(default, alias = "confirm_password")]
    pub new_password2: Option<String>,
}

pub async fn login_form(req: HttpRequest) -> HttpResponse {
    if current_user(&req).is_some() {
        return flash::redirect(&req, "/clients/", Vec::new());
    }
    views::ok(&req, Vec::new(), |flashes| views::auth::login_page(flashes, None))
}

pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> CrmResult<HttpResponse> {
    let form = form.into_inner();
    let username = non_blank(form.username.as_deref());
    let password = form.password.unwrap_or_default();

    if let Some(name) = username.as_deref() {
        let account = user::Entity::find()
            .filter(user::Column::Username.eq(name))
            .one(&state.db)
            .await?;
        if let Some(account) = account {
            if verify_password(&password, &account.password).await? {
                let token = issue_token(&account, &state.auth)?;
                log::info!("User {} logged in", account.username);
                let resp = flash::redirect(&req, "/clients/", Vec::new());
                return with_cookie(resp, session_cookie(token, &state.auth));
            }
        }
    }

    log::warn!("Failed login attempt for {:?}", username);
    Ok(views::ok(&req, vec![Flash::danger("Неверные данные")], |flashes| {
        views::auth::login_page(flashes, username.as_deref())
    }))
}

pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> CrmResult<HttpResponse> {
    if let Some(user) = current_user(&req) {
        log::info!("User {} logged out", user.username);
    }
    let resp = flash::redirect(&req, "/login", vec![Flash::info("Вы вышли из системы")]);
    with_cookie(resp, logout_cookie(&state.auth))
}

pub async fn change_password_form(req: HttpRequest, user: CurrentUser) -> HttpResponse {
    views::ok(&req, Vec::new(), |flashes| {
        views::auth::change_password_page(&user, flashes)
    })
}

pub async fn change_password(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    form: web::Form<ChangePasswordForm>,
) -> CrmResult<HttpResponse> {
    let form = form.into_inner();
    let reshow = |message: Flash| {
        views::ok(&req, vec![message], |flashes| {
            views::auth::change_password_page(&user, flashes)
        })
    };

    let (Some(current), Some(new), Some(confirm)) = (
        non_empty(form.current_password.as_deref()),
        non_empty(form.new_password.as_deref()),
        non_empty(form.new_password2.as_deref()),
    ) else {
        return Ok(reshow(Flash::warning("Заполните все поля")));
    };

    // The session may outlive its account.
    let account = user::Entity::find_by_id(user.id)
        .one(&state.db)
        .await?
        .ok_or(CrmError::Unauthenticated)?;

    if !verify_password(&current, &account.password).await? {
        log::warn!("User {} entered a wrong current password", user.username);
        return Ok(reshow(Flash::danger("Неверный текущий пароль")));
    }
    if new != confirm {
        return Ok(reshow(Flash::warning("Пароли не совпадают")));
    }

    let hash = hash_password(&new, state.auth.bcrypt_cost).await?;
    let mut active: user::ActiveModel = account.into();
    active.password = Set(hash);
    active.update(&state.db).await?;
    log::info!("User {} changed password", user.username);

    Ok(flash::redirect(&req, "/clients/", vec![Flash::success("Пароль изменён")]))
}
