use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DbErr, EntityTrait, QueryOrder, Set, TransactionTrait};

use crate::auth::CurrentUser;
use crate::error::{CrmError, CrmResult};
use crate::flash::{self, Flash};
use crate::legacy::error_text;
use crate::models::document::{self, DocumentForm};
use crate::models::user;
use crate::state::AppState;
use crate::views;

const LIST_URL: &str = "/documents";

async fn load(state: &AppState, id: i32) -> CrmResult<document::Model> {
    document::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| CrmError::NotFound("Документ".to_string()))
}

/// Owners always may; anyone else needs the admin role as stored now, not
/// as it was when the session was issued.
async fn may_edit(state: &AppState, user: &CurrentUser, doc: &document::Model) -> CrmResult<bool> {
    if doc.owner_id == user.id {
        return Ok(true);
    }
    let account = user::Entity::find_by_id(user.id)
        .one(&state.db)
        .await?
        .ok_or(CrmError::Unauthenticated)?;
    if account.role != user.role {
        log::info!("User {} role changed to {:?} since login", user.username, account.role);
    }
    Ok(doc.editable_by(user.id, account.role))
}

fn failed(req: &HttpRequest, action: &str, reason: String) -> HttpResponse {
    log::error!("{} failed: {}", action, reason);
    flash::redirect(req, LIST_URL, vec![Flash::danger(format!("Ошибка: {}", reason))])
}

fn denied(req: &HttpRequest, user: &CurrentUser, doc: &document::Model) -> HttpResponse {
    log::warn!(
        "User {} tried to change document {} owned by {}",
        user.username,
        doc.id,
        doc.owner_id
    );
    flash::redirect(req, LIST_URL, vec![Flash::danger("Нет доступа!")])
}

pub async fn list(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
) -> CrmResult<HttpResponse> {
    let documents = document::Entity::find()
        .order_by_asc(document::Column::Id)
        .all(&state.db)
        .await?;
    Ok(views::ok(&req, Vec::new(), |flashes| {
        views::documents::list_page(&user, flashes, &documents)
    }))
}

pub async fn create_form(req: HttpRequest, user: CurrentUser) -> HttpResponse {
    views::ok(&req, Vec::new(), |flashes| {
        views::documents::form_page(&user, flashes, "Новая запись", "/documents/create", &DocumentForm::default())
    })
}

pub async fn create(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    form: web::Form<DocumentForm>,
) -> CrmResult<HttpResponse> {
    let form = form.into_inner();
    let input = match form.validate() {
        Ok(input) => input,
        Err(reason) => {
            return Ok(views::ok(&req, vec![Flash::danger(reason)], |flashes| {
                views::documents::form_page(&user, flashes, "Новая запись", "/documents/create", &form)
            }))
        }
    };

    let mut active = document::ActiveModel {
        owner_id: Set(user.id),
        created_at: Set(Some(Utc::now().naive_utc())),
        ..Default::default()
    };
    input.apply(&mut active);
    let inserted = state
        .db
        .transaction::<_, document::Model, DbErr>(move |txn| Box::pin(async move { active.insert(txn).await }))
        .await;
    Ok(match inserted {
        Ok(created) => {
            log::info!("User {} created document {}", user.username, created.id);
            flash::redirect(&req, LIST_URL, vec![Flash::success("Клиент добавлен!")])
        }
        Err(e) => failed(&req, "Creating a document", error_text(&e)),
    })
}

pub async fn edit_form(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> CrmResult<HttpResponse> {
    let doc = load(&state, path.into_inner()).await?;
    if !may_edit(&state, &user, &doc).await? {
        return Ok(denied(&req, &user, &doc));
    }
    let action = format!("/documents/{}/edit", doc.id);
    let form = DocumentForm::from(&doc);
    Ok(views::ok(&req, Vec::new(), |flashes| {
        views::documents::form_page(&user, flashes, "Редактирование", &action, &form)
    }))
}

pub async fn edit(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<i32>,
    form: web::Form<DocumentForm>,
) -> CrmResult<HttpResponse> {
    let doc = load(&state, path.into_inner()).await?;
    if !may_edit(&state, &user, &doc).await? {
        return Ok(denied(&req, &user, &doc));
    }

    let form = form.into_inner();
    let input = match form.validate() {
        Ok(input) => input,
        Err(reason) => {
            let action = format!("/documents/{}/edit", doc.id);
            return Ok(views::ok(&req, vec![Flash::danger(reason)], |flashes| {
                views::documents::form_page(&user, flashes, "Редактирование", &action, &form)
            }));
        }
    };

    let id = doc.id;
    let mut active: document::ActiveModel = doc.into();
    input.apply(&mut active);
    let updated = state
        .db
        .transaction::<_, document::Model, DbErr>(move |txn| Box::pin(async move { active.update(txn).await }))
        .await;
    Ok(match updated {
        Ok(_) => {
            log::info!("User {} updated document {}", user.username, id);
            flash::redirect(&req, LIST_URL, vec![Flash::success("Клиент обновлён!")])
        }
        Err(e) => failed(&req, &format!("Updating document {}", id), error_text(&e)),
    })
}

pub async fn delete(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> CrmResult<HttpResponse> {
    let doc = load(&state, path.into_inner()).await?;
    if !may_edit(&state, &user, &doc).await? {
        return Ok(denied(&req, &user, &doc));
    }
    let id = doc.id;
    let deleted = state
        .db
        .transaction::<_, u64, DbErr>(move |txn| {
            Box::pin(async move {
                let result = document::Entity::delete_by_id(id).exec(txn).await?;
                Ok(result.rows_affected)
            })
        })
        .await;
    Ok(match deleted {
        Ok(_) => {
            log::info!("User {} deleted document {}", user.username, id);
            flash::redirect(&req, LIST_URL, vec![Flash::success("Клиент удалён")])
        }
        Err(e) => failed(&req, &format!("Deleting document {}", id), error_text(&e)),
    })
}
