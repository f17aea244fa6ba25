use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth::CurrentUser;
use crate::error::CrmResult;
use crate::flash::{self, Flash};
use crate::legacy::people::{self, Lookup, PersonForm, PersonKey, PersonRow, SearchOutcome, SearchParams};
use crate::legacy::{error_text, execute_in_transaction};
use crate::state::AppState;
use crate::views;

pub(crate) const LIST_URL: &str = "/clients/";

/// Resolve a path key to a person, or the redirect to send instead.
pub(crate) async fn find_person(
    req: &HttpRequest,
    state: &AppState,
    raw_key: &str,
) -> CrmResult<Result<PersonRow, HttpResponse>> {
    let key = PersonKey::parse(raw_key);
    match people::resolve(&state.db, &state.people, &key).await? {
        Lookup::Found(person) => Ok(Ok(person)),
        Lookup::NotFound => {
            log::info!("No person matches key {:?}", key);
            Ok(Err(flash::redirect(req, LIST_URL, vec![Flash::warning("Клиент не найден")])))
        }
        Lookup::Ambiguous => {
            log::warn!("Person key {:?} matches several rows", key);
            let message = format!(
                "Найдено несколько клиентов с именем «{}». Откройте карточку из списка.",
                raw_key
            );
            Ok(Err(flash::redirect(req, LIST_URL, vec![Flash::warning(message)])))
        }
    }
}

pub async fn list(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    query: web::Query<SearchParams>,
) -> HttpResponse {
    let params = query.into_inner();
    let outcome = people::search(&state.db, &state.people, &params).await;
    let extra = match &outcome {
        SearchOutcome::Rows(_) => Vec::new(),
        SearchOutcome::Failed(reason) => vec![Flash::warning(format!("Ошибка поиска: {}", reason))],
    };
    views::ok(&req, extra, |flashes| {
        views::clients::list_page(&user, flashes, &params, outcome.rows())
    })
}

pub async fn create_form(req: HttpRequest, user: CurrentUser) -> HttpResponse {
    views::ok(&req, Vec::new(), |flashes| {
        views::clients::form_page(&user, flashes, "Новый клиент", "/clients/create", &PersonForm::default())
    })
}

pub async fn create(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    form: web::Form<PersonForm>,
) -> HttpResponse {
    let form = form.into_inner();
    let input = match form.validate() {
        Ok(input) => input,
        Err(reason) => {
            return views::ok(&req, vec![Flash::danger(reason)], |flashes| {
                views::clients::form_page(&user, flashes, "Новый клиент", "/clients/create", &form)
            })
        }
    };

    let stmt = people::insert_statement(&state.people, &input);
    match execute_in_transaction(&state.db, stmt).await {
        Ok(_) => {
            log::info!("User {} added person {:?}", user.username, input.fio);
            flash::redirect(&req, LIST_URL, vec![Flash::success("Клиент успешно добавлен!")])
        }
        Err(e) => {
            let reason = error_text(&e);
            log::error!("Adding person {:?} failed: {}", input.fio, reason);
            flash::redirect(&req, LIST_URL, vec![Flash::danger(format!("Ошибка: {}", reason))])
        }
    }
}

pub async fn view(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> CrmResult<HttpResponse> {
    let person = match find_person(&req, &state, &path).await? {
        Ok(person) => person,
        Err(redirect) => return Ok(redirect),
    };
    Ok(views::ok(&req, Vec::new(), |flashes| {
        views::clients::view_page(&user, flashes, &person)
    }))
}

pub async fn edit_form(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> CrmResult<HttpResponse> {
    let person = match find_person(&req, &state, &path).await? {
        Ok(person) => person,
        Err(redirect) => return Ok(redirect),
    };
    let action = format!("{}/edit", views::clients::person_url(&person));
    let form = PersonForm::from(&person);
    Ok(views::ok(&req, Vec::new(), |flashes| {
        views::clients::form_page(&user, flashes, "Редактирование клиента", &action, &form)
    }))
}

pub async fn edit(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<PersonForm>,
) -> CrmResult<HttpResponse> {
    let person = match find_person(&req, &state, &path).await? {
        Ok(person) => person,
        Err(redirect) => return Ok(redirect),
    };

    let form = form.into_inner();
    let input = match form.validate() {
        Ok(input) => input,
        Err(reason) => {
            let action = format!("{}/edit", views::clients::person_url(&person));
            return Ok(views::ok(&req, vec![Flash::danger(reason)], |flashes| {
                views::clients::form_page(&user, flashes, "Редактирование клиента", &action, &form)
            }));
        }
    };

    let stmt = people::update_statement(&state.people, person.id, &input);
    Ok(match execute_in_transaction(&state.db, stmt).await {
        Ok(0) => flash::redirect(&req, LIST_URL, vec![Flash::warning("Клиент не найден")]),
        Ok(_) => {
            log::info!("User {} updated person {}", user.username, person.id);
            flash::redirect(&req, LIST_URL, vec![Flash::success("Данные клиента обновлены")])
        }
        Err(e) => {
            let reason = error_text(&e);
            log::error!("Updating person {} failed: {}", person.id, reason);
            flash::redirect(&req, LIST_URL, vec![Flash::danger(format!("Ошибка: {}", reason))])
        }
    })
}

pub async fn delete(
    req: HttpRequest,
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> CrmResult<HttpResponse> {
    let person = match find_person(&req, &state, &path).await? {
        Ok(person) => person,
        Err(redirect) => return Ok(redirect),
    };

    let stmt = people::delete_statement(&state.people, person.id);
    Ok(match execute_in_transaction(&state.db, stmt).await {
        Ok(0) => flash::redirect(&req, LIST_URL, vec![Flash::warning("Клиент не найден")]),
        Ok(_) => {
            log::info!("User {} deleted person {}", user.username, person.id);
            flash::redirect(&req, LIST_URL, vec![Flash::success("Клиент удалён")])
        }
        Err(e) => {
            let reason = error_text(&e);
            log::error!("Deleting person {} failed: {}", person.id, reason);
            flash::redirect(&req, LIST_URL, vec![Flash::danger(format!("Ошибка: {}", reason))])
        }
    })
}
